use std::io::{ErrorKind, Read, Stdin, Stdout, Write};

use crate::channel::Channel;
use crate::error::{Result, TransportError};

/// Console channel over the process standard streams.
pub type StdioChannel = ConsoleChannel<Stdin, Stdout>;

/// Console channel over any blocking reader/writer pair.
///
/// End-of-stream on the reader is permanent: the console cannot be reopened,
/// so it surfaces as [`TransportError::Closed`].
pub struct ConsoleChannel<R, W> {
    input: R,
    output: W,
}

impl StdioChannel {
    /// Attach to the process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin(), std::io::stdout())
    }
}

impl<R: Read, W: Write> ConsoleChannel<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the channel and return the underlying streams.
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: Read, W: Write> Channel for ConsoleChannel<R, W> {
    fn name(&self) -> &'static str {
        "console"
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.input.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                Ok(0)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.output.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.output.flush()?;
        Ok(())
    }
}

impl<R, W> std::fmt::Debug for ConsoleChannel<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleChannel").finish_non_exhaustive()
    }
}
