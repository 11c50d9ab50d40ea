use crate::error::Result;

/// A byte-oriented, single-owner communication channel.
///
/// `read` is non-blocking friendly: `Ok(0)` means "no data yet", never
/// end-of-stream. A channel that can never deliver data again reports
/// [`TransportError::Closed`](crate::TransportError::Closed) instead.
pub trait Channel {
    /// Short channel name for diagnostics.
    fn name(&self) -> &'static str;

    /// Read up to `buf.len()` bytes. Returns `Ok(0)` when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write the whole buffer.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Flush buffered output. No-op for channels without explicit flushing.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
