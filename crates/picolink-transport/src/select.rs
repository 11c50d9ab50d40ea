//! Startup selection of the single transport channel.

use std::fmt;

use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::error::{Result, TransportError};

/// Which kind of channel backs the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Dedicated machine-to-machine data channel.
    Data,
    /// Interactive console channel.
    Console,
    /// Hardware serial fallback.
    Serial,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Data => "data",
            TransportKind::Console => "console",
            TransportKind::Serial => "serial",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel that may or may not be available on this device.
pub trait Candidate {
    /// Kind of channel this candidate provides.
    fn kind(&self) -> TransportKind;

    /// Probe and open the channel. Errors mean "not available".
    fn open(self: Box<Self>) -> Result<Box<dyn Channel>>;
}

/// Candidate built from a closure, for channels assembled by the caller.
pub struct FnCandidate<F> {
    kind: TransportKind,
    open: F,
}

impl<F> FnCandidate<F>
where
    F: FnOnce() -> Result<Box<dyn Channel>>,
{
    pub fn new(kind: TransportKind, open: F) -> Self {
        Self { kind, open }
    }
}

impl<F> Candidate for FnCandidate<F>
where
    F: FnOnce() -> Result<Box<dyn Channel>>,
{
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn open(self: Box<Self>) -> Result<Box<dyn Channel>> {
        (self.open)()
    }
}

/// The chosen channel. Exactly one exists per run and it is never re-selected.
pub struct Transport {
    kind: TransportKind,
    channel: Box<dyn Channel>,
}

impl Transport {
    pub fn new(kind: TransportKind, channel: Box<dyn Channel>) -> Self {
        Self { kind, channel }
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }
}

impl Channel for Transport {
    fn name(&self) -> &'static str {
        self.channel.name()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.channel.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.channel.write(data)
    }

    fn flush(&mut self) -> Result<()> {
        self.channel.flush()
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("kind", &self.kind)
            .field("channel", &self.channel.name())
            .finish()
    }
}

/// Probe `candidates` in priority order and bind to the first that opens.
pub fn select<I>(candidates: I) -> Result<Transport>
where
    I: IntoIterator<Item = Box<dyn Candidate>>,
{
    let mut tried = 0usize;
    for candidate in candidates {
        tried += 1;
        let kind = candidate.kind();
        debug!(%kind, "probing transport candidate");
        match candidate.open() {
            Ok(channel) => {
                info!(%kind, channel = channel.name(), "transport selected");
                return Ok(Transport::new(kind, channel));
            }
            Err(err) => warn!(%kind, error = %err, "transport candidate unavailable"),
        }
    }
    Err(TransportError::NoChannel { tried })
}

/// Dedicated data channel candidate: a data socket bound at `path`.
#[cfg(unix)]
pub fn data_socket(path: impl Into<std::path::PathBuf>) -> Box<dyn Candidate> {
    let path = path.into();
    Box::new(FnCandidate::new(TransportKind::Data, move || {
        Ok(Box::new(crate::uds::DataSocket::bind(path)?) as Box<dyn Channel>)
    }))
}

/// Interactive console candidate over the process standard streams.
pub fn console() -> Box<dyn Candidate> {
    Box::new(FnCandidate::new(TransportKind::Console, || {
        Ok(Box::new(crate::stdio::StdioChannel::stdio()) as Box<dyn Channel>)
    }))
}

/// Hardware serial fallback candidate.
///
/// A board without the UART device node reports
/// [`TransportError::Unavailable`] rather than an open failure.
#[cfg(unix)]
pub fn serial(config: crate::serial::SerialConfig) -> Box<dyn Candidate> {
    Box::new(FnCandidate::new(TransportKind::Serial, move || {
        if !config.path.exists() {
            return Err(TransportError::Unavailable(format!(
                "no serial device at {}",
                config.path.display()
            )));
        }
        Ok(Box::new(crate::serial::SerialPort::open(&config)?) as Box<dyn Channel>)
    }))
}
