use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the data socket to the specified path.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// Failed to open or configure a serial device.
    #[error("failed to open serial device {path}: {source}")]
    Serial {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// A write was attempted while no peer is attached to the channel.
    #[error("no peer attached to {0}")]
    NotConnected(&'static str),

    /// The attached peer hung up. Bytes of a partly read frame are lost; the
    /// channel itself stays usable for the next peer.
    #[error("peer on {0} hung up")]
    PeerReset(&'static str),

    /// The channel can never produce data again.
    #[error("channel closed")]
    Closed,

    /// The candidate is not available on this device.
    #[error("channel unavailable: {0}")]
    Unavailable(String),

    /// Every candidate failed to open.
    #[error("no transport channel available (tried {tried})")]
    NoChannel { tried: usize },
}

impl TransportError {
    /// True when the channel is permanently gone rather than temporarily idle.
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::Closed)
    }

    /// True when one peer went away but the channel keeps serving.
    pub fn is_peer_reset(&self) -> bool {
        matches!(self, TransportError::PeerReset(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
