use picolink_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header declared a zero or oversized payload.
    #[error("bad frame length {len} (allowed 1..={max})")]
    BadLength { len: u32, max: usize },

    /// The payload cannot be described by a 4-byte length header.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying channel failed.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),

    /// The read deadline passed before the frame was complete.
    #[error("read timed out: got {got}/{want} bytes")]
    Timeout { got: usize, want: usize },
}

impl FrameError {
    /// True when the channel is permanently gone.
    pub fn is_closed(&self) -> bool {
        matches!(self, FrameError::Transport(err) if err.is_closed())
    }

    /// True when the peer went away mid-stream; any partial frame is gone.
    pub fn is_peer_reset(&self) -> bool {
        matches!(self, FrameError::Transport(err) if err.is_peer_reset())
    }

    /// True for header-level protocol violations that are dropped silently.
    pub fn is_framing(&self) -> bool {
        matches!(self, FrameError::BadLength { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
