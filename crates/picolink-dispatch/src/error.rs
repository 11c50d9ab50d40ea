use picolink_boot::BootError;
use picolink_frame::FrameError;

/// Errors raised by one stage of the request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Reading a frame from the channel failed.
    #[error("read failed: {0}")]
    Read(FrameError),

    /// Writing a response frame failed.
    #[error("write failed: {0}")]
    Write(FrameError),

    /// A message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A response payload was not a valid message.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The maintenance flag could not be armed.
    #[error("maintenance flag error: {0}")]
    Flag(#[from] BootError),
}

impl DispatchError {
    /// True when the channel is permanently gone.
    pub fn is_closed(&self) -> bool {
        match self {
            DispatchError::Read(err) | DispatchError::Write(err) => err.is_closed(),
            _ => false,
        }
    }

    /// True when the peer stayed silent past the read deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DispatchError::Read(FrameError::Timeout { .. }))
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
