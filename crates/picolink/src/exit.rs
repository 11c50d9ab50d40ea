use std::fmt;
use std::io;

use picolink_boot::BootError;
use picolink_dispatch::DispatchError;
use picolink_frame::FrameError;
use picolink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Serial { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        FrameError::BadLength { .. } | FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn boot_error(context: &str, err: BootError) -> CliError {
    match err {
        BootError::Flag { source, .. } | BootError::Pin { source, .. } => io_error(context, source),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn dispatch_error(context: &str, err: DispatchError) -> CliError {
    match err {
        DispatchError::Read(err) | DispatchError::Write(err) => frame_error(context, err),
        DispatchError::Encode(err) | DispatchError::Decode(err) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        DispatchError::Flag(err) => boot_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_timeout_code() {
        let err = dispatch_error(
            "receive failed",
            DispatchError::Read(FrameError::Timeout { got: 0, want: 4 }),
        );
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("receive failed: "));
    }

    #[test]
    fn bad_length_is_data_invalid() {
        let err = frame_error("receive failed", FrameError::BadLength { len: 0, max: 1 });
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn missing_channel_is_transport_error() {
        let err = transport_error("select", TransportError::NoChannel { tried: 3 });
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn invalid_pin_level_is_data_invalid() {
        let err = boot_error(
            "boot pin",
            BootError::PinLevel {
                path: "gpio".into(),
                raw: "2".into(),
            },
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn peer_reset_is_transport_error() {
        let err = frame_error(
            "receive failed",
            FrameError::Transport(TransportError::PeerReset("data-socket")),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn permission_denied_keeps_its_code() {
        let err = boot_error(
            "flag",
            BootError::Flag {
                path: "MAINTENANCE".into(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }
}
