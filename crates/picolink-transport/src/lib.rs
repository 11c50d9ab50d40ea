//! Byte channel abstraction for the picolink communication core.
//!
//! Provides one capability to the rest of the system (read, write, flush)
//! over whichever concrete channel is available at startup:
//! - a dedicated data channel (Unix domain socket on host builds)
//! - the interactive console (stdin/stdout)
//! - a hardware serial fallback at a fixed baud rate
//!
//! This is the lowest layer of picolink. Everything else builds on top of
//! the [`Channel`] trait and the [`Transport`] handle provided here.

pub mod channel;
pub mod error;
pub mod select;
pub mod stdio;

#[cfg(unix)]
pub mod serial;
#[cfg(unix)]
pub mod uds;

pub use channel::Channel;
pub use error::{Result, TransportError};
pub use select::{select, Candidate, FnCandidate, Transport, TransportKind};
pub use stdio::{ConsoleChannel, StdioChannel};

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort, DEFAULT_SERIAL_PATH, HARDWARE_BAUD};
#[cfg(unix)]
pub use uds::{DataSocket, UdsStream};
