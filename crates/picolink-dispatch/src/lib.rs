//! Production-mode request dispatcher.
//!
//! Reads one frame at a time, interprets it as a JSON request, answers with a
//! JSON response, and keeps serving no matter what a single request does. The
//! one request that ends a run is `enter_maintenance`, which arms the
//! one-shot maintenance flag and asks for a soft reboot.

pub mod client;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod message;

pub use client::Client;
pub use device::{Device, HostDevice};
pub use dispatcher::{DispatchConfig, DispatchStats, Dispatcher, Exit, Reply, Step};
pub use error::{DispatchError, Result};
pub use message::{
    Request, RequestKind, Response, ERROR_EXC, ERROR_UNKNOWN_CMD, REQUEST_ECHO,
    REQUEST_ENTER_MAINTENANCE, REQUEST_GET_STATUS, REQUEST_PING,
};
