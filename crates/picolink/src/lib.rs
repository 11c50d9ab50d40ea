//! On-device communication core.
//!
//! picolink decides at startup whether a device exposes an interactive
//! maintenance console or a clean production data channel, and in production
//! serves length-prefixed JSON requests over that channel.
//!
//! # Crate Structure
//!
//! - [`transport`] — Byte channels and startup transport selection
//! - [`frame`] — 4-byte big-endian length-prefixed framing
//! - [`boot`] — One-shot maintenance flag, boot pin and mode decision
//! - [`dispatch`] — Request vocabulary, dispatcher loop and host client

/// Re-export transport types.
pub mod transport {
    pub use picolink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use picolink_frame::*;
}

/// Re-export boot types.
pub mod boot {
    pub use picolink_boot::*;
}

/// Re-export dispatch types.
pub mod dispatch {
    pub use picolink_dispatch::*;
}
