use std::time::Duration;

use bytes::Bytes;
use picolink_frame::{FrameConfig, FrameError, Framed};
use picolink_transport::{Channel, TransportError};
use serde_json::Value;

use crate::error::{DispatchError, Result};
use crate::message::Response;

/// Default time a client waits for a response frame.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Host-side request client.
///
/// Sends one frame and expects exactly one frame back within the configured
/// timeout; a silent peer is a [`FrameError::Timeout`].
///
/// A failed read can leave part of a response unread, so after one the
/// client stops using its channel: later calls fail as if the channel were
/// closed. Reconnect to continue.
pub struct Client<C> {
    framed: Framed<C>,
    desynced: bool,
}

impl<C: Channel> Client<C> {
    /// Create a client that waits up to `timeout` for each response.
    pub fn new(channel: C, timeout: Duration) -> Self {
        let config = FrameConfig {
            read_timeout: Some(timeout),
            ..FrameConfig::default()
        };
        Self {
            framed: Framed::with_config(channel, config),
            desynced: false,
        }
    }

    /// Send a raw payload and wait for the raw response payload.
    pub fn request_raw(&mut self, payload: &[u8]) -> Result<Bytes> {
        self.send_raw(payload)?;
        self.framed.read_frame().map_err(|err| {
            self.desynced = true;
            DispatchError::Read(err)
        })
    }

    /// Send a message and wait for the decoded response.
    pub fn request(&mut self, message: &Value) -> Result<Response> {
        let payload = serde_json::to_vec(message).map_err(DispatchError::Encode)?;
        let raw = self.request_raw(&payload)?;
        serde_json::from_slice(&raw).map_err(DispatchError::Decode)
    }

    /// Send a message that gets no response, such as `enter_maintenance`.
    pub fn notify(&mut self, message: &Value) -> Result<()> {
        let payload = serde_json::to_vec(message).map_err(DispatchError::Encode)?;
        self.send_raw(&payload)
    }

    fn send_raw(&mut self, payload: &[u8]) -> Result<()> {
        if self.desynced {
            return Err(DispatchError::Write(FrameError::Transport(
                TransportError::Closed,
            )));
        }
        self.framed.send(payload).map_err(DispatchError::Write)
    }

    /// True once a failed read has left the stream out of step.
    pub fn is_desynced(&self) -> bool {
        self.desynced
    }

    /// Consume the client and return the channel.
    pub fn into_inner(self) -> C {
        self.framed.into_inner()
    }
}
