use std::time::Instant;

use bytes::{Bytes, BytesMut};
use picolink_transport::Channel;
use tracing::trace;

use crate::codec::{decode_header, encode_frame, FrameConfig, HEADER_SIZE};
use crate::error::Result;
use crate::io::read_exact_until;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Reads and writes complete frames over a single channel.
///
/// Handles partial reads internally; callers always get complete payloads.
pub struct Framed<C> {
    inner: C,
    buf: BytesMut,
    config: FrameConfig,
}

impl<C: Channel> Framed<C> {
    /// Create a framed channel with default configuration.
    pub fn new(inner: C) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a framed channel with explicit configuration.
    pub fn with_config(inner: C, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete payload (blocking).
    ///
    /// A bad length header fails with
    /// [`FrameError::BadLength`](crate::FrameError::BadLength) after consuming
    /// only the four header bytes; the next call starts a fresh header.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        let deadline = self.config.read_timeout.map(|t| Instant::now() + t);

        let raw = read_exact_until(&mut self.inner, HEADER_SIZE, self.config.backoff, deadline)?;
        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&raw);
        let len = decode_header(header, self.config.max_payload_size)?;

        let payload = read_exact_until(&mut self.inner, len, self.config.backoff, deadline)?;
        trace!(len, channel = self.inner.name(), "frame received");
        Ok(payload.freeze())
    }

    /// Encode and send a payload, then flush.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;
        self.inner.write(&self.buf)?;
        self.flush()?;
        trace!(len = payload.len(), channel = self.inner.name(), "frame sent");
        Ok(())
    }

    /// Flush the underlying channel.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume and return the inner channel.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Current configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
