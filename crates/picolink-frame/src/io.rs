//! Blocking reads over non-blocking-friendly channels.

use std::time::{Duration, Instant};

use bytes::BytesMut;
use picolink_transport::Channel;

use crate::error::{FrameError, Result};

/// Read exactly `n` bytes, retrying short and empty reads.
///
/// Empty reads mean "no data yet": the call sleeps for `backoff` before
/// retrying instead of spinning. Never returns a short buffer.
pub fn read_exact<C: Channel + ?Sized>(
    channel: &mut C,
    n: usize,
    backoff: Duration,
) -> Result<BytesMut> {
    read_exact_until(channel, n, backoff, None)
}

/// Like [`read_exact`], giving up with [`FrameError::Timeout`] at `deadline`.
pub fn read_exact_until<C: Channel + ?Sized>(
    channel: &mut C,
    n: usize,
    backoff: Duration,
    deadline: Option<Instant>,
) -> Result<BytesMut> {
    let mut buf = BytesMut::zeroed(n);
    let mut filled = 0usize;
    while filled < n {
        let read = channel.read(&mut buf[filled..])?;
        if read == 0 {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(FrameError::Timeout {
                    got: filled,
                    want: n,
                });
            }
            std::thread::sleep(backoff);
            continue;
        }
        filled += read;
    }
    Ok(buf)
}
