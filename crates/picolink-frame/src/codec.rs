use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: big-endian payload length.
pub const HEADER_SIZE: usize = 4;

/// Largest payload a receiver accepts: 64 KiB.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Pause between empty reads while waiting for frame bytes.
pub const DEFAULT_READ_BACKOFF: Duration = Duration::from_millis(2);

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬─────────────────┐
/// │ Length       │ Payload         │
/// │ (4B BE)      │ (Length bytes)  │
/// └──────────────┴─────────────────┘
/// ```
///
/// No receiver limit is enforced here; the sender is trusted to respect it.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Encode a payload into a freshly allocated frame.
pub fn encode(payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    encode_frame(payload, &mut dst)?;
    Ok(dst.freeze())
}

/// Parse a length header, rejecting `0` and anything above `max_payload`.
pub fn decode_header(header: [u8; HEADER_SIZE], max_payload: usize) -> Result<usize> {
    let len = u32::from_be_bytes(header);
    if len == 0 || len as usize > max_payload {
        return Err(FrameError::BadLength {
            len,
            max: max_payload,
        });
    }
    Ok(len as usize)
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. On a bad length the
/// four header bytes are consumed so the next call resumes after them.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&src[..HEADER_SIZE]);
    let payload_len = match decode_header(header, max_payload) {
        Ok(len) => len,
        Err(err) => {
            src.advance(HEADER_SIZE);
            return Err(err);
        }
    };

    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(payload_len).freeze()))
}

/// Configuration for framed reads.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted payload size in bytes. Default: [`MAX_FRAME_BYTES`].
    pub max_payload_size: usize,
    /// Deadline for reading one whole frame. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Sleep between empty reads. Default: [`DEFAULT_READ_BACKOFF`].
    pub backoff: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_FRAME_BYTES,
            read_timeout: None,
            backoff: DEFAULT_READ_BACKOFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let payload = br#"{"type":"ping"}"#;
        let mut buf = BytesMut::from(encode(payload).unwrap().as_ref());

        assert_eq!(buf.len(), HEADER_SIZE + payload.len());

        let frame = decode_frame(&mut buf, MAX_FRAME_BYTES).unwrap().unwrap();
        assert_eq!(frame.as_ref(), payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_header_is_big_endian() {
        let frame = encode(&[0xAA; 0x0102]).unwrap();
        assert_eq!(&frame[..HEADER_SIZE], &[0x00, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn test_roundtrip_at_limits() {
        for len in [1usize, MAX_FRAME_BYTES] {
            let payload = vec![0x5A; len];
            let mut buf = BytesMut::from(encode(&payload).unwrap().as_ref());
            let frame = decode_frame(&mut buf, MAX_FRAME_BYTES).unwrap().unwrap();
            assert_eq!(frame.len(), len);
        }
    }

    #[test]
    fn test_decode_header_rejects_zero() {
        let err = decode_header([0, 0, 0, 0], MAX_FRAME_BYTES).unwrap_err();
        assert!(matches!(err, FrameError::BadLength { len: 0, .. }));
    }

    #[test]
    fn test_decode_header_rejects_oversized() {
        let over = (MAX_FRAME_BYTES as u32 + 1).to_be_bytes();
        let err = decode_header(over, MAX_FRAME_BYTES).unwrap_err();
        assert!(err.is_framing());

        assert_eq!(
            decode_header((MAX_FRAME_BYTES as u32).to_be_bytes(), MAX_FRAME_BYTES).unwrap(),
            MAX_FRAME_BYTES
        );
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x00, 0x00, 0x00][..]);
        assert!(decode_frame(&mut buf, MAX_FRAME_BYTES).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = BytesMut::from(encode(b"hello").unwrap().as_ref());
        buf.truncate(HEADER_SIZE + 2);

        assert!(decode_frame(&mut buf, MAX_FRAME_BYTES).unwrap().is_none());
        assert_eq!(buf.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn test_bad_header_consumed_without_payload() {
        let mut buf = BytesMut::new();
        buf.put_u32(0xFFFF_FFFF);
        encode_frame(b"next", &mut buf).unwrap();

        let err = decode_frame(&mut buf, MAX_FRAME_BYTES).unwrap_err();
        assert!(matches!(err, FrameError::BadLength { len: 0xFFFF_FFFF, .. }));

        let frame = decode_frame(&mut buf, MAX_FRAME_BYTES).unwrap().unwrap();
        assert_eq!(frame.as_ref(), b"next");
    }

    #[test]
    fn test_multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, MAX_FRAME_BYTES).unwrap().unwrap();
        let f2 = decode_frame(&mut buf, MAX_FRAME_BYTES).unwrap().unwrap();
        assert_eq!(f1.as_ref(), b"first");
        assert_eq!(f2.as_ref(), b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_has_no_receiver_limit() {
        let payload = vec![0u8; MAX_FRAME_BYTES + 1];
        let frame = encode(&payload).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + MAX_FRAME_BYTES + 1);
    }
}
