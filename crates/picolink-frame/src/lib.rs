//! Length-prefixed message framing for picolink.
//!
//! Every message on the wire is framed with:
//! - A 4-byte big-endian payload length
//! - Exactly that many payload bytes
//!
//! Lengths of zero or above [`MAX_FRAME_BYTES`] are protocol violations; the
//! header is discarded and the reader resumes at the next four bytes.
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod framed;
pub mod io;

pub use codec::{
    decode_frame, decode_header, encode, encode_frame, FrameConfig, DEFAULT_READ_BACKOFF,
    HEADER_SIZE, MAX_FRAME_BYTES,
};
pub use error::{FrameError, Result};
pub use framed::Framed;
pub use io::{read_exact, read_exact_until};
