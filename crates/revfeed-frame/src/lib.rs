//! Length-prefixed framing for the revision data stream.
//!
//! Every item on the wire is framed as:
//! - A 4-byte big-endian payload length
//! - Exactly that many payload bytes
//!
//! The reader tells a clean end of stream (no bytes of a new frame) apart
//! from a stream that stops inside a frame.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
