use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::debug;

use crate::codec::{decode_frame, peek_payload_len, Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    chunk: Vec<u8>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            chunk: vec![0u8; READ_CHUNK_SIZE],
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` when the stream ends on a frame boundary, and
    /// `Err(FrameError::Truncated)` when it ends part-way through a frame.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(Some(frame));
            }

            if let Some(payload_len) = peek_payload_len(&self.buf) {
                let missing = (HEADER_SIZE + payload_len).saturating_sub(self.buf.len());
                self.buf.reserve(missing);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    debug!("end of stream on frame boundary");
                    return Ok(None);
                }
                return Err(self.truncated());
            }

            self.buf.extend_from_slice(&self.chunk[..read]);
        }
    }

    fn truncated(&self) -> FrameError {
        let expected = peek_payload_len(&self.buf)
            .map(|len| HEADER_SIZE + len)
            .unwrap_or(HEADER_SIZE);
        FrameError::Truncated {
            expected,
            received: self.buf.len(),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
