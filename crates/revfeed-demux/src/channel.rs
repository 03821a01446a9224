//! Bounded in-process byte pipe carrying raw revision payloads.
//!
//! The writer appends whole payloads; the reader sees one continuous byte
//! stream through [`std::io::Read`] and reconstructs revision boundaries from
//! the dump format itself.

use std::io::{self, ErrorKind, Read};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use bytes::{Buf, BytesMut};
use tracing::debug;

/// Default revision channel capacity: 32 MiB.
pub const DEFAULT_REVISION_BUFFER: usize = 32 * 1024 * 1024;

/// Create a bounded revision channel holding at most `capacity` bytes.
///
/// A capacity of zero is raised to one byte.
pub fn revision_channel(capacity: usize) -> (RevisionWriter, RevisionReader) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            buf: BytesMut::new(),
            writer_closed: false,
            reader_dropped: false,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
        capacity: capacity.max(1),
    });
    (
        RevisionWriter {
            shared: Arc::clone(&shared),
            closed: false,
        },
        RevisionReader { shared },
    )
}

struct Shared {
    state: Mutex<State>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
}

struct State {
    buf: BytesMut,
    writer_closed: bool,
    reader_dropped: bool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer half of the revision channel, owned by the demultiplexer.
pub struct RevisionWriter {
    shared: Arc<Shared>,
    closed: bool,
}

impl RevisionWriter {
    /// Append one revision payload, blocking until it fits.
    ///
    /// A payload no larger than the capacity is appended in one step, so the
    /// reader never sees its first byte before the whole payload is
    /// buffered. Larger payloads are streamed through as space frees up.
    ///
    /// Fails with `BrokenPipe` once the reader is dropped or this writer has
    /// been closed.
    pub fn write_payload(&mut self, payload: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                ErrorKind::BrokenPipe,
                "revision channel already closed",
            ));
        }

        let capacity = self.shared.capacity;
        let mut remaining = payload;
        let mut state = self.shared.lock();

        loop {
            if state.reader_dropped {
                return Err(io::Error::new(
                    ErrorKind::BrokenPipe,
                    "revision reader dropped",
                ));
            }
            if remaining.is_empty() {
                return Ok(());
            }

            let room = capacity - state.buf.len();
            let fits_whole = remaining.len() <= room;
            let oversized = remaining.len() > capacity && room > 0;

            if fits_whole || oversized {
                let n = remaining.len().min(room);
                state.buf.extend_from_slice(&remaining[..n]);
                remaining = &remaining[n..];
                self.shared.readable.notify_one();
            } else {
                state = self
                    .shared
                    .writable
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    /// Signal end of data to the reader.
    ///
    /// Buffered bytes stay readable. Calling `close` again has no effect.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.shared.lock();
        state.writer_closed = true;
        self.shared.readable.notify_all();
        debug!(buffered = state.buf.len(), "revision channel closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes currently buffered and not yet read.
    pub fn buffered(&self) -> usize {
        self.shared.lock().buf.len()
    }

    /// Channel capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

impl Drop for RevisionWriter {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RevisionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionWriter")
            .field("capacity", &self.shared.capacity)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Consumer half of the revision channel.
///
/// Reads block while the channel is empty and return `Ok(0)` once the writer
/// has closed and every buffered byte has been read. A single read may
/// return less than one payload.
pub struct RevisionReader {
    shared: Arc<Shared>,
}

impl Read for RevisionReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        let mut state = self.shared.lock();
        loop {
            if !state.buf.is_empty() {
                let n = out.len().min(state.buf.len());
                state.buf.copy_to_slice(&mut out[..n]);
                self.shared.writable.notify_one();
                return Ok(n);
            }
            if state.writer_closed {
                return Ok(0);
            }
            state = self
                .shared
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for RevisionReader {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.reader_dropped = true;
        state.buf.clear();
        self.shared.writable.notify_all();
    }
}

impl std::fmt::Debug for RevisionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionReader")
            .field("capacity", &self.shared.capacity)
            .finish()
    }
}
