use revfeed_frame::FrameError;

/// A metadata frame could not be decoded into a record.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not valid UTF-8 text.
    #[error("metadata is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The frame contains no record.
    #[error("metadata frame is empty")]
    Empty,

    /// The line is not valid RFC 4180 CSV.
    #[error("malformed metadata line: {0}")]
    Csv(#[from] csv::Error),

    /// The frame holds more than one line.
    #[error("metadata frame contains more than one record")]
    TrailingRecords,

    /// The record does not match the fixed column schema.
    #[error("expected {expected} metadata fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}

/// Reasons a demultiplexing session stopped before a clean end of stream.
#[derive(Debug, thiserror::Error)]
pub enum DemuxError {
    /// The frame stream failed (truncated frame, oversized frame, I/O).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A metadata frame could not be decoded.
    #[error("metadata decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The metadata consumer went away while a record was being queued.
    #[error("metadata queue disconnected while queueing revision {revision_id}")]
    QueueDisconnected { revision_id: String },

    /// The revision consumer went away while a revision was being written.
    #[error("revision channel closed while writing revision {revision_id}: {source}")]
    ChannelClosed {
        revision_id: String,
        source: std::io::Error,
    },
}
