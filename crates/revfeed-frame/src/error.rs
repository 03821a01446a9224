/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The declared payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended inside a frame.
    ///
    /// `expected` is the full wire size of the frame when its length prefix
    /// was complete, otherwise the prefix size.
    #[error("stream ended mid-frame ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
