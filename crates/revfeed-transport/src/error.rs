/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server address could not be parsed.
    #[error("invalid server address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: &'static str },

    /// Failed to connect to the server.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    /// The authentication token cannot be sent as a single line.
    #[error("invalid authentication token: {0}")]
    InvalidToken(&'static str),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
