/// The revision byte stream does not contain well-formed revisions.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// Reading the revision stream failed.
    #[error("revision stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended inside a `<revision>` element.
    #[error("revision stream ended inside a revision ({buffered} bytes buffered)")]
    Truncated { buffered: usize },

    /// A revision element has no `<id>`.
    #[error("revision without id")]
    MissingRevisionId,

    /// A revision element grew past the configured limit without closing.
    #[error("revision exceeds {max} bytes without a closing tag")]
    RevisionTooLarge { max: usize },
}

/// A revision could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The revision stream is malformed.
    #[error(transparent)]
    Dump(#[from] DumpError),

    /// Writing a result row failed.
    #[error("failed to write result: {0}")]
    Results(#[from] csv::Error),
}

/// A session could not run to the end.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The result header could not be written.
    #[error("failed to write result header: {0}")]
    Results(#[from] csv::Error),

    /// Revision processing stopped early.
    #[error("revision processing failed: {0}")]
    Process(#[from] ProcessError),

    /// The demultiplexer thread could not be started.
    #[error("failed to start demultiplexer thread: {0}")]
    Spawn(std::io::Error),

    /// The demultiplexer thread panicked.
    #[error("demultiplexer thread panicked")]
    DemuxPanicked,
}
