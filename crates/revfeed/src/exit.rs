use std::fmt;
use std::io;

use revfeed::demux::DemuxError;
use revfeed::frame::FrameError;
use revfeed::transport::TransportError;
use revfeed::{ProcessError, SessionError, SessionReport};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FAILURE,
        _ => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(&err), format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidAddress { .. } | TransportError::InvalidToken(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Connect { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Results(err) => CliError::new(csv_code(&err), format!("{context}: {err}")),
        SessionError::Process(ProcessError::Results(err)) => {
            CliError::new(csv_code(&err), format!("{context}: {err}"))
        }
        SessionError::Process(err @ ProcessError::Dump(_)) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        SessionError::Spawn(source) => {
            CliError::new(INTERNAL, format!("{context}: cannot start demultiplexer: {source}"))
        }
        SessionError::DemuxPanicked => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

fn csv_code(err: &csv::Error) -> i32 {
    match err.kind() {
        csv::ErrorKind::Io(source) => io_code(source),
        _ => INTERNAL,
    }
}

/// Exit code for a session that ran to the end.
pub fn report_exit_code(report: &SessionReport) -> i32 {
    match report.outcome.error() {
        Some(DemuxError::Decode(_)) => DATA_INVALID,
        Some(DemuxError::Frame(FrameError::PayloadTooLarge { .. })) => DATA_INVALID,
        Some(DemuxError::Frame(FrameError::Io(source))) => io_code(source),
        Some(DemuxError::Frame(FrameError::Truncated { .. }))
        | Some(DemuxError::QueueDisconnected { .. })
        | Some(DemuxError::ChannelClosed { .. }) => FAILURE,
        None if report.is_complete() => SUCCESS,
        None => DATA_INVALID,
    }
}
