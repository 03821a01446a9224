//! Client for the revision scoring data server.
//!
//! The server streams `(metadata, revision)` pairs over one connection and
//! expects one score per revision back. This crate wires the layers together:
//!
//! - [`transport`]: TCP connection and authentication line
//! - [`frame`]: Big-endian length-prefixed framing
//! - [`demux`]: Splits the frame stream into metadata queue and revision channel
//! - [`dump`]: Reconstructs revisions from the revision byte stream
//! - [`processor`]: Per-revision processing contract
//! - [`stats`]: Corpus statistics processor that scores every revision
//! - [`results`]: Result rows sent back to the server
//! - [`session`]: One end-to-end pass over a data stream

pub mod dump;
pub mod error;
pub mod processor;
pub mod results;
pub mod session;
pub mod stats;

/// Re-export transport types.
pub mod transport {
    pub use revfeed_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use revfeed_frame::*;
}

/// Re-export demultiplexer types.
pub mod demux {
    pub use revfeed_demux::*;
}

pub use error::{DumpError, ProcessError, SessionError};
pub use session::{run_session, SessionConfig, SessionReport, StopInput};
