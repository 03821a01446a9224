//! TCP transport to the revision data server.
//!
//! This is the lowest layer of revfeed. It resolves `host:port` server
//! addresses, opens the connection and sends the one-line authentication
//! token. Everything above it works on the [`ServerStream`] provided here.

pub mod address;
pub mod error;
pub mod stream;

pub use address::ServerAddress;
pub use error::{Result, TransportError};
pub use stream::ServerStream;
