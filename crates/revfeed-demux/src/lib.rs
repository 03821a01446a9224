//! Stream demultiplexer for the revision data stream.
//!
//! The data server sends strictly alternating `(metadata, revision)` frames.
//! [`Demultiplexer`] reads them on its own thread and fans them out into:
//! - a bounded [`MetadataReceiver`] queue of decoded [`MetadataRecord`]s
//! - a bounded [`RevisionReader`] byte channel carrying the raw revisions
//!
//! The consumer takes exactly one metadata record per revision it finishes
//! reading from the byte channel; the i-th record belongs to the i-th
//! revision.

pub mod channel;
pub mod config;
pub mod demux;
pub mod error;
pub mod metadata;
pub mod queue;

pub use channel::{revision_channel, RevisionReader, RevisionWriter, DEFAULT_REVISION_BUFFER};
pub use config::DemuxConfig;
pub use demux::{DemuxOutcome, Demultiplexer};
pub use error::{DecodeError, DemuxError};
pub use metadata::{MetadataRecord, METADATA_HEADER};
pub use queue::{
    metadata_queue, MetadataReceiver, MetadataSender, QueueClosed, DEFAULT_QUEUE_CAPACITY,
};
