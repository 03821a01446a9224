use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use crate::metadata::MetadataRecord;

/// Default number of metadata records buffered ahead of the consumer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// The consumer side of the metadata queue is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("metadata queue receiver dropped")]
pub struct QueueClosed;

/// Create a bounded metadata queue.
///
/// A capacity of zero is raised to one: the producer must always be able to
/// hand over a record without waiting for the consumer to be inside `take`.
pub fn metadata_queue(capacity: usize) -> (MetadataSender, MetadataReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    (MetadataSender { inner: tx }, MetadataReceiver { inner: rx })
}

/// Producer half of the metadata queue, owned by the demultiplexer.
///
/// There is no explicit close; dropping the sender ends the queue once the
/// consumer has drained it.
#[derive(Debug)]
pub struct MetadataSender {
    inner: SyncSender<MetadataRecord>,
}

impl MetadataSender {
    /// Queue a record, blocking while the queue is full.
    pub fn put(&self, record: MetadataRecord) -> Result<(), QueueClosed> {
        self.inner.send(record).map_err(|_| QueueClosed)
    }
}

/// Consumer half of the metadata queue.
#[derive(Debug)]
pub struct MetadataReceiver {
    inner: Receiver<MetadataRecord>,
}

impl MetadataReceiver {
    /// Take the next record, blocking while the queue is empty.
    ///
    /// Returns `None` once the producer is gone and every queued record has
    /// been taken.
    pub fn take(&self) -> Option<MetadataRecord> {
        self.inner.recv().ok()
    }

    /// Take the next record if one is queued right now.
    pub fn try_take(&self) -> Option<MetadataRecord> {
        self.inner.try_recv().ok()
    }

    /// Take the next record, waiting at most `timeout`.
    ///
    /// `Ok(None)` means the producer is gone and the queue is drained.
    pub fn take_timeout(&self, timeout: Duration) -> Result<Option<MetadataRecord>, RecvTimeoutError> {
        match self.inner.recv_timeout(timeout) {
            Ok(record) => Ok(Some(record)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Iterate over records until the producer is gone and the queue drained.
    pub fn iter(&self) -> impl Iterator<Item = MetadataRecord> + '_ {
        self.inner.iter()
    }
}
