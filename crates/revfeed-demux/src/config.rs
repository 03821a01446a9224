use crate::channel::DEFAULT_REVISION_BUFFER;
use crate::queue::DEFAULT_QUEUE_CAPACITY;

/// Capacities of the two channels created for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemuxConfig {
    /// Maximum number of decoded metadata records waiting for the consumer.
    pub queue_capacity: usize,
    /// Revision channel buffer size in bytes.
    pub revision_buffer: usize,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            revision_buffer: DEFAULT_REVISION_BUFFER,
        }
    }
}
