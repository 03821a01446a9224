use std::io::Write;
use std::time::{Duration, Instant};

use revfeed_demux::MetadataReceiver;
use tracing::{info, warn};

use crate::dump::Revision;
use crate::error::ProcessError;
use crate::processor::RevisionProcessor;
use crate::results::ResultWriter;

/// Score given to every revision: "not vandalism".
pub const BASELINE_SCORE: f32 = 0.0;

/// Default interval between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Counters collected over one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusSummary {
    /// Revisions scored.
    pub revisions: u64,
    /// Revisions by registered contributors.
    pub registered_revisions: u64,
    /// Revisions for which the metadata queue was already exhausted.
    pub missing_metadata: u64,
    /// Revisions whose metadata record carried a different revision id.
    pub mismatched_metadata: u64,
}

impl CorpusSummary {
    /// Whether every revision was paired with its own metadata record.
    pub fn is_consistent(&self) -> bool {
        self.missing_metadata == 0 && self.mismatched_metadata == 0
    }
}

/// Scores every revision with [`BASELINE_SCORE`] and collects simple corpus
/// statistics.
pub struct CorpusStatistics<W: Write> {
    metadata: MetadataReceiver,
    results: ResultWriter<W>,
    progress_interval: Duration,
    last_progress: Instant,
    summary: CorpusSummary,
}

impl<W: Write> CorpusStatistics<W> {
    pub fn new(metadata: MetadataReceiver, results: ResultWriter<W>) -> Self {
        Self {
            metadata,
            results,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            last_progress: Instant::now(),
            summary: CorpusSummary::default(),
        }
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn summary(&self) -> CorpusSummary {
        self.summary
    }

    /// Take the metadata record belonging to `revision`.
    fn pair_metadata(&mut self, revision: &Revision) {
        match self.metadata.take() {
            Some(record) if record.revision_id != revision.id => {
                self.summary.mismatched_metadata += 1;
                warn!(
                    revision_id = %revision.id,
                    metadata_revision_id = %record.revision_id,
                    "metadata belongs to a different revision"
                );
            }
            Some(_) => {}
            None => {
                self.summary.missing_metadata += 1;
                warn!(revision_id = %revision.id, "no metadata left for revision");
            }
        }
    }

    fn log_statistics(&self) {
        info!(revisions = self.summary.revisions, "number of revisions");
        info!(
            registered_revisions = self.summary.registered_revisions,
            "number of registered revisions"
        );
    }
}

impl<W: Write> RevisionProcessor for CorpusStatistics<W> {
    fn start(&mut self) {
        info!("starting revision processing");
        self.last_progress = Instant::now();
    }

    fn process_revision(&mut self, revision: &Revision) -> Result<(), ProcessError> {
        self.pair_metadata(revision);
        self.results.write_score(&revision.id, BASELINE_SCORE)?;

        self.summary.revisions += 1;
        if revision.registered_contributor {
            self.summary.registered_revisions += 1;
        }

        if self.last_progress.elapsed() >= self.progress_interval {
            info!("current status");
            self.log_statistics();
            self.last_progress = Instant::now();
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ProcessError> {
        self.results.flush()?;
        info!("final result");
        self.log_statistics();
        Ok(())
    }
}
