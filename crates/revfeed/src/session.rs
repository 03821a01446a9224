//! One end-to-end pass over a data stream.
//!
//! The demultiplexer runs on its own thread; revision processing runs on the
//! calling thread. Either side stopping releases the other: the consumer
//! drops its channel ends before joining, and a failed consumer asks the
//! input to stop so a demultiplexer blocked on the network wakes up.

use std::io::{Read, Write};
use std::net::Shutdown;
use std::time::Duration;

use revfeed_demux::{metadata_queue, revision_channel, DemuxConfig, DemuxOutcome, Demultiplexer};
use revfeed_frame::{FrameConfig, FrameReader};
use revfeed_transport::ServerStream;
use tracing::{info, info_span, warn};

use crate::dump::RevisionDumpParser;
use crate::error::SessionError;
use crate::results::ResultWriter;
use crate::stats::{CorpusStatistics, CorpusSummary, DEFAULT_PROGRESS_INTERVAL};

/// Stops the input of a running session from outside the demultiplexer.
pub trait StopInput {
    fn stop_input(&self);
}

/// Inputs that end on their own.
impl StopInput for () {
    fn stop_input(&self) {}
}

impl StopInput for ServerStream {
    fn stop_input(&self) {
        if let Err(err) = self.shutdown(Shutdown::Read) {
            warn!(%err, "failed to stop server input");
        }
    }
}

/// Tuning for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub frame: FrameConfig,
    pub demux: DemuxConfig,
    /// How often processing progress is logged.
    pub progress_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            demux: DemuxConfig::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// What a finished session saw.
#[derive(Debug)]
pub struct SessionReport {
    pub outcome: DemuxOutcome,
    pub summary: CorpusSummary,
}

impl SessionReport {
    /// Clean end of stream, every forwarded revision scored against its own
    /// metadata.
    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete() && self.counts_match() && self.summary.is_consistent()
    }

    /// Whether the consumer scored exactly the revisions the demultiplexer
    /// forwarded.
    pub fn counts_match(&self) -> bool {
        self.summary.revisions == self.outcome.pairs()
    }
}

/// Demultiplex `input`, score every revision into `results`, and wait for
/// both sides to finish.
///
/// `stop` is invoked when processing fails while the demultiplexer may still
/// be reading.
pub fn run_session<R, W, S>(
    input: R,
    results: W,
    stop: &S,
    config: &SessionConfig,
) -> Result<SessionReport, SessionError>
where
    R: Read + Send + 'static,
    W: Write,
    S: StopInput + ?Sized,
{
    let span = info_span!("session");
    let _entered = span.enter();

    let results = ResultWriter::new(results)?;

    let (metadata_tx, metadata_rx) = metadata_queue(config.demux.queue_capacity);
    let (revision_tx, revision_rx) = revision_channel(config.demux.revision_buffer);
    let frames = FrameReader::with_config(input, config.frame.clone());
    let handle = Demultiplexer::new(frames, metadata_tx, revision_tx)
        .with_span(span.clone())
        .spawn()
        .map_err(SessionError::Spawn)?;

    let mut parser = RevisionDumpParser::new(revision_rx)
        .with_max_revision_size(config.frame.max_payload_size);
    let mut stats = CorpusStatistics::new(metadata_rx, results)
        .with_progress_interval(config.progress_interval);
    let processed = parser.process_all(&mut stats);
    let summary = stats.summary();
    drop(parser);
    drop(stats);

    if processed.is_err() {
        stop.stop_input();
    }
    let outcome = handle.join().map_err(|_| SessionError::DemuxPanicked)?;
    processed?;

    let report = SessionReport { outcome, summary };
    if report.counts_match() {
        info!(revisions = summary.revisions, "session finished");
    } else {
        warn!(
            revisions = summary.revisions,
            pairs = report.outcome.pairs(),
            "scored revisions differ from forwarded pairs"
        );
    }
    Ok(report)
}
