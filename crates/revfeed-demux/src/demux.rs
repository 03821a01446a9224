use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use revfeed_frame::FrameReader;
use tracing::{debug, error, info, trace, Span};

use crate::channel::RevisionWriter;
use crate::error::DemuxError;
use crate::metadata::MetadataRecord;
use crate::queue::MetadataSender;

/// How a demultiplexing pass over the input ended.
#[derive(Debug)]
pub enum DemuxOutcome {
    /// The stream ended cleanly after a complete pair.
    Completed { pairs: u64 },
    /// The stream ended cleanly right after a metadata frame, leaving that
    /// record without its revision.
    Inconsistent { pairs: u64, revision_id: String },
    /// The pass stopped on an error.
    Failed { pairs: u64, error: DemuxError },
}

impl DemuxOutcome {
    /// Number of complete `(metadata, revision)` pairs forwarded.
    pub fn pairs(&self) -> u64 {
        match self {
            Self::Completed { pairs }
            | Self::Inconsistent { pairs, .. }
            | Self::Failed { pairs, .. } => *pairs,
        }
    }

    /// Whether the stream ended cleanly on a pair boundary.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Revision id of the metadata record left without a revision.
    pub fn orphaned_revision(&self) -> Option<&str> {
        match self {
            Self::Inconsistent { revision_id, .. } => Some(revision_id),
            _ => None,
        }
    }

    /// The error that stopped the pass, if any.
    pub fn error(&self) -> Option<&DemuxError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

enum State {
    AwaitingMetadata,
    AwaitingRevision { revision_id: String },
    Terminated(DemuxOutcome),
}

/// Splits the alternating frame stream into the metadata queue and the
/// revision channel.
///
/// The revision channel is closed exactly once, whichever way the pass ends;
/// that close is what lets the consumer's blocking read finish.
pub struct Demultiplexer<R> {
    frames: FrameReader<R>,
    metadata: MetadataSender,
    revisions: RevisionWriter,
    span: Span,
    pairs: u64,
}

impl<R: Read> Demultiplexer<R> {
    pub fn new(frames: FrameReader<R>, metadata: MetadataSender, revisions: RevisionWriter) -> Self {
        Self {
            frames,
            metadata,
            revisions,
            span: Span::none(),
            pairs: 0,
        }
    }

    /// Log under `span` instead of the caller's current span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Run the pass to completion on the current thread.
    pub fn run(mut self) -> DemuxOutcome {
        let span = self.span.clone();
        let _entered = span.enter();

        let mut state = State::AwaitingMetadata;
        let outcome = loop {
            state = match state {
                State::AwaitingMetadata => self.await_metadata(),
                State::AwaitingRevision { revision_id } => self.await_revision(revision_id),
                State::Terminated(outcome) => break outcome,
            };
        };

        self.revisions.close();
        debug!(pairs = outcome.pairs(), "demultiplexer finished");
        outcome
    }

    /// Run the pass on a dedicated `demultiplexer` thread.
    pub fn spawn(self) -> io::Result<JoinHandle<DemuxOutcome>>
    where
        R: Send + 'static,
    {
        thread::Builder::new()
            .name("demultiplexer".to_string())
            .spawn(move || self.run())
    }

    fn await_metadata(&mut self) -> State {
        let frame = match self.frames.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(pairs = self.pairs, "end of stream");
                return State::Terminated(DemuxOutcome::Completed { pairs: self.pairs });
            }
            Err(err) => return self.fail(err.into(), None),
        };

        let record = match MetadataRecord::decode(&frame.payload) {
            Ok(record) => record,
            Err(err) => return self.fail(err.into(), None),
        };

        let revision_id = record.revision_id.clone();
        trace!(%revision_id, "queueing metadata");
        if self.metadata.put(record).is_err() {
            let error = DemuxError::QueueDisconnected {
                revision_id: revision_id.clone(),
            };
            return self.fail(error, Some(&revision_id));
        }

        State::AwaitingRevision { revision_id }
    }

    fn await_revision(&mut self, revision_id: String) -> State {
        let frame = match self.frames.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                error!(%revision_id, pairs = self.pairs, "metadata without revision");
                return State::Terminated(DemuxOutcome::Inconsistent {
                    pairs: self.pairs,
                    revision_id,
                });
            }
            Err(err) => return self.fail(err.into(), Some(&revision_id)),
        };

        trace!(%revision_id, size = frame.payload.len(), "forwarding revision");
        if let Err(source) = self.revisions.write_payload(&frame.payload) {
            let error = DemuxError::ChannelClosed {
                revision_id: revision_id.clone(),
                source,
            };
            return self.fail(error, Some(&revision_id));
        }

        self.pairs += 1;
        State::AwaitingMetadata
    }

    fn fail(&self, error: DemuxError, revision_id: Option<&str>) -> State {
        match revision_id {
            Some(revision_id) => error!(revision_id, pairs = self.pairs, %error, "demultiplexing failed"),
            None => error!(pairs = self.pairs, %error, "demultiplexing failed"),
        }
        State::Terminated(DemuxOutcome::Failed {
            pairs: self.pairs,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use revfeed_frame::{FrameError, FrameWriter};

    use super::*;
    use crate::channel::{revision_channel, RevisionReader};
    use crate::error::DecodeError;
    use crate::queue::{metadata_queue, MetadataReceiver};

    fn wire(frames: &[&[u8]]) -> Vec<u8> {
        let mut writer = FrameWriter::new(Vec::new());
        for frame in frames {
            writer.send(frame).unwrap();
        }
        writer.into_inner()
    }

    fn demux_over(
        bytes: Vec<u8>,
        queue_capacity: usize,
        channel_capacity: usize,
    ) -> (Demultiplexer<Cursor<Vec<u8>>>, MetadataReceiver, RevisionReader) {
        let (tx, rx) = metadata_queue(queue_capacity);
        let (writer, reader) = revision_channel(channel_capacity);
        let demux = Demultiplexer::new(FrameReader::new(Cursor::new(bytes)), tx, writer);
        (demux, rx, reader)
    }

    fn drain(reader: &mut RevisionReader) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    fn ids(rx: &MetadataReceiver) -> Vec<String> {
        rx.iter().map(|record| record.revision_id).collect()
    }

    #[test]
    fn single_pair_then_clean_end() {
        let bytes = wire(&[b"1,1,US,NA,EST,,,,", b"ABCDE"]);
        let (demux, rx, mut reader) = demux_over(bytes, 8, 64);

        let outcome = demux.run();

        assert!(matches!(outcome, DemuxOutcome::Completed { pairs: 1 }));
        let record = rx.take().unwrap();
        assert_eq!(record.revision_id, "1");
        assert_eq!(record.country_code, "US");
        assert!(rx.take().is_none());
        assert_eq!(drain(&mut reader), b"ABCDE");
    }

    #[test]
    fn many_pairs_keep_order_in_both_channels() {
        let metas: Vec<String> = (0..50).map(|i| format!("{i},{i},DE,EU,,,,,")).collect();
        let revisions: Vec<String> = (0..50).map(|i| format!("<revision>{i}</revision>")).collect();
        let mut frames: Vec<&[u8]> = Vec::new();
        for (meta, revision) in metas.iter().zip(&revisions) {
            frames.push(meta.as_bytes());
            frames.push(revision.as_bytes());
        }
        let (demux, rx, mut reader) = demux_over(wire(&frames), 64, 64 * 1024);

        let outcome = demux.run();

        assert!(outcome.is_complete());
        assert_eq!(outcome.pairs(), 50);
        let expected_ids: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        assert_eq!(ids(&rx), expected_ids);
        assert_eq!(drain(&mut reader), revisions.concat().into_bytes());
    }

    #[test]
    fn empty_input_terminates_without_output() {
        let (demux, rx, mut reader) = demux_over(Vec::new(), 4, 16);

        let outcome = demux.run();

        assert!(matches!(outcome, DemuxOutcome::Completed { pairs: 0 }));
        assert!(rx.take().is_none());
        assert!(drain(&mut reader).is_empty());
    }

    #[test]
    fn metadata_without_revision_is_inconsistent() {
        let bytes = wire(&[b"1,1,US,NA,EST,,,,", b"ABCDE", b"2,1,US,NA,EST,,,,"]);
        let (demux, rx, mut reader) = demux_over(bytes, 4, 64);

        let outcome = demux.run();

        assert!(matches!(
            &outcome,
            DemuxOutcome::Inconsistent { pairs: 1, revision_id } if revision_id == "2"
        ));
        assert_eq!(outcome.orphaned_revision(), Some("2"));
        assert_eq!(ids(&rx), ["1", "2"]);
        assert_eq!(drain(&mut reader), b"ABCDE");
    }

    #[test]
    fn truncated_metadata_frame_fails() {
        let mut bytes = wire(&[b"1,1,US,NA,EST,,,,", b"ABCDE"]);
        bytes.extend_from_slice(&[0, 0, 0, 40]);
        bytes.extend_from_slice(b"2,1,US");
        let (demux, rx, mut reader) = demux_over(bytes, 4, 64);

        let outcome = demux.run();

        assert!(matches!(
            outcome,
            DemuxOutcome::Failed {
                pairs: 1,
                error: DemuxError::Frame(FrameError::Truncated { expected: 44, received: 10 })
            }
        ));
        assert_eq!(ids(&rx), ["1"]);
        assert_eq!(drain(&mut reader), b"ABCDE");
    }

    #[test]
    fn truncated_revision_frame_writes_nothing_partial() {
        let mut bytes = wire(&[b"1,1,US,NA,EST,,,,"]);
        bytes.extend_from_slice(&[0, 0, 0, 33]);
        bytes.extend_from_slice(b"<revision>");
        let (demux, rx, mut reader) = demux_over(bytes, 4, 64);

        let outcome = demux.run();

        assert!(matches!(
            outcome.error(),
            Some(DemuxError::Frame(FrameError::Truncated { .. }))
        ));
        assert_eq!(outcome.pairs(), 0);
        assert_eq!(ids(&rx), ["1"]);
        assert!(drain(&mut reader).is_empty());
    }

    #[test]
    fn undecodable_metadata_is_fatal() {
        let bytes = wire(&[b"1,2,3", b"ABCDE", b"2,1,US,NA,EST,,,,", b"FGHIJ"]);
        let (demux, rx, mut reader) = demux_over(bytes, 4, 64);

        let outcome = demux.run();

        assert!(matches!(
            outcome.error(),
            Some(DemuxError::Decode(DecodeError::FieldCount { found: 3, .. }))
        ));
        assert!(rx.take().is_none());
        assert!(drain(&mut reader).is_empty());
    }

    #[test]
    fn dropped_metadata_consumer_stops_the_pass() {
        let bytes = wire(&[b"1,1,US,NA,EST,,,,", b"ABCDE"]);
        let (demux, rx, mut reader) = demux_over(bytes, 4, 64);
        drop(rx);

        let outcome = demux.run();

        assert!(matches!(
            outcome.error(),
            Some(DemuxError::QueueDisconnected { revision_id }) if revision_id == "1"
        ));
        assert!(drain(&mut reader).is_empty());
    }

    #[test]
    fn dropped_revision_consumer_stops_the_pass() {
        let bytes = wire(&[b"1,1,US,NA,EST,,,,", b"ABCDE"]);
        let (demux, _rx, reader) = demux_over(bytes, 4, 64);
        drop(reader);

        let outcome = demux.run();

        assert!(matches!(
            outcome.error(),
            Some(DemuxError::ChannelClosed { revision_id, .. }) if revision_id == "1"
        ));
    }

    #[test]
    fn concurrent_consumer_sees_matching_pairs_under_backpressure() {
        const PAIRS: usize = 200;
        const PAYLOAD_LEN: usize = 8;
        let metas: Vec<String> = (0..PAIRS).map(|i| format!("{i},0,,,,,,,")).collect();
        let revisions: Vec<String> = (0..PAIRS).map(|i| format!("{i:0>8}")).collect();
        let mut frames: Vec<&[u8]> = Vec::new();
        for (meta, revision) in metas.iter().zip(&revisions) {
            frames.push(meta.as_bytes());
            frames.push(revision.as_bytes());
        }
        let (demux, rx, mut reader) = demux_over(wire(&frames), 2, 3 * PAYLOAD_LEN);

        let handle = demux.spawn().unwrap();

        let mut seen = 0usize;
        let mut payload = [0u8; PAYLOAD_LEN];
        while reader.read_exact(&mut payload).is_ok() {
            let record = rx
                .take_timeout(Duration::from_secs(5))
                .unwrap()
                .expect("one metadata record per revision");
            let revision: usize = std::str::from_utf8(&payload).unwrap().parse().unwrap();
            assert_eq!(record.revision_id, revision.to_string());
            seen += 1;
        }

        let outcome = handle.join().unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.pairs(), PAIRS as u64);
        assert_eq!(seen, PAIRS);
        assert!(rx.take().is_none());
    }

    #[test]
    fn spawned_thread_is_named() {
        let (demux, _rx, _reader) = demux_over(Vec::new(), 1, 1);
        let demux = demux.with_span(tracing::info_span!("session", id = 1));
        let handle = demux.spawn().unwrap();

        assert_eq!(handle.thread().name(), Some("demultiplexer"));
        assert!(handle.join().unwrap().is_complete());
    }
}
