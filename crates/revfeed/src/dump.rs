//! Revision reconstruction from the continuous revision byte stream.
//!
//! The demultiplexer forwards raw dump fragments without looking at them.
//! Here the boundaries come back: every `<revision>…</revision>` element is
//! one revision. Text between elements (page wrappers, whitespace) is
//! skipped.

use std::io::{ErrorKind, Read};

use bytes::{Buf, Bytes, BytesMut};
use revfeed_frame::DEFAULT_MAX_PAYLOAD;
use tracing::debug;

use crate::error::{DumpError, ProcessError};
use crate::processor::RevisionProcessor;

const OPEN_TAG: &[u8] = b"<revision";
const CLOSE_TAG: &[u8] = b"</revision>";
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// One revision as it appeared in the dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Revision id, the first `<id>` inside the element.
    pub id: String,
    /// Whether the contributor is a registered user rather than an IP.
    pub registered_contributor: bool,
    /// The complete `<revision>` element.
    pub xml: Bytes,
}

impl Revision {
    /// Extract the fields used downstream from one revision element.
    pub fn from_xml(xml: Bytes) -> Result<Self, DumpError> {
        let id = element_text(&xml, b"<id>", b"</id>")
            .map(|id| String::from_utf8_lossy(id).trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(DumpError::MissingRevisionId)?;

        let registered_contributor = element_text(&xml, b"<contributor>", b"</contributor>")
            .map(|contributor| find(contributor, b"<username>").is_some())
            .unwrap_or(false);

        Ok(Self {
            id,
            registered_contributor,
            xml,
        })
    }
}

/// Reads revisions one at a time from a byte stream.
pub struct RevisionDumpParser<R> {
    inner: R,
    buf: BytesMut,
    chunk: Vec<u8>,
    scan_from: usize,
    eof: bool,
    max_revision_size: usize,
}

impl<R: Read> RevisionDumpParser<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            chunk: vec![0u8; READ_CHUNK_SIZE],
            scan_from: 0,
            eof: false,
            max_revision_size: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Limit how large a single revision element may grow.
    pub fn with_max_revision_size(mut self, max: usize) -> Self {
        self.max_revision_size = max;
        self
    }

    /// Read the next revision (blocking).
    ///
    /// Returns `Ok(None)` once the stream has ended outside any revision.
    pub fn next_revision(&mut self) -> Result<Option<Revision>, DumpError> {
        loop {
            if let Some(xml) = self.split_revision()? {
                return Revision::from_xml(xml).map(Some);
            }

            if self.eof {
                if self.buf.starts_with(OPEN_TAG) {
                    return Err(DumpError::Truncated {
                        buffered: self.buf.len(),
                    });
                }
                return Ok(None);
            }

            self.fill()?;
        }
    }

    /// Feed every revision to `processor`, then finish it.
    ///
    /// `finish` runs even when processing stops early, so the processor can
    /// flush what it already produced. Returns the number of revisions
    /// processed.
    pub fn process_all<P>(&mut self, processor: &mut P) -> Result<u64, ProcessError>
    where
        P: RevisionProcessor + ?Sized,
    {
        processor.start();

        let mut processed = 0u64;
        let result = loop {
            match self.next_revision() {
                Ok(Some(revision)) => {
                    if let Err(err) = processor.process_revision(&revision) {
                        break Err(err);
                    }
                    processed += 1;
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(err.into()),
            }
        };

        let finished = processor.finish();
        result?;
        finished?;
        debug!(processed, "revision stream finished");
        Ok(processed)
    }

    fn fill(&mut self) -> Result<(), DumpError> {
        loop {
            match self.inner.read(&mut self.chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&self.chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Split one complete revision element off the front of the buffer.
    fn split_revision(&mut self) -> Result<Option<Bytes>, DumpError> {
        let Some(start) = find_open_tag(&self.buf) else {
            // Keep a tail that may be the start of an opening tag.
            let keep = OPEN_TAG.len() - 1;
            if self.buf.len() > keep {
                self.buf.advance(self.buf.len() - keep);
            }
            self.scan_from = 0;
            return Ok(None);
        };

        if start > 0 {
            self.buf.advance(start);
            self.scan_from = self.scan_from.saturating_sub(start);
        }
        if self.buf.len() == OPEN_TAG.len() {
            // `<revision` with nothing after it yet; it may still turn out
            // to be `<revisions…`.
            return Ok(None);
        }

        let search_from = self.scan_from.max(OPEN_TAG.len());
        match self.buf.get(search_from..).and_then(|rest| find(rest, CLOSE_TAG)) {
            Some(pos) => {
                let end = search_from + pos + CLOSE_TAG.len();
                self.scan_from = 0;
                Ok(Some(self.buf.split_to(end).freeze()))
            }
            None => {
                if self.buf.len() > self.max_revision_size {
                    return Err(DumpError::RevisionTooLarge {
                        max: self.max_revision_size,
                    });
                }
                self.scan_from = self.buf.len().saturating_sub(CLOSE_TAG.len() - 1);
                Ok(None)
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Position of the first `<revision` that is a revision opening tag, or
/// that sits at the very end of the buffer and may still become one.
fn find_open_tag(buf: &[u8]) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = find(&buf[offset..], OPEN_TAG) {
        let start = offset + pos;
        match buf.get(start + OPEN_TAG.len()) {
            None => return Some(start),
            Some(b'>') => return Some(start),
            Some(c) if c.is_ascii_whitespace() => return Some(start),
            Some(_) => offset = start + 1,
        }
    }
    None
}

fn element_text<'a>(xml: &'a [u8], open: &[u8], close: &[u8]) -> Option<&'a [u8]> {
    let start = find(xml, open)? + open.len();
    let len = find(&xml[start..], close)?;
    Some(&xml[start..start + len])
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn revision_xml(id: u32, contributor: &str) -> String {
        format!(
            "<revision>\n  <id>{id}</id>\n  <parentid>{}</parentid>\n  \
             <timestamp>2016-03-01T00:00:00Z</timestamp>\n  \
             <contributor>{contributor}</contributor>\n  \
             <model>wikibase-item</model>\n  \
             <text xml:space=\"preserve\">{{\"type\":\"item\"}}</text>\n</revision>\n",
            id.saturating_sub(1)
        )
    }

    fn registered(id: u32) -> String {
        revision_xml(id, "<username>Alice</username><id>77</id>")
    }

    fn anonymous(id: u32) -> String {
        revision_xml(id, "<ip>192.0.2.1</ip>")
    }

    fn parse_all(bytes: Vec<u8>) -> Result<Vec<Revision>, DumpError> {
        let mut parser = RevisionDumpParser::new(Cursor::new(bytes));
        let mut revisions = Vec::new();
        while let Some(revision) = parser.next_revision()? {
            revisions.push(revision);
        }
        Ok(revisions)
    }

    #[test]
    fn parses_consecutive_revisions() {
        let stream = format!("{}{}", registered(11), anonymous(12));
        let revisions = parse_all(stream.into_bytes()).unwrap();

        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0].id, "11");
        assert!(revisions[0].registered_contributor);
        assert_eq!(revisions[1].id, "12");
        assert!(!revisions[1].registered_contributor);
        assert!(revisions[1].xml.starts_with(b"<revision>"));
        assert!(revisions[1].xml.ends_with(b"</revision>"));
    }

    #[test]
    fn skips_page_wrappers_and_attributes() {
        let stream = format!(
            "<page>\n<title>Q1</title>\n<revisions-note/>\n<revision id-hint=\"x\">\n<id>5</id>\n</revision>\n</page>\n{}",
            anonymous(6)
        );
        let revisions = parse_all(stream.into_bytes()).unwrap();

        let ids: Vec<_> = revisions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["5", "6"]);
    }

    #[test]
    fn empty_stream_has_no_revisions() {
        assert!(parse_all(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn trailing_text_after_last_revision_is_ignored() {
        let stream = format!("{}</page>\n</mediawiki>\n", registered(3));
        let revisions = parse_all(stream.into_bytes()).unwrap();
        assert_eq!(revisions.len(), 1);
    }

    #[test]
    fn stream_ending_inside_revision_is_truncated() {
        let mut stream = registered(1);
        stream.push_str("<revision>\n  <id>2</id>\n");
        let err = parse_all(stream.into_bytes()).unwrap_err();
        assert!(matches!(err, DumpError::Truncated { .. }));
    }

    #[test]
    fn revision_without_id_is_rejected() {
        let err = parse_all(b"<revision><comment>x</comment></revision>".to_vec()).unwrap_err();
        assert!(matches!(err, DumpError::MissingRevisionId));
    }

    #[test]
    fn unterminated_revision_is_bounded() {
        let mut stream = b"<revision><id>1</id><text>".to_vec();
        stream.extend(std::iter::repeat(b'x').take(4096));
        let mut parser = RevisionDumpParser::new(Cursor::new(stream)).with_max_revision_size(1024);

        let err = parser.next_revision().unwrap_err();
        assert!(matches!(err, DumpError::RevisionTooLarge { max: 1024 }));
    }

    struct OneByteAtATime(Cursor<Vec<u8>>);

    impl Read for OneByteAtATime {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let end = buf.len().min(1);
            self.0.read(&mut buf[..end])
        }
    }

    #[test]
    fn boundaries_survive_single_byte_reads() {
        let stream = format!("<page>{}{}</page>", anonymous(40), registered(41));
        let mut parser = RevisionDumpParser::new(OneByteAtATime(Cursor::new(stream.into_bytes())));

        assert_eq!(parser.next_revision().unwrap().unwrap().id, "40");
        let second = parser.next_revision().unwrap().unwrap();
        assert_eq!(second.id, "41");
        assert!(second.registered_contributor);
        assert!(parser.next_revision().unwrap().is_none());
    }

    #[test]
    fn look_alike_tag_split_across_reads_is_skipped() {
        let stream = format!("<revisions-note/>{}", anonymous(8));
        let mut parser = RevisionDumpParser::new(OneByteAtATime(Cursor::new(stream.into_bytes())));

        let revision = parser.next_revision().unwrap().unwrap();
        assert_eq!(revision.id, "8");
        assert!(revision.xml.starts_with(b"<revision>"));
        assert!(parser.next_revision().unwrap().is_none());
    }

    #[derive(Default)]
    struct Recorder {
        started: bool,
        finished: bool,
        ids: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl RevisionProcessor for Recorder {
        fn start(&mut self) {
            self.started = true;
        }

        fn process_revision(&mut self, revision: &Revision) -> Result<(), ProcessError> {
            if self.fail_on == Some(revision.id.as_str()) {
                return Err(DumpError::MissingRevisionId.into());
            }
            self.ids.push(revision.id.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<(), ProcessError> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn process_all_drives_processor_lifecycle() {
        let stream = format!("{}{}{}", anonymous(1), anonymous(2), registered(3));
        let mut parser = RevisionDumpParser::new(Cursor::new(stream.into_bytes()));
        let mut recorder = Recorder::default();

        let processed = parser.process_all(&mut recorder).unwrap();

        assert_eq!(processed, 3);
        assert!(recorder.started && recorder.finished);
        assert_eq!(recorder.ids, ["1", "2", "3"]);
    }

    #[test]
    fn process_all_finishes_processor_on_error() {
        let stream = format!("{}{}{}", anonymous(1), anonymous(2), registered(3));
        let mut parser = RevisionDumpParser::new(Cursor::new(stream.into_bytes()));
        let mut recorder = Recorder {
            fail_on: Some("2"),
            ..Recorder::default()
        };

        assert!(parser.process_all(&mut recorder).is_err());
        assert!(recorder.finished);
        assert_eq!(recorder.ids, ["1"]);
    }
}
