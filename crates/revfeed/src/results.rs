use std::io::Write;

/// Header of the result stream.
pub const RESULT_HEADER: [&str; 2] = ["REVISION_ID", "VANDALISM_SCORE"];

/// Writes one RFC 4180 result row per scored revision.
///
/// The header is written on construction and every row is flushed right
/// away, so the server sees each score as soon as it exists.
pub struct ResultWriter<W: Write> {
    inner: csv::Writer<W>,
    rows: u64,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(output: W) -> Result<Self, csv::Error> {
        let mut inner = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(output);
        inner.write_record(RESULT_HEADER)?;
        inner.flush()?;
        Ok(Self { inner, rows: 0 })
    }

    /// Write and flush one `(revision id, score)` row.
    pub fn write_score(&mut self, revision_id: &str, score: f32) -> Result<(), csv::Error> {
        let score = format!("{score:?}");
        self.inner.write_record([revision_id, score.as_str()])?;
        self.inner.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Number of rows written, header excluded.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> Result<(), csv::Error> {
        self.inner.flush().map_err(Into::into)
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> std::io::Result<W> {
        self.inner.into_inner().map_err(|err| err.into_error())
    }
}
