//! Persisted run log.
//!
//! One CSV row per input record, flushed immediately so an interrupted run
//! still leaves a usable log.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::PipelineResult;
use crate::models::LogRow;

/// Append-only CSV sink for [`LogRow`]s.
pub struct ReportSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl ReportSink<File> {
    /// Create (truncate) a log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created.
    pub fn create(path: &Path) -> PipelineResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> ReportSink<W> {
    /// Wrap any writer; the header is written with the first row.
    pub fn new(inner: W) -> Self {
        Self { writer: csv::Writer::from_writer(inner), rows: 0 }
    }

    /// Append one row and flush.
    ///
    /// # Errors
    ///
    /// Returns error if the row cannot be written.
    pub fn append(&mut self, row: &LogRow) -> PipelineResult<()> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Recover the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns error if buffered data cannot be flushed.
    pub fn into_inner(self) -> PipelineResult<W> {
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

impl<W: Write> std::fmt::Debug for ReportSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportSink").field("rows", &self.rows).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(state: &str) -> LogRow {
        LogRow {
            eid: "2-s2.0-1".into(),
            doi: "10.1/abc".into(),
            doctype: "COMM".into(),
            state: state.into(),
            info: "hal-1".into(),
            hal_matches: String::new(),
            corresponding_emails: "j@x.com".into(),
        }
    }

    #[test]
    fn test_header_and_rows() {
        let mut sink = ReportSink::new(Vec::new());
        sink.append(&row("built")).unwrap();
        sink.append(&row("upload-success")).unwrap();
        assert_eq!(sink.rows(), 2);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "eid,doi,doctype,state,info,hal_matches,corresponding_emails");
        assert_eq!(lines[2], "2-s2.0-1,10.1/abc,COMM,upload-success,hal-1,,j@x.com");
    }
}
