//! Literature-source readers.
//!
//! Each reader yields one `SourceResult<BibliographicRecord>` per input row,
//! so a malformed row becomes a per-record failure instead of aborting the
//! batch.

mod json;
mod scopus_csv;

use std::path::Path;

use crate::error::SourceResult;
use crate::models::BibliographicRecord;

pub use json::JsonSource;
pub use scopus_csv::ScopusCsvSource;

/// Boxed stream of source records.
pub type RecordStream = Box<dyn Iterator<Item = SourceResult<BibliographicRecord>>>;

/// Supported input layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    /// Scopus "Export to CSV" file.
    ScopusCsv,
    /// JSON array of structured records.
    Json,
}

/// Open `path` with the reader for `format`.
///
/// # Errors
///
/// Returns error if the file cannot be opened or its header is unreadable.
pub fn open(path: &Path, format: InputFormat) -> SourceResult<RecordStream> {
    Ok(match format {
        InputFormat::ScopusCsv => Box::new(ScopusCsvSource::from_path(path)?),
        InputFormat::Json => Box::new(JsonSource::from_path(path)?),
    })
}
