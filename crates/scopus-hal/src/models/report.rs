//! Per-record processing states and the persisted log row.

use std::fmt;

use serde::Serialize;

/// Position of a record in the processing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    /// Record read from the source.
    Received,
    /// Source document type has no HAL counterpart (terminal).
    UnsupportedType,
    /// Mandatory field missing from the source row (terminal).
    InvalidRecord,
    /// Already deposited in HAL (terminal).
    Duplicate,
    /// Canonical document derived.
    Normalized,
    /// Authors and affiliations linked to HAL entities.
    Linked,
    /// TEI notice serialized (terminal in dry-run mode).
    Built,
    /// Notice accepted by the SWORD endpoint (terminal).
    UploadSuccess,
    /// Notice rejected by the SWORD endpoint (terminal).
    UploadFailed,
    /// A remote call or local write failed before upload (terminal).
    Failed,
}

impl RecordState {
    /// Label written to the log table.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::UnsupportedType => "unsupported-type",
            Self::InvalidRecord => "invalid-record",
            Self::Duplicate => "duplicate",
            Self::Normalized => "normalized",
            Self::Linked => "linked",
            Self::Built => "built",
            Self::UploadSuccess => "upload-success",
            Self::UploadFailed => "upload-failed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the persisted run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRow {
    /// Scopus EID.
    pub eid: String,

    /// DOI.
    pub doi: String,

    /// HAL document type code, or the source label when unsupported.
    pub doctype: String,

    /// Final state label.
    pub state: String,

    /// Free-form detail (error message, HAL id, skipped type).
    pub info: String,

    /// Matching HAL URIs, `;`-joined.
    pub hal_matches: String,

    /// Corresponding-author emails, `;`-joined.
    pub corresponding_emails: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(RecordState::UploadSuccess.to_string(), "upload-success");
        assert_eq!(RecordState::UnsupportedType.label(), "unsupported-type");
    }
}
