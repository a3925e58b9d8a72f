//! Curated author alias table.
//!
//! Maps an author key (`Surname I.`) to identity data maintained by hand:
//! full forename, HAL structure ids, idHAL and email.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{SourceError, SourceResult};
use crate::models::{AuthorEntry, non_blank};

/// One curated row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AliasRow {
    /// Author key, `Surname I.`
    pub key: String,

    /// Expected forename; guards against homonyms sharing a key.
    #[serde(default)]
    pub forename: String,

    /// Comma-joined HAL structure ids.
    #[serde(default, rename = "affil_id")]
    pub affiliation_ids: String,

    /// idHAL.
    #[serde(default, rename = "idHAL")]
    pub hal_id: String,

    /// Contact email.
    #[serde(default, rename = "mail")]
    pub email: String,
}

impl AliasRow {
    /// Structure ids as a list.
    #[must_use]
    pub fn structure_ids(&self) -> Vec<String> {
        self.affiliation_ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

/// Outcome of resolving one author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOutcome {
    /// No row for this key.
    Unknown,
    /// Row found and empty fields filled in.
    Merged,
    /// Row found but its forename disagrees with the source; nothing merged.
    ForenameMismatch,
}

/// Lookup table keyed by `Surname I.`
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    rows: HashMap<String, AliasRow>,
}

impl AliasTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from rows; a later row for the same key replaces an earlier one.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = AliasRow>) -> Self {
        let rows = rows.into_iter().map(|row| (row.key.trim().to_string(), row)).collect();
        Self { rows }
    }

    /// Load from a CSV file with a `key,forename,affil_id,idHAL,mail` header.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a row is malformed.
    pub fn from_path(path: &Path) -> SourceResult<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| SourceError::io(path.display().to_string(), e))?;
        Self::from_reader(file)
    }

    /// Load from any CSV reader.
    ///
    /// # Errors
    ///
    /// Returns error if a row is malformed.
    pub fn from_reader(reader: impl Read) -> SourceResult<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let rows = csv.deserialize::<AliasRow>().collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_rows(rows))
    }

    /// Number of curated authors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AliasRow> {
        self.rows.get(key)
    }

    /// Enrich one author in place.
    ///
    /// Fields already populated on the author are never overwritten.
    pub fn resolve(&self, author: &mut AuthorEntry) -> AliasOutcome {
        let key = author.key();
        let Some(row) = self.rows.get(&key) else {
            return AliasOutcome::Unknown;
        };

        let source_forename = author.forename.as_deref().map_or("", str::trim);
        if source_forename != row.forename.trim() {
            tracing::warn!(
                key = %key,
                source = %source_forename,
                curated = %row.forename,
                "Forename mismatch, alias not merged"
            );
            return AliasOutcome::ForenameMismatch;
        }

        if author.structure_ids.is_empty() {
            author.structure_ids = row.structure_ids();
        }
        if non_blank(author.hal_id.as_deref()).is_none() && !row.hal_id.is_empty() {
            author.hal_id = Some(row.hal_id.clone());
        }
        if non_blank(author.email.as_deref()).is_none() && !row.email.is_empty() {
            author.email = Some(row.email.clone());
        }

        tracing::debug!(key = %key, "Alias merged");
        AliasOutcome::Merged
    }

    /// Enrich every author of a record.
    pub fn resolve_all(&self, authors: &mut [AuthorEntry]) {
        for author in authors {
            self.resolve(author);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "key,forename,affil_id,idHAL,mail\n\
        Smith J.,John,200,smith-j,j@x.com\n\
        Durand P.,Pierre,\"117, 1040113\",,\n";

    fn smith(forename: &str) -> AuthorEntry {
        AuthorEntry { forename: Some(forename.to_string()), ..AuthorEntry::new("Smith", "J.") }
    }

    #[test]
    fn test_load_table() {
        let table = AliasTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Durand P.").unwrap().structure_ids(), vec!["117", "1040113"]);
    }

    #[test]
    fn test_merge_on_matching_forename() {
        let table = AliasTable::from_reader(TABLE.as_bytes()).unwrap();
        let mut author = smith("John");

        assert_eq!(table.resolve(&mut author), AliasOutcome::Merged);
        assert_eq!(author.structure_ids, vec!["200"]);
        assert_eq!(author.hal_id.as_deref(), Some("smith-j"));
        assert_eq!(author.email.as_deref(), Some("j@x.com"));
    }

    #[test]
    fn test_mismatch_merges_nothing() {
        let table = AliasTable::from_reader(TABLE.as_bytes()).unwrap();
        let mut author = smith("Jane");

        assert_eq!(table.resolve(&mut author), AliasOutcome::ForenameMismatch);
        assert!(author.structure_ids.is_empty());
        assert!(author.hal_id.is_none());
        assert!(author.email.is_none());
    }

    #[test]
    fn test_populated_fields_kept() {
        let table = AliasTable::from_reader(TABLE.as_bytes()).unwrap();
        let mut author = smith("John");
        author.email = Some("john.smith@lab.fr".into());

        table.resolve(&mut author);
        assert_eq!(author.email.as_deref(), Some("john.smith@lab.fr"));
        assert_eq!(author.hal_id.as_deref(), Some("smith-j"));
    }

    #[test]
    fn test_unknown_key() {
        let table = AliasTable::new();
        let mut author = smith("John");
        assert_eq!(table.resolve(&mut author), AliasOutcome::Unknown);
    }
}
