//! JSON array reader.

use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::models::BibliographicRecord;

/// Reads a JSON array of records; each element is decoded on its own.
#[derive(Debug)]
pub struct JsonSource {
    items: std::vec::IntoIter<serde_json::Value>,
}

impl JsonSource {
    /// Load from a file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a JSON array.
    pub fn from_path(path: &Path) -> SourceResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SourceError::io(path.display().to_string(), e))?;
        Self::from_json(&text)
    }

    /// Load from a string.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a JSON array.
    pub fn from_json(text: &str) -> SourceResult<Self> {
        let items: Vec<serde_json::Value> = serde_json::from_str(text)?;
        Ok(Self { items: items.into_iter() })
    }
}

impl Iterator for JsonSource {
    type Item = SourceResult<BibliographicRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.next()?;
        Some(serde_json::from_value(item).map_err(SourceError::from))
    }
}
