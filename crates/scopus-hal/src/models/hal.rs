//! Wire models for the HAL search, referential and SWORD endpoints.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Solr-style JSON envelope returned by `search` and `ref` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct HalResponse<T> {
    /// Matching documents.
    pub response: Hits<T>,

    /// Facet counts (only when `facet=true` was requested).
    #[serde(default)]
    pub facet_counts: Option<FacetCounts>,
}

/// Result count plus the returned page of documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hits<T> {
    /// Total number of matches (may exceed `docs.len()`).
    #[serde(default)]
    pub num_found: u64,

    /// Returned documents.
    #[serde(default = "Vec::new")]
    pub docs: Vec<T>,
}

impl<T> Hits<T> {
    /// An empty result.
    #[must_use]
    pub const fn empty() -> Self {
        Self { num_found: 0, docs: Vec::new() }
    }

    /// Build a result whose count equals the number of docs.
    #[must_use]
    pub fn from_docs(docs: Vec<T>) -> Self {
        Self { num_found: docs.len() as u64, docs }
    }

    /// Check whether anything matched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.num_found == 0
    }
}

/// A deposited document returned by `search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDoc {
    /// Public URI of the notice.
    #[serde(rename = "uri_s", default)]
    pub uri: String,

    /// Title (HAL stores titles as a multi-valued field).
    #[serde(rename = "title_s", default, deserialize_with = "one_or_many")]
    pub titles: Vec<String>,
}

/// A referential entry (structure, journal, author).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefDoc {
    /// Internal HAL identifier.
    #[serde(deserialize_with = "string_or_number")]
    pub docid: String,

    /// Canonical label.
    #[serde(rename = "label_s", default)]
    pub label: String,

    /// Curation status (`VALID`, `OLD`, `INCOMING`).
    #[serde(rename = "valid_s", default)]
    pub valid: Option<String>,
}

impl RefDoc {
    /// Check the curation status against the given sentinel.
    #[must_use]
    pub fn has_status(&self, status: &str) -> bool {
        self.valid.as_deref().is_some_and(|v| v.eq_ignore_ascii_case(status))
    }
}

/// Facet section of a search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacetCounts {
    /// Facet field name to flattened `[value, count, value, count, ...]` list.
    #[serde(default)]
    pub facet_fields: HashMap<String, Vec<serde_json::Value>>,
}

impl FacetCounts {
    /// Decode one facet field into `(value, count)` pairs, in server order.
    #[must_use]
    pub fn ranked(&self, field: &str) -> Vec<(String, u64)> {
        let Some(flat) = self.facet_fields.get(field) else {
            return Vec::new();
        };

        flat.chunks_exact(2)
            .filter_map(|pair| {
                let value = pair[0].as_str()?.to_string();
                let count = pair[1].as_u64()?;
                Some((value, count))
            })
            .collect()
    }
}

/// Outcome of an accepted SWORD deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    /// HTTP status returned by the endpoint.
    pub status: u16,

    /// HAL identifier (e.g. `hal-01234567`) when the receipt carries one.
    pub hal_id: Option<String>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected docid, got {other}"))),
    }
}
