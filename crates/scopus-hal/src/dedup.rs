//! Duplicate detection against documents already in HAL.
//!
//! Two probes, in this order: exact DOI, then normalized title. A DOI hit
//! short-circuits the title probe.

use std::fmt;

use crate::error::ClientResult;
use crate::models::BibliographicRecord;
use crate::repository::{Repository, quote};

/// Which probe matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    /// `doiId_id` exact match.
    Doi,
    /// `title_t` token or phrase match.
    Title,
}

impl fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Doi => "doi match",
            Self::Title => "title match",
        })
    }
}

/// Outcome of the duplicate probes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateCheckResult {
    /// Number of matching HAL documents (0 = proceed).
    pub count: u64,

    /// URIs of the returned matches.
    pub uris: Vec<String>,

    /// Probe that found the matches.
    pub matched_by: Option<MatchedBy>,
}

impl DuplicateCheckResult {
    /// Whether the record must be skipped.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        self.count > 0
    }
}

/// Title tokens used by the title probe.
///
/// `&amp;` and `&` are dropped, every other non-alphanumeric character is
/// deleted in place (`Real-time` becomes `Realtime`); whitespace separates
/// tokens.
#[must_use]
pub fn title_tokens(title: &str) -> Vec<String> {
    title
        .replace("&amp;", " ")
        .replace('&', " ")
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(ToString::to_string)
        .collect()
}

/// Queries HAL for existing copies of a record.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateChecker {
    phrase_cutoff: u64,
}

impl DuplicateChecker {
    /// Create a checker; AND-queries with more than `phrase_cutoff` hits are
    /// re-checked with a phrase query.
    #[must_use]
    pub const fn new(phrase_cutoff: u64) -> Self {
        Self { phrase_cutoff }
    }

    /// Run the DOI probe, then the title probe.
    ///
    /// # Errors
    ///
    /// Returns error if a search request fails.
    pub async fn check<R>(&self, record: &BibliographicRecord, repo: &R) -> ClientResult<DuplicateCheckResult>
    where
        R: Repository + ?Sized,
    {
        if let Some(doi) = record.doi() {
            let hits = repo.search("doiId_id", &quote(doi)).await?;
            if !hits.is_empty() {
                return Ok(DuplicateCheckResult {
                    count: hits.num_found,
                    uris: hits.docs.into_iter().map(|d| d.uri).collect(),
                    matched_by: Some(MatchedBy::Doi),
                });
            }
        }

        self.check_title(&record.title, repo).await
    }

    async fn check_title<R>(&self, title: &str, repo: &R) -> ClientResult<DuplicateCheckResult>
    where
        R: Repository + ?Sized,
    {
        let tokens = title_tokens(title);
        if tokens.is_empty() {
            return Ok(DuplicateCheckResult::default());
        }

        let mut hits = repo.search("title_t", &format!("({})", tokens.join(" AND "))).await?;
        if hits.num_found > self.phrase_cutoff {
            tracing::debug!(hits = hits.num_found, "Title AND-query too broad, using phrase query");
            hits = repo.search("title_t", &quote(&tokens.join(" "))).await?;
        }

        if hits.is_empty() {
            return Ok(DuplicateCheckResult::default());
        }
        Ok(DuplicateCheckResult {
            count: hits.num_found,
            uris: hits.docs.into_iter().map(|d| d.uri).collect(),
            matched_by: Some(MatchedBy::Title),
        })
    }
}
