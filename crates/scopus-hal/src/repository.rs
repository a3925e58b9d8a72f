//! Repository capabilities consumed by the pipeline.
//!
//! [`Repository`] covers the read side (document search, referential lookups,
//! facets) and [`Depositor`] the SWORD ingestion sink. [`crate::HalClient`]
//! implements both over HTTP; [`InMemoryRepository`] is a deterministic fake
//! for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::{ClientError, ClientResult};
use crate::models::{DepositReceipt, Hits, RefDoc, SearchDoc};

/// HAL referential kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Research structures (labs, universities, companies).
    Structure,
    /// Journals.
    Journal,
}

impl RefKind {
    /// Path segment under the `ref` endpoint.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Journal => "journal",
        }
    }
}

/// Facet counts for one search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetResult {
    /// Number of documents matching the search.
    pub num_found: u64,

    /// `(value, count)` pairs, most frequent first.
    pub values: Vec<(String, u64)>,
}

impl FacetResult {
    /// Most frequent facet value.
    #[must_use]
    pub fn top(&self) -> Option<&str> {
        self.values.first().map(|(value, _)| value.as_str())
    }
}

/// Read access to the repository.
///
/// `value` is a ready-made Solr expression; use [`quote`] or [`free_text`]
/// to build one from user data.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    /// Search deposited documents: `field:value`.
    async fn search(&self, field: &str, value: &str) -> ClientResult<Hits<SearchDoc>>;

    /// Look up a referential: `kind` entries matching `field:value`.
    async fn reference(&self, kind: RefKind, field: &str, value: &str)
    -> ClientResult<Hits<RefDoc>>;

    /// Facet counts of `facet_field` over documents matching `field:value`.
    async fn facet(&self, field: &str, value: &str, facet_field: &str)
    -> ClientResult<FacetResult>;
}

/// SWORD ingestion sink.
#[async_trait::async_trait]
pub trait Depositor: Send + Sync {
    /// Submit one TEI notice. The notice is either accepted or rejected as a whole.
    async fn deposit(&self, tei: &str) -> ClientResult<DepositReceipt>;
}

/// Quote a literal for an exact Solr match.
#[must_use]
pub fn quote(value: &str) -> String {
    let escaped = value.trim().replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Turn arbitrary text into a grouped free-text Solr clause: `(word word ...)`.
///
/// Query-syntax characters are blanked out so organization names like
/// "R&D (Paris)" cannot break the query.
#[must_use]
pub fn free_text(value: &str) -> String {
    let cleaned: String = value
        .replace("&amp;", " ")
        .chars()
        .map(|c| if "+-&|!(){}[]^\"~*?:\\/".contains(c) { ' ' } else { c })
        .collect();
    format!("({})", cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// In-memory repository keyed on exact `(field, value)` queries.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    searches: HashMap<(String, String), Hits<SearchDoc>>,
    references: HashMap<(RefKind, String, String), Vec<RefDoc>>,
    facets: HashMap<(String, String), FacetResult>,
    unavailable: Vec<RefKind>,
    rejection: Option<(u16, String)>,
    calls: Mutex<Vec<String>>,
    deposits: Mutex<Vec<String>>,
}

impl InMemoryRepository {
    /// Empty repository: every lookup misses, every deposit is accepted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register search hits for `field:value`.
    #[must_use]
    pub fn with_search(mut self, field: &str, value: &str, docs: Vec<SearchDoc>) -> Self {
        self.searches.insert((field.to_string(), value.to_string()), Hits::from_docs(docs));
        self
    }

    /// Register a search whose reported count exceeds the returned docs.
    #[must_use]
    pub fn with_search_count(mut self, field: &str, value: &str, num_found: u64) -> Self {
        self.searches.insert(
            (field.to_string(), value.to_string()),
            Hits { num_found, docs: Vec::new() },
        );
        self
    }

    /// Register referential entries for `kind` / `field:value`.
    #[must_use]
    pub fn with_reference(mut self, kind: RefKind, field: &str, value: &str, docs: Vec<RefDoc>) -> Self {
        self.references.insert((kind, field.to_string(), value.to_string()), docs);
        self
    }

    /// Register facet counts for `field:value`.
    #[must_use]
    pub fn with_facet(mut self, field: &str, value: &str, facet: FacetResult) -> Self {
        self.facets.insert((field.to_string(), value.to_string()), facet);
        self
    }

    /// Make every lookup of `kind` fail with a server error.
    #[must_use]
    pub fn with_unavailable(mut self, kind: RefKind) -> Self {
        self.unavailable.push(kind);
        self
    }

    /// Reject every deposit with the given status.
    #[must_use]
    pub fn rejecting_deposits(mut self, status: u16, message: impl Into<String>) -> Self {
        self.rejection = Some((status, message.into()));
        self
    }

    /// Queries issued so far, as `search field:value` / `ref kind field:value` lines.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Notices received so far.
    #[must_use]
    pub fn deposits(&self) -> Vec<String> {
        self.deposits.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

#[async_trait::async_trait]
impl Repository for InMemoryRepository {
    async fn search(&self, field: &str, value: &str) -> ClientResult<Hits<SearchDoc>> {
        self.record(format!("search {field}:{value}"));
        Ok(self
            .searches
            .get(&(field.to_string(), value.to_string()))
            .cloned()
            .unwrap_or_else(Hits::empty))
    }

    async fn reference(
        &self,
        kind: RefKind,
        field: &str,
        value: &str,
    ) -> ClientResult<Hits<RefDoc>> {
        self.record(format!("ref {} {field}:{value}", kind.path()));
        if self.unavailable.contains(&kind) {
            return Err(ClientError::server(503, format!("{} referential unavailable", kind.path())));
        }
        Ok(self
            .references
            .get(&(kind, field.to_string(), value.to_string()))
            .cloned()
            .map(Hits::from_docs)
            .unwrap_or_else(Hits::empty))
    }

    async fn facet(&self, field: &str, value: &str, facet_field: &str) -> ClientResult<FacetResult> {
        self.record(format!("facet {facet_field} {field}:{value}"));
        Ok(self.facets.get(&(field.to_string(), value.to_string())).cloned().unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl Depositor for InMemoryRepository {
    async fn deposit(&self, tei: &str) -> ClientResult<DepositReceipt> {
        if let Some((status, message)) = &self.rejection {
            return Err(ClientError::deposit_rejected(*status, message.clone()));
        }

        let mut deposits = self.deposits.lock().unwrap_or_else(PoisonError::into_inner);
        deposits.push(tei.to_string());
        Ok(DepositReceipt { status: 202, hal_id: Some(format!("hal-{:08}", deposits.len())) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_kind_paths() {
        assert_eq!(RefKind::Structure.path(), "structure");
        assert_eq!(RefKind::Journal.path(), "journal");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("10.1/abc"), "\"10.1/abc\"");
        assert_eq!(quote("a \"b\""), "\"a \\\"b\\\"\"");
    }

    #[test]
    fn test_free_text_strips_syntax() {
        assert_eq!(free_text("R&D (Paris): lab"), "(R D Paris lab)");
        assert_eq!(free_text("Foo &amp; Bar"), "(Foo Bar)");
    }

    #[tokio::test]
    async fn test_in_memory_lookup_and_deposit() {
        let repo = InMemoryRepository::new().with_reference(
            RefKind::Journal,
            "issn_s",
            "\"0951-8320\"",
            vec![RefDoc { docid: "12".into(), label: "RESS".into(), valid: None }],
        );

        let hits = repo.reference(RefKind::Journal, "issn_s", "\"0951-8320\"").await.unwrap();
        assert_eq!(hits.num_found, 1);
        assert!(repo.search("doiId_id", "\"x\"").await.unwrap().is_empty());

        let receipt = repo.deposit("<TEI/>").await.unwrap();
        assert_eq!(receipt.hal_id.as_deref(), Some("hal-00000001"));
        assert_eq!(repo.deposits().len(), 1);
        assert_eq!(repo.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_kind_fails() {
        let repo = InMemoryRepository::new().with_unavailable(RefKind::Structure);
        assert!(repo.reference(RefKind::Structure, "text", "(x)").await.is_err());
        assert!(repo.reference(RefKind::Journal, "issn_s", "x").await.is_ok());
    }
}
