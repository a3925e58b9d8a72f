//! Data models for source records, normalized documents and HAL responses.
//!
//! Source-side models use `#[serde(default)]` for optional fields and
//! `camelCase` names so pre-fetched records can be fed as JSON.

mod author;
mod canonical;
mod hal;
mod record;
mod report;

pub use author::{AffiliationLink, Affiliation, AuthorEntry, PlaceholderId};
pub use canonical::{AbstractText, CanonicalDocument, DocType, SerialIdentifier};
pub use hal::{DepositReceipt, FacetCounts, HalResponse, Hits, RefDoc, SearchDoc};
pub use record::{BibliographicRecord, ConferenceInfo, FundingEntry, non_blank};
pub use report::{LogRow, RecordState};
