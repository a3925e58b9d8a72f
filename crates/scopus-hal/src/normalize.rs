//! Record normalization.
//!
//! Turns one [`BibliographicRecord`] into a [`CanonicalDocument`] plus the
//! alias-enriched author list. The journal and its subject domain are
//! resolved against the repository here.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::alias::AliasTable;
use crate::config::{PipelineSettings, defaults, fields};
use crate::error::{ClientResult, SourceError, SourceResult};
use crate::models::{
    AbstractText, AuthorEntry, BibliographicRecord, CanonicalDocument, DocType, RefDoc, non_blank,
};
use crate::repository::{RefKind, Repository, quote};

/// Scopus language names and their ISO 639-1 codes.
const BUILTIN_LANGUAGES: &[(&str, &str)] = &[
    ("English", "en"),
    ("French", "fr"),
    ("German", "de"),
    ("Spanish", "es"),
    ("Italian", "it"),
    ("Portuguese", "pt"),
    ("Dutch", "nl"),
    ("Chinese", "zh"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("Russian", "ru"),
    ("Polish", "pl"),
    ("Czech", "cs"),
    ("Turkish", "tr"),
    ("Arabic", "ar"),
    ("Greek", "el"),
    ("Swedish", "sv"),
    ("Norwegian", "no"),
    ("Danish", "da"),
    ("Finnish", "fi"),
    ("Hungarian", "hu"),
    ("Romanian", "ro"),
    ("Ukrainian", "uk"),
    ("Persian", "fa"),
    ("Catalan", "ca"),
    ("Croatian", "hr"),
    ("Serbian", "sr"),
    ("Slovenian", "sl"),
    ("Slovak", "sk"),
    ("Lithuanian", "lt"),
    ("Hebrew", "he"),
];

/// Source language name to repository language code.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    codes: HashMap<String, String>,
}

impl Default for LanguageTable {
    fn default() -> Self {
        let codes = BUILTIN_LANGUAGES
            .iter()
            .map(|(name, code)| (name.to_lowercase(), (*code).to_string()))
            .collect();
        Self { codes }
    }
}

impl LanguageTable {
    /// Built-in table extended (and overridden) by a JSON object `{"English": "en", ...}`.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a JSON string map.
    pub fn with_overrides(mut self, path: &Path) -> SourceResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SourceError::io(path.display().to_string(), e))?;
        let overrides: HashMap<String, String> = serde_json::from_str(&text)?;
        self.codes.extend(overrides.into_iter().map(|(name, code)| (name.to_lowercase(), code)));
        Ok(self)
    }

    /// Code for a raw language field; only the first `;`-separated language counts.
    #[must_use]
    pub fn code(&self, raw: Option<&str>) -> String {
        let Some(first) = non_blank(raw).and_then(|r| r.split(';').map(str::trim).next()) else {
            return defaults::LANGUAGE.to_string();
        };

        match self.codes.get(&first.to_lowercase()) {
            Some(code) => code.clone(),
            None => {
                tracing::warn!(language = %first, "Unmapped language, using {}", defaults::LANGUAGE);
                defaults::LANGUAGE.to_string()
            }
        }
    }
}

/// Canonical document plus alias-enriched authors.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Repository-facing view of the record.
    pub canonical: CanonicalDocument,

    /// Authors in source order.
    pub authors: Vec<AuthorEntry>,
}

/// Derives canonical documents from source records.
#[derive(Debug, Clone)]
pub struct Normalizer {
    aliases: AliasTable,
    languages: LanguageTable,
    stamps: Vec<String>,
    default_domain: String,
    domain_min_records: u64,
}

impl Normalizer {
    /// Create a normalizer for one run.
    #[must_use]
    pub fn new(settings: &PipelineSettings, aliases: AliasTable, languages: LanguageTable) -> Self {
        Self {
            aliases,
            languages,
            stamps: settings.stamps.clone(),
            default_domain: settings.default_domain.clone(),
            domain_min_records: settings.domain_min_records,
        }
    }

    /// Normalize one record whose source type maps to `doc_type`.
    ///
    /// # Errors
    ///
    /// Returns error if the journal lookup fails. A failed domain facet query
    /// only degrades to the default domain.
    pub async fn normalize<R>(
        &self,
        record: &BibliographicRecord,
        doc_type: DocType,
        repo: &R,
    ) -> ClientResult<Normalized>
    where
        R: Repository + ?Sized,
    {

        let issn = record.issn.as_deref().and_then(normalize_issn);
        let journal = match &issn {
            Some(issn) => self.resolve_journal(issn, repo).await?,
            None => None,
        };
        let domain = match &journal {
            Some(journal) => self.resolve_domain(journal, repo).await,
            None => self.default_domain.clone(),
        };

        let meeting_date = if doc_type.is_conference() {
            record
                .conference
                .as_ref()
                .and_then(|c| c.date.as_deref())
                .and_then(conference_start_date)
                .or_else(|| record.year().map(ToString::to_string))
        } else {
            None
        };

        let canonical = CanonicalDocument {
            doc_type,
            funders: funders(record),
            journal_id: journal.map(|j| j.docid),
            issn,
            isbn: record.isbn.as_deref().and_then(first_isbn),
            domain,
            language: self.languages.code(record.language.as_deref()),
            abstract_text: clean_abstract(record.r#abstract.as_deref()),
            stamps: self.stamps.clone(),
            meeting_date,
        };

        let mut authors = record.authors.clone();
        for author in &mut authors {
            for affiliation in &mut author.affiliations {
                affiliation.name = clean_affiliation(&affiliation.name);
            }
        }
        self.aliases.resolve_all(&mut authors);

        Ok(Normalized { canonical, authors })
    }

    /// Journal for an ISSN, when exactly one matches.
    async fn resolve_journal<R>(&self, issn: &str, repo: &R) -> ClientResult<Option<RefDoc>>
    where
        R: Repository + ?Sized,
    {
        let hits = repo.reference(RefKind::Journal, "issn_s", &quote(issn)).await?;
        if hits.num_found == 1 {
            Ok(hits.docs.into_iter().next())
        } else {
            tracing::debug!(issn = %issn, matches = hits.num_found, "Journal not linked");
            Ok(None)
        }
    }

    /// Dominant subject domain among a curated journal's deposits.
    async fn resolve_domain<R>(&self, journal: &RefDoc, repo: &R) -> String
    where
        R: Repository + ?Sized,
    {
        if !journal.has_status(defaults::VALID_STATUS) {
            return self.default_domain.clone();
        }

        match repo.facet("journalId_i", &journal.docid, fields::DOMAIN_FACET).await {
            Ok(facet) if facet.num_found >= self.domain_min_records => {
                facet.top().map_or_else(|| self.default_domain.clone(), ToString::to_string)
            }
            Ok(_) => self.default_domain.clone(),
            Err(e) => {
                tracing::warn!(journal = %journal.docid, error = %e, "Domain facet query failed");
                self.default_domain.clone()
            }
        }
    }
}

/// Normalize an ISSN to `NNNN-NNNN`, left-padding with zeros.
///
/// Returns `None` when the value holds no ISSN digits. Idempotent.
#[must_use]
pub fn normalize_issn(raw: &str) -> Option<String> {
    let first = raw.split([',', ';']).map(str::trim).find(|s| !s.is_empty())?;
    let compact: String = first
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if compact.is_empty() || compact.len() > 8 {
        return None;
    }

    let padded = format!("{compact:0>8}");
    Some(format!("{}-{}", &padded[..4], &padded[4..]))
}

/// First ISBN of a `;`-separated list.
#[must_use]
pub fn first_isbn(raw: &str) -> Option<String> {
    raw.split(';').map(str::trim).find(|s| !s.is_empty()).map(ToString::to_string)
}

/// Clean a source abstract.
///
/// Scopus placeholders ("[No abstract available]") and abstracts that are
/// only a copyright line count as missing; a trailing copyright notice is cut.
#[must_use]
pub fn clean_abstract(raw: Option<&str>) -> AbstractText {
    let Some(text) = non_blank(raw) else {
        return AbstractText::Missing;
    };
    if text.starts_with("[No abstr") || text.starts_with('©') {
        return AbstractText::Missing;
    }

    let body = text.find('©').map_or(text, |idx| &text[..idx]).trim();
    if body.is_empty() { AbstractText::Missing } else { AbstractText::Text(body.to_string()) }
}

/// Funding statements: structured entries, else the free-text acknowledgements.
fn funders(record: &BibliographicRecord) -> Vec<String> {
    let structured: Vec<String> = record
        .funding
        .iter()
        .filter(|f| !f.acronym.trim().is_empty())
        .map(crate::models::FundingEntry::describe)
        .collect();

    if structured.is_empty() {
        record
            .funding_text
            .iter()
            .filter_map(|t| non_blank(Some(t)))
            .map(ToString::to_string)
            .collect()
    } else {
        structured
    }
}

/// Strip trailing separators left over from the source export.
fn clean_affiliation(name: &str) -> String {
    name.trim().trim_end_matches(';').trim().to_string()
}

/// Start date of a conference, as `YYYY-MM-DD`.
///
/// Accepts Scopus ranges ("15 June 2023 through 17 June 2023") and a few
/// single-date layouts; falls back to a bare year.
#[must_use]
pub fn conference_start_date(raw: &str) -> Option<String> {
    const FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y", "%B %d, %Y", "%Y-%m-%d", "%Y/%m/%d"];

    let start = raw.split(" through ").next().unwrap_or(raw).trim();
    if let Some(date) = FORMATS.iter().find_map(|f| NaiveDate::parse_from_str(start, f).ok()) {
        return Some(date.format("%Y-%m-%d").to_string());
    }

    raw.split(|c: char| !c.is_ascii_digit())
        .find(|part| part.len() == 4)
        .map(ToString::to_string)
}
