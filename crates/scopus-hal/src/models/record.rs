//! Bibliographic record as read from the literature source.

use serde::{Deserialize, Serialize};

use super::AuthorEntry;

/// Structured funding acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingEntry {
    /// Funder name or acronym.
    pub acronym: String,

    /// Grant number.
    #[serde(default)]
    pub grant: Option<String>,
}

impl FundingEntry {
    /// Text rendered inside a `<funder>` element.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.grant.as_deref() {
            Some(grant) if !grant.is_empty() => {
                format!("Funder: {}, Grant NO: {}", self.acronym, grant)
            }
            _ => self.acronym.clone(),
        }
    }
}

/// Conference metadata for proceedings papers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceInfo {
    /// Conference name.
    #[serde(default)]
    pub name: Option<String>,

    /// Raw date string as given by the source.
    #[serde(default)]
    pub date: Option<String>,

    /// Location (city, country).
    #[serde(default)]
    pub location: Option<String>,
}

/// One paper from the literature source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BibliographicRecord {
    /// Scopus EID (e.g. "2-s2.0-85178664213").
    #[serde(default)]
    pub eid: String,

    /// Digital Object Identifier.
    #[serde(default)]
    pub doi: Option<String>,

    /// PubMed identifier.
    #[serde(default)]
    pub pubmed_id: Option<String>,

    /// Document type in the source vocabulary (e.g. "Conference paper").
    #[serde(default)]
    pub document_type: String,

    /// Paper title.
    #[serde(default)]
    pub title: String,

    /// Journal, book or proceedings title.
    #[serde(default)]
    pub source_title: Option<String>,

    /// Issue number.
    #[serde(default)]
    pub issue: Option<String>,

    /// Volume.
    #[serde(default)]
    pub volume: Option<String>,

    /// Page range ("12-25").
    #[serde(default)]
    pub page_range: Option<String>,

    /// Publication date or year.
    #[serde(default)]
    pub publication_date: Option<String>,

    /// Author keywords in source order.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Authors in source order.
    #[serde(default)]
    pub authors: Vec<AuthorEntry>,

    /// Structured funding.
    #[serde(default)]
    pub funding: Vec<FundingEntry>,

    /// Free-text funding acknowledgements.
    #[serde(default)]
    pub funding_text: Vec<String>,

    /// Abstract text.
    #[serde(default)]
    pub r#abstract: Option<String>,

    /// Language of the original document (e.g. "English; French").
    #[serde(default)]
    pub language: Option<String>,

    /// ISSN as given by the source (may lack hyphen and leading zeros).
    #[serde(default)]
    pub issn: Option<String>,

    /// ISBN(s), `;`-separated when several.
    #[serde(default)]
    pub isbn: Option<String>,

    /// Publisher.
    #[serde(default)]
    pub publisher: Option<String>,

    /// Editors as a display string.
    #[serde(default)]
    pub editors: Option<String>,

    /// Conference metadata.
    #[serde(default)]
    pub conference: Option<ConferenceInfo>,
}

impl BibliographicRecord {
    /// DOI if present and non-blank.
    #[must_use]
    pub fn doi(&self) -> Option<&str> {
        non_blank(self.doi.as_deref())
    }

    /// Four-digit publication year, if one can be found in the date.
    #[must_use]
    pub fn year(&self) -> Option<&str> {
        let date = self.publication_date.as_deref()?;
        date.split(|c: char| !c.is_ascii_digit()).find(|part| part.len() == 4)
    }

    /// Name of the first missing mandatory field, if any.
    #[must_use]
    pub fn missing_required_field(&self) -> Option<&'static str> {
        if self.eid.trim().is_empty() {
            Some("eid")
        } else if self.title.trim().is_empty() {
            Some("title")
        } else {
            None
        }
    }

    /// Emails of the corresponding authors.
    #[must_use]
    pub fn corresponding_emails(&self) -> Vec<&str> {
        self.authors
            .iter()
            .filter(|a| a.corresponding)
            .filter_map(|a| non_blank(a.email.as_deref()))
            .collect()
    }
}

/// Treat empty and whitespace-only strings as absent.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_minimal_json() {
        let json = r#"{"eid": "2-s2.0-1", "documentType": "Article", "title": "T"}"#;
        let record: BibliographicRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.eid, "2-s2.0-1");
        assert!(record.doi().is_none());
        assert!(record.authors.is_empty());
        assert!(record.missing_required_field().is_none());
    }

    #[test]
    fn test_year_extraction() {
        let mut record = BibliographicRecord::default();
        record.publication_date = Some("2023-05-01".to_string());
        assert_eq!(record.year(), Some("2023"));

        record.publication_date = Some("2021".to_string());
        assert_eq!(record.year(), Some("2021"));

        record.publication_date = None;
        assert_eq!(record.year(), None);
    }

    #[test]
    fn test_blank_doi_is_absent() {
        let record = BibliographicRecord { doi: Some("  ".to_string()), ..Default::default() };
        assert!(record.doi().is_none());
    }

    #[test]
    fn test_funding_describe() {
        let with_grant = FundingEntry { acronym: "ANR".into(), grant: Some("ANR-19-CE10".into()) };
        assert_eq!(with_grant.describe(), "Funder: ANR, Grant NO: ANR-19-CE10");

        let bare = FundingEntry { acronym: "ERC".into(), grant: None };
        assert_eq!(bare.describe(), "ERC");
    }

    #[test]
    fn test_missing_title_reported() {
        let record = BibliographicRecord { eid: "x".into(), ..Default::default() };
        assert_eq!(record.missing_required_field(), Some("title"));
    }
}
