//! Normalized, repository-facing view of one paper.

use std::fmt;

/// HAL document typology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocType {
    /// Journal article (`ART`).
    Article,
    /// Conference communication (`COMM`).
    Communication,
    /// Book (`OUV`).
    Book,
    /// Book chapter (`COUV`).
    BookChapter,
}

/// Scopus document-type labels and their HAL counterparts.
const SOURCE_TYPES: &[(&str, DocType)] = &[
    ("article", DocType::Article),
    ("article in press", DocType::Article),
    ("review", DocType::Article),
    ("business article", DocType::Article),
    ("data paper", DocType::Article),
    ("editorial", DocType::Article),
    ("short survey", DocType::Article),
    ("letter", DocType::Article),
    ("note", DocType::Article),
    ("erratum", DocType::Article),
    ("journal", DocType::Article),
    ("conference paper", DocType::Communication),
    ("conference review", DocType::Communication),
    ("conference proceeding", DocType::Communication),
    ("book", DocType::Book),
    ("book series", DocType::Book),
    ("book chapter", DocType::BookChapter),
];

impl DocType {
    /// Map a source document-type label; `None` means the type is unsupported.
    #[must_use]
    pub fn from_source(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        SOURCE_TYPES.iter().find(|(name, _)| *name == label).map(|(_, ty)| *ty)
    }

    /// HAL typology code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Article => "ART",
            Self::Communication => "COMM",
            Self::Book => "OUV",
            Self::BookChapter => "COUV",
        }
    }

    /// Published inside a book (needs a monograph title, ISBN, editors).
    #[must_use]
    pub const fn is_book_like(self) -> bool {
        matches!(self, Self::Book | Self::BookChapter)
    }

    /// Presented at a meeting.
    #[must_use]
    pub const fn is_conference(self) -> bool {
        matches!(self, Self::Communication)
    }

    /// Published in a journal.
    #[must_use]
    pub const fn is_serial(self) -> bool {
        matches!(self, Self::Article)
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Abstract after cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbstractText {
    /// Usable abstract.
    Text(String),
    /// No usable abstract; the notice carries no abstract element.
    Missing,
}

impl AbstractText {
    /// Sentinel value standing for a missing abstract.
    pub const NO_ABSTRACT: &'static str = "[No abstract available]";

    /// Abstract text, or the sentinel when missing.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Missing => Self::NO_ABSTRACT,
        }
    }

    /// Whether the abstract block must be suppressed.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// How the host publication is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialIdentifier {
    /// Journal known to HAL.
    HalJournal(String),
    /// Journal unknown to HAL, identified by ISSN.
    Issn(String),
    /// Book identified by ISBN.
    Isbn(String),
}

/// Normalized record, ready for linking and serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalDocument {
    /// HAL document type.
    pub doc_type: DocType,

    /// Funding statements, one per `<funder>` element.
    pub funders: Vec<String>,

    /// HAL journal id when the ISSN resolved to exactly one journal.
    pub journal_id: Option<String>,

    /// Normalized ISSN (`NNNN-NNNN`).
    pub issn: Option<String>,

    /// First ISBN.
    pub isbn: Option<String>,

    /// HAL subject domain code.
    pub domain: String,

    /// ISO 639-1 language code (or `und`).
    pub language: String,

    /// Cleaned abstract.
    pub abstract_text: AbstractText,

    /// Collection stamps.
    pub stamps: Vec<String>,

    /// Conference start date (`YYYY-MM-DD` or year).
    pub meeting_date: Option<String>,
}

impl CanonicalDocument {
    /// Pick exactly one identifier for the host publication.
    ///
    /// Books prefer their ISBN; other types prefer the HAL journal, then the
    /// ISSN. Communications never carry an ISBN or a bare ISSN.
    #[must_use]
    pub fn serial_identifier(&self) -> Option<SerialIdentifier> {
        let journal = self.journal_id.clone().map(SerialIdentifier::HalJournal);
        let issn = || {
            if self.doc_type.is_conference() {
                None
            } else {
                self.issn.clone().map(SerialIdentifier::Issn)
            }
        };
        let isbn = || {
            if self.doc_type.is_conference() {
                None
            } else {
                self.isbn.clone().map(SerialIdentifier::Isbn)
            }
        };

        if self.doc_type.is_book_like() {
            isbn().or(journal).or_else(issn)
        } else {
            journal.or_else(issn).or_else(isbn)
        }
    }
}
