//! TEI notice builder.
//!
//! [`build`] is a pure function from a normalized, linked record to the
//! AOfr TEI document accepted by the HAL SWORD endpoint:
//!
//! ```text
//! TEI/text/body/listBibl/biblFull
//!   titleStmt        funders
//!   seriesStmt       collection stamps
//!   sourceDesc/biblStruct
//!     analytic       title, authors
//!     monogr         serial idno, host title, meeting, editors, imprint
//!     idno           DOI, PubMed
//!   profileDesc      language, keywords, domain, typology, abstract
//! TEI/text/back/listOrg  organizations declared inline
//! ```

mod writer;

use std::collections::HashSet;

use crate::error::TeiError;
use crate::linker::{LinkedAuthors, LocalOrg};
use crate::models::{
    AuthorEntry, BibliographicRecord, CanonicalDocument, DocType, SerialIdentifier, non_blank,
};

use writer::TeiWriter;

/// TEI namespace.
pub const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";

/// HAL extension namespace.
pub const HAL_NS: &str = "http://hal.archives-ouvertes.fr/";

type Result<T = ()> = std::result::Result<T, TeiError>;

/// Serialize one record as a TEI notice.
///
/// # Errors
///
/// Returns error only if the XML writer fails; every combination of
/// missing optional fields yields a complete document.
pub fn build(
    record: &BibliographicRecord,
    canonical: &CanonicalDocument,
    linked: &LinkedAuthors,
) -> Result<String> {
    let mut w = TeiWriter::new();
    w.declaration()?;
    w.start("TEI", &[("xmlns", TEI_NS), ("xmlns:hal", HAL_NS)])?;
    w.start("text", &[])?;
    w.start("body", &[])?;
    w.start("listBibl", &[])?;
    w.start("biblFull", &[])?;

    write_title_stmt(&mut w, canonical)?;
    write_series_stmt(&mut w, canonical)?;
    write_source_desc(&mut w, record, canonical, &linked.authors)?;
    write_profile_desc(&mut w, record, canonical)?;

    w.end("biblFull")?;
    w.end("listBibl")?;
    w.end("body")?;

    if !linked.local_orgs.is_empty() {
        write_back(&mut w, &linked.local_orgs)?;
    }

    w.end("text")?;
    w.end("TEI")?;
    w.finish()
}

fn write_title_stmt(w: &mut TeiWriter, canonical: &CanonicalDocument) -> Result {
    if canonical.funders.is_empty() {
        return w.empty("titleStmt", &[]);
    }

    w.start("titleStmt", &[])?;
    for funder in &canonical.funders {
        w.text("funder", &[], funder)?;
    }
    w.end("titleStmt")
}

fn write_series_stmt(w: &mut TeiWriter, canonical: &CanonicalDocument) -> Result {
    if canonical.stamps.is_empty() {
        return w.empty("seriesStmt", &[]);
    }

    w.start("seriesStmt", &[])?;
    for stamp in &canonical.stamps {
        w.empty("idno", &[("type", "stamp"), ("n", stamp)])?;
    }
    w.end("seriesStmt")
}

fn write_source_desc(
    w: &mut TeiWriter,
    record: &BibliographicRecord,
    canonical: &CanonicalDocument,
    authors: &[AuthorEntry],
) -> Result {
    w.start("sourceDesc", &[])?;
    w.start("biblStruct", &[])?;

    w.start("analytic", &[])?;
    w.text("title", &[("xml:lang", &canonical.language)], &record.title)?;
    for author in authors {
        write_author(w, author)?;
    }
    w.end("analytic")?;

    write_monogr(w, record, canonical)?;

    w.optional_text("idno", &[("type", "doi")], record.doi())?;
    w.optional_text("idno", &[("type", "pubmed")], record.pubmed_id.as_deref())?;

    w.end("biblStruct")?;
    w.end("sourceDesc")
}

fn write_author(w: &mut TeiWriter, author: &AuthorEntry) -> Result {
    let role = if author.corresponding { "crp" } else { "aut" };
    w.start("author", &[("role", role)])?;

    w.start("persName", &[])?;
    w.text("forename", &[("type", "first")], author.display_forename())?;
    w.text("surname", &[], &author.surname)?;
    w.end("persName")?;

    w.optional_text("email", &[("type", "email")], author.email.as_deref())?;
    w.optional_text("idno", &[("type", "https://orcid.org/")], author.orcid.as_deref())?;
    w.optional_text("idno", &[("type", "idhal")], author.hal_id.as_deref())?;

    for reference in affiliation_refs(author) {
        w.empty("affiliation", &[("ref", &reference)])?;
    }

    w.end("author")
}

/// Affiliation references of one author, without repeats.
///
/// Curated structure ids take precedence over per-affiliation links.
fn affiliation_refs(author: &AuthorEntry) -> Vec<String> {
    let refs: Vec<String> = if author.has_curated_structures() {
        author.structure_ids.iter().map(|id| format!("#struct-{id}")).collect()
    } else {
        author
            .affiliations
            .iter()
            .filter_map(|a| a.link.as_ref().map(crate::models::AffiliationLink::reference))
            .collect()
    };

    let mut seen = HashSet::new();
    refs.into_iter().filter(|r| seen.insert(r.clone())).collect()
}

fn write_monogr(
    w: &mut TeiWriter,
    record: &BibliographicRecord,
    canonical: &CanonicalDocument,
) -> Result {
    let doc_type = canonical.doc_type;
    let source_title = non_blank(record.source_title.as_deref());

    w.start("monogr", &[])?;

    match canonical.serial_identifier() {
        Some(SerialIdentifier::HalJournal(id)) => w.text("idno", &[("type", "halJournalId")], &id)?,
        Some(SerialIdentifier::Issn(issn)) => w.text("idno", &[("type", "issn")], &issn)?,
        Some(SerialIdentifier::Isbn(isbn)) => w.text("idno", &[("type", "isbn")], &isbn)?,
        None => {}
    }

    match doc_type {
        DocType::Article if canonical.journal_id.is_none() => {
            w.optional_text("title", &[("level", "j")], source_title)?;
        }
        DocType::Book | DocType::BookChapter | DocType::Communication => {
            w.optional_text("title", &[("level", "m")], source_title)?;
        }
        DocType::Article => {}
    }

    if doc_type.is_conference() {
        write_meeting(w, record, canonical)?;
    }

    if doc_type.is_book_like() || doc_type.is_conference() {
        for editor in editors(record) {
            w.text("editor", &[], editor)?;
        }
    }

    w.start("imprint", &[])?;
    w.optional_text("publisher", &[], record.publisher.as_deref())?;
    w.optional_text("biblScope", &[("unit", "volume")], record.volume.as_deref())?;
    w.optional_text("biblScope", &[("unit", "issue")], record.issue.as_deref())?;
    w.optional_text("biblScope", &[("unit", "pp")], record.page_range.as_deref())?;
    let published = non_blank(record.publication_date.as_deref()).or_else(|| record.year());
    w.optional_text("date", &[("type", "datePub")], published)?;
    w.end("imprint")?;

    w.end("monogr")
}

fn write_meeting(
    w: &mut TeiWriter,
    record: &BibliographicRecord,
    canonical: &CanonicalDocument,
) -> Result {
    let conference = record.conference.clone().unwrap_or_default();
    let name = non_blank(conference.name.as_deref())
        .or_else(|| non_blank(record.source_title.as_deref()));

    w.start("meeting", &[])?;
    w.optional_text("title", &[], name)?;
    w.optional_text("date", &[("type", "start")], canonical.meeting_date.as_deref())?;
    let (settlement, country) = split_location(conference.location.as_deref());
    w.text("settlement", &[], settlement)?;
    w.empty("country", &[("key", &country)])?;
    w.end("meeting")
}

/// Meeting country used when the location names none that can be mapped.
const DEFAULT_COUNTRY: &str = "fr";

/// Splits `"Southampton, United Kingdom"` into the settlement and an ISO 3166 key.
fn split_location(location: Option<&str>) -> (&str, String) {
    let Some(location) = non_blank(location) else {
        return ("unknown", DEFAULT_COUNTRY.to_string());
    };
    let Some((head, tail)) = location.rsplit_once(',') else {
        return (location, DEFAULT_COUNTRY.to_string());
    };
    let settlement = non_blank(Some(head)).unwrap_or(location);
    let key = country_key(tail).unwrap_or_else(|| {
        tracing::debug!(country = tail.trim(), "Unmapped meeting country");
        DEFAULT_COUNTRY.to_string()
    });
    (settlement, key)
}

fn country_key(name: &str) -> Option<String> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    if name.len() == 2 && name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(if name == "uk" { "gb".into() } else { name });
    }
    let key = match name.as_str() {
        "france" => "fr",
        "united kingdom" | "england" | "scotland" | "wales" | "great britain" => "gb",
        "united states" | "usa" | "u.s.a" | "united states of america" => "us",
        "germany" => "de",
        "italy" => "it",
        "spain" => "es",
        "portugal" => "pt",
        "belgium" => "be",
        "netherlands" | "the netherlands" => "nl",
        "switzerland" => "ch",
        "austria" => "at",
        "sweden" => "se",
        "norway" => "no",
        "denmark" => "dk",
        "finland" => "fi",
        "poland" => "pl",
        "ireland" => "ie",
        "greece" => "gr",
        "czech republic" | "czechia" => "cz",
        "canada" => "ca",
        "mexico" => "mx",
        "brazil" => "br",
        "china" => "cn",
        "japan" => "jp",
        "south korea" | "korea" | "republic of korea" => "kr",
        "india" => "in",
        "singapore" => "sg",
        "australia" => "au",
        "morocco" => "ma",
        "tunisia" => "tn",
        "algeria" => "dz",
        _ => return None,
    };
    Some(key.to_string())
}

fn editors(record: &BibliographicRecord) -> Vec<&str> {
    record
        .editors
        .as_deref()
        .map(|e| e.split(';').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn write_profile_desc(
    w: &mut TeiWriter,
    record: &BibliographicRecord,
    canonical: &CanonicalDocument,
) -> Result {
    let lang = canonical.language.as_str();

    w.start("profileDesc", &[])?;

    w.start("langUsage", &[])?;
    w.empty("language", &[("ident", lang)])?;
    w.end("langUsage")?;

    w.start("textClass", &[])?;
    let keywords: Vec<&str> =
        record.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()).collect();
    if !keywords.is_empty() {
        w.start("keywords", &[("scheme", "author")])?;
        for keyword in keywords {
            w.text("term", &[("xml:lang", lang)], keyword)?;
        }
        w.end("keywords")?;
    }
    w.empty("classCode", &[("scheme", "halDomain"), ("n", &canonical.domain)])?;
    w.empty("classCode", &[("scheme", "halTypology"), ("n", canonical.doc_type.code())])?;
    w.end("textClass")?;

    if !canonical.abstract_text.is_missing() {
        w.text("abstract", &[("xml:lang", lang)], canonical.abstract_text.as_str())?;
    }

    w.end("profileDesc")
}

fn write_back(w: &mut TeiWriter, orgs: &[LocalOrg]) -> Result {
    w.start("back", &[])?;
    w.start("listOrg", &[("type", "structures")])?;

    for org in orgs {
        let id = org.id.to_string();
        w.start("org", &[("type", "institution"), ("xml:id", &id)])?;
        w.text("orgName", &[], &org.affiliation.name)?;

        let address: Vec<String> = org
            .affiliation
            .address_line()
            .into_iter()
            .chain(org.affiliation.country.iter().map(|c| c.trim().to_string()))
            .filter(|p| !p.is_empty())
            .collect();
        if !address.is_empty() {
            w.start("desc", &[])?;
            w.start("address", &[])?;
            w.text("addrLine", &[], &address.join(", "))?;
            w.end("address")?;
            w.end("desc")?;
        }

        w.end("org")?;
    }

    w.end("listOrg")?;
    w.end("back")
}
