//! Scopus "Export to CSV" reader.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::models::{
    Affiliation, AuthorEntry, BibliographicRecord, ConferenceInfo, FundingEntry, non_blank,
};

/// Column names of the Scopus export.
mod column {
    pub const AUTHORS: &str = "Authors";
    pub const FULL_NAMES: &str = "Author full names";
    pub const AUTHOR_IDS: &str = "Author(s) ID";
    pub const WITH_AFFILIATIONS: &str = "Authors with affiliations";
    pub const CORRESPONDENCE: &str = "Correspondence Address";
    pub const TITLE: &str = "Title";
    pub const YEAR: &str = "Year";
    pub const SOURCE_TITLE: &str = "Source title";
    pub const VOLUME: &str = "Volume";
    pub const ISSUE: &str = "Issue";
    pub const PAGE_START: &str = "Page start";
    pub const PAGE_END: &str = "Page end";
    pub const ARTICLE_NUMBER: &str = "Art. No.";
    pub const DOI: &str = "DOI";
    pub const ABSTRACT: &str = "Abstract";
    pub const KEYWORDS: &str = "Author Keywords";
    pub const FUNDING_DETAILS: &str = "Funding Details";
    pub const FUNDING_TEXT_PREFIX: &str = "Funding Text";
    pub const EDITORS: &str = "Editors";
    pub const PUBLISHER: &str = "Publisher";
    pub const ISSN: &str = "ISSN";
    pub const ISBN: &str = "ISBN";
    pub const PUBMED: &str = "PubMed ID";
    pub const LANGUAGE: &str = "Language of Original Document";
    pub const DOCUMENT_TYPE: &str = "Document Type";
    pub const CONFERENCE_NAME: &str = "Conference name";
    pub const CONFERENCE_DATE: &str = "Conference date";
    pub const CONFERENCE_LOCATION: &str = "Conference location";
    pub const EID: &str = "EID";
}

/// Streams [`BibliographicRecord`]s out of a Scopus CSV export.
pub struct ScopusCsvSource<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
}

impl ScopusCsvSource<File> {
    /// Open an export file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or has no header row.
    pub fn from_path(path: &Path) -> SourceResult<Self> {
        let file = File::open(path).map_err(|e| SourceError::io(path.display().to_string(), e))?;
        Self::from_reader(file)
    }
}

impl<R: Read> ScopusCsvSource<R> {
    /// Wrap any reader positioned at the header row.
    ///
    /// # Errors
    ///
    /// Returns error if the header row cannot be read.
    pub fn from_reader(inner: R) -> SourceResult<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(inner);
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        Ok(Self { reader, headers })
    }
}

impl<R: Read> Iterator for ScopusCsvSource<R> {
    type Item = SourceResult<BibliographicRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut row = csv::StringRecord::new();
        match self.reader.read_record(&mut row) {
            Ok(false) => None,
            Ok(true) => {
                let fields: HashMap<&str, &str> =
                    self.headers.iter().map(String::as_str).zip(row.iter()).collect();
                Some(Ok(Row(fields).into_record()))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

impl<R: Read> std::fmt::Debug for ScopusCsvSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopusCsvSource").field("columns", &self.headers.len()).finish()
    }
}

/// One export row keyed by column name.
struct Row<'a>(HashMap<&'a str, &'a str>);

impl Row<'_> {
    fn get(&self, column: &str) -> Option<&str> {
        non_blank(self.0.get(column).copied())
    }

    fn owned(&self, column: &str) -> Option<String> {
        self.get(column).map(ToString::to_string)
    }

    fn list(&self, column: &str) -> Vec<String> {
        self.get(column).map(split_list).unwrap_or_default()
    }

    fn into_record(self) -> BibliographicRecord {
        let conference = ConferenceInfo {
            name: self.owned(column::CONFERENCE_NAME),
            date: self.owned(column::CONFERENCE_DATE),
            location: self.owned(column::CONFERENCE_LOCATION),
        };

        BibliographicRecord {
            eid: self.owned(column::EID).unwrap_or_default(),
            doi: self.owned(column::DOI),
            pubmed_id: self.owned(column::PUBMED),
            document_type: self.owned(column::DOCUMENT_TYPE).unwrap_or_default(),
            title: self.owned(column::TITLE).unwrap_or_default(),
            source_title: self.owned(column::SOURCE_TITLE),
            issue: self.owned(column::ISSUE),
            volume: self.owned(column::VOLUME),
            page_range: self.page_range(),
            publication_date: self.owned(column::YEAR),
            keywords: self.list(column::KEYWORDS),
            authors: self.authors(),
            funding: self.get(column::FUNDING_DETAILS).map(parse_funding).unwrap_or_default(),
            funding_text: self.funding_texts(),
            r#abstract: self.owned(column::ABSTRACT),
            language: self.owned(column::LANGUAGE),
            issn: self.owned(column::ISSN),
            isbn: self.owned(column::ISBN),
            publisher: self.owned(column::PUBLISHER),
            editors: self.owned(column::EDITORS),
            conference: (conference != ConferenceInfo::default()).then_some(conference),
        }
    }

    fn page_range(&self) -> Option<String> {
        match (self.get(column::PAGE_START), self.get(column::PAGE_END)) {
            (Some(start), Some(end)) => Some(format!("{start}-{end}")),
            (Some(start), None) => Some(start.to_string()),
            _ => self.owned(column::ARTICLE_NUMBER),
        }
    }

    /// Every `Funding Text N` / `Funding Texts` column, in header order.
    fn funding_texts(&self) -> Vec<String> {
        let mut columns: Vec<&&str> =
            self.0.keys().filter(|k| k.starts_with(column::FUNDING_TEXT_PREFIX)).collect();
        columns.sort();
        columns.into_iter().filter_map(|c| self.owned(c)).collect()
    }

    fn authors(&self) -> Vec<AuthorEntry> {
        let names = self.get(column::AUTHORS).map(split_authors).unwrap_or_default();
        let full_names = self.list(column::FULL_NAMES);
        let ids = self.list(column::AUTHOR_IDS);
        let affiliations = self.list(column::WITH_AFFILIATIONS);

        let mut authors: Vec<AuthorEntry> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let (surname, initial) = split_name(name);
                let mut author = AuthorEntry::new(surname, initial);
                author.forename = full_names.get(idx).and_then(|f| forename_of(f));
                author.scopus_id = ids.get(idx).cloned();
                if let Some(entry) = affiliations.get(idx) {
                    author.affiliations = affiliation_of(entry, &author).into_iter().collect();
                }
                author
            })
            .collect();

        if let Some(address) = self.get(column::CORRESPONDENCE) {
            mark_corresponding(&mut authors, address);
        }
        authors
    }
}

/// Split a `;`-separated cell.
fn split_list(cell: &str) -> Vec<String> {
    cell.split(';').map(str::trim).filter(|s| !s.is_empty()).map(ToString::to_string).collect()
}

/// Author names are `;`-separated in current exports and `,`-separated in older ones.
fn split_authors(cell: &str) -> Vec<String> {
    if cell.contains(';') {
        split_list(cell)
    } else {
        cell.split(',').map(str::trim).filter(|s| !s.is_empty()).map(ToString::to_string).collect()
    }
}

/// `Van der Berg J.-P.` -> (`Van der Berg`, `J.-P.`)
fn split_name(name: &str) -> (&str, &str) {
    let name = name.trim();
    match name.rsplit_once(' ') {
        Some((surname, initial)) if initial.contains('.') => (surname.trim(), initial),
        _ => (name, ""),
    }
}

/// `Smith, John (57200000000)` -> `John`
fn forename_of(full_name: &str) -> Option<String> {
    let without_id = full_name.split(" (").next().unwrap_or(full_name);
    let (_, forename) = without_id.split_once(',')?;
    non_blank(Some(forename)).map(ToString::to_string)
}

/// Affiliation of one `Authors with affiliations` entry.
///
/// The entry repeats the author name first; the last part is the country
/// and the one before it the city, possibly with a postal code.
fn affiliation_of(entry: &str, author: &AuthorEntry) -> Option<Affiliation> {
    let spaced = format!("{} {}", author.surname, author.initial);
    let comma = format!("{}, {}", author.surname, author.initial);
    let rest = entry
        .strip_prefix(&comma)
        .or_else(|| entry.strip_prefix(&spaced))
        .or_else(|| entry.split_once(", ").map(|(_, rest)| rest))?;

    let parts: Vec<&str> =
        rest.trim_start_matches(',').split(", ").map(str::trim).filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return None;
    }
    if parts.len() < 3 {
        return Some(Affiliation::named(parts.join(", ")));
    }

    let (city, postcode) = split_postcode(parts[parts.len() - 2]);
    Some(Affiliation {
        name: parts[..parts.len() - 2].join(", "),
        country: Some(parts[parts.len() - 1].to_string()),
        city,
        postcode,
        ..Affiliation::default()
    })
}

/// `75005 Paris` / `Paris 75005` -> (`Paris`, `75005`)
fn split_postcode(locality: &str) -> (Option<String>, Option<String>) {
    let (codes, words): (Vec<&str>, Vec<&str>) =
        locality.split_whitespace().partition(|w| w.chars().any(|c| c.is_ascii_digit()));
    let city = (!words.is_empty()).then(|| words.join(" "));
    let postcode = (!codes.is_empty()).then(|| codes.join(" "));
    (city, postcode)
}

/// `Smith J.; Lab A, Paris, France; email: j@x.com`
fn mark_corresponding(authors: &mut [AuthorEntry], address: &str) {
    let mut parts = address.split(';').map(str::trim);
    let Some(name) = parts.next() else {
        return;
    };
    let email = parts
        .find_map(|p| p.strip_prefix("email:"))
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(ToString::to_string);

    let index = authors
        .iter()
        .position(|a| a.key() == name)
        .or_else(|| authors.iter().position(|a| same_person(a, name)));

    if let Some(author) = index.and_then(|i| authors.get_mut(i)) {
        author.corresponding = true;
        if author.email.is_none() {
            author.email = email;
        }
    }
}

/// Lowercase alphanumeric words of a name.
fn name_words(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Surname plus first initial match, whatever the order and punctuation
/// (`Smith J.`, `Smith, J.`, `J. Smith`, `Smith, John`).
fn same_person(author: &AuthorEntry, name: &str) -> bool {
    let surname = name_words(&author.surname);
    let words = name_words(name);
    if surname.is_empty() || words.len() < surname.len() {
        return false;
    }

    let Some(start) = words.windows(surname.len()).position(|w| w == surname.as_slice()) else {
        return false;
    };
    let given = words[..start].iter().chain(&words[start + surname.len()..]).next();

    let initial = author
        .initial
        .chars()
        .chain(author.forename.as_deref().unwrap_or_default().chars())
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_lowercase().collect::<String>());

    match (initial, given) {
        (Some(initial), Some(given)) => given.starts_with(&initial),
        (None, _) => true,
        (Some(_), None) => false,
    }
}

/// `Agence Nationale de la Recherche, ANR: ANR-19-CE10; European Research Council, ERC`
fn parse_funding(cell: &str) -> Vec<FundingEntry> {
    split_list(cell)
        .into_iter()
        .map(|entry| {
            let (funder, grant) = match entry.split_once(':') {
                Some((funder, grant)) => (funder.to_string(), non_blank(Some(grant)).map(ToString::to_string)),
                None => (entry.clone(), None),
            };
            let acronym = funder.rsplit(',').next().unwrap_or(&funder).trim().to_string();
            FundingEntry { acronym, grant }
        })
        .filter(|f| !f.acronym.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\u{feff}Authors,Author full names,Author(s) ID,Title,Year,Source title,Volume,Issue,Page start,Page end,DOI,Authors with affiliations,Abstract,Author Keywords,Funding Details,Funding Texts,Correspondence Address,Publisher,ISSN,ISBN,PubMed ID,Language of Original Document,Document Type,Conference name,Conference date,Conference location,EID
\"Smith J.; Durand P.-A.\",\"Smith, John (57200000000); Durand, Pierre-Alain (57200000001)\",57200000000; 57200000001,Reliability of systems,2023,Proc. ESREL,,,12,20,10.1/abc,\"Smith J., Laboratoire Génie Industriel, CentraleSupélec, 91190 Gif-sur-Yvette, France; Durand P.-A., Lab B, Lyon, France\",We study X. © 2023 Elsevier,maintenance; risk,\"Agence Nationale de la Recherche, ANR: ANR-19-CE10\",Thanks to all.,Smith J.; CentraleSupélec; email: j@x.com,Elsevier,09518320,978-3-16; 978-1-23,,English,Conference paper,ESREL 2023,3 September 2023 through 7 September 2023,\"Southampton, UK\",2-s2.0-1
,,,,,,,,,,,,,,,,,,,,,,Article,,,,
";

    fn records() -> Vec<SourceResult<BibliographicRecord>> {
        ScopusCsvSource::from_reader(EXPORT.as_bytes()).unwrap().collect()
    }

    #[test]
    fn test_record_fields() {
        let records = records();
        let record = records[0].as_ref().unwrap();

        assert_eq!(record.eid, "2-s2.0-1");
        assert_eq!(record.doi(), Some("10.1/abc"));
        assert_eq!(record.document_type, "Conference paper");
        assert_eq!(record.page_range.as_deref(), Some("12-20"));
        assert_eq!(record.keywords, vec!["maintenance", "risk"]);
        assert_eq!(record.issn.as_deref(), Some("09518320"));
        assert_eq!(record.funding_text, vec!["Thanks to all."]);
        assert_eq!(record.funding[0].acronym, "ANR");
        assert_eq!(record.funding[0].grant.as_deref(), Some("ANR-19-CE10"));
        assert_eq!(record.conference.as_ref().unwrap().location.as_deref(), Some("Southampton, UK"));
    }

    #[test]
    fn test_authors_and_affiliations() {
        let records = records();
        let authors = &records[0].as_ref().unwrap().authors;

        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].key(), "Smith J.");
        assert_eq!(authors[0].forename.as_deref(), Some("John"));
        assert_eq!(authors[0].scopus_id.as_deref(), Some("57200000000"));
        assert!(authors[0].corresponding);
        assert_eq!(authors[0].email.as_deref(), Some("j@x.com"));

        let affil = &authors[0].affiliations[0];
        assert_eq!(affil.name, "Laboratoire Génie Industriel, CentraleSupélec");
        assert_eq!(affil.city.as_deref(), Some("Gif-sur-Yvette"));
        assert_eq!(affil.postcode.as_deref(), Some("91190"));
        assert_eq!(affil.country.as_deref(), Some("France"));

        assert_eq!(authors[1].surname, "Durand");
        assert_eq!(authors[1].initial, "P.-A.");
        assert_eq!(authors[1].forename.as_deref(), Some("Pierre-Alain"));
        assert_eq!(authors[1].affiliations[0].name, "Lab B");
        assert!(!authors[1].corresponding);
    }

    #[test]
    fn test_corresponding_author_in_other_name_forms() {
        for address in ["J. Smith; LGI; email: j@x.com", "Smith, John; LGI; email: j@x.com", "SMITH, J.; email: j@x.com"] {
            let mut authors = vec![AuthorEntry::new("Durand", "P.-A."), AuthorEntry::new("Smith", "J.")];
            mark_corresponding(&mut authors, address);

            assert!(!authors[0].corresponding, "{address}");
            assert!(authors[1].corresponding, "{address}");
            assert_eq!(authors[1].email.as_deref(), Some("j@x.com"));
        }
    }

    #[test]
    fn test_corresponding_author_needs_matching_initial() {
        let mut authors = vec![AuthorEntry::new("Smith", "A.")];
        mark_corresponding(&mut authors, "J. Smith; email: j@x.com");
        assert!(!authors[0].corresponding);
        assert!(authors[0].email.is_none());
    }

    #[test]
    fn test_blank_row_is_flagged_not_dropped() {
        let records = records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].as_ref().unwrap().missing_required_field(), Some("eid"));
    }

    #[test]
    fn test_split_helpers() {
        assert_eq!(split_name("Van der Berg J.-P."), ("Van der Berg", "J.-P."));
        assert_eq!(split_name("Plato"), ("Plato", ""));
        assert_eq!(split_postcode("Paris 75005"), (Some("Paris".into()), Some("75005".into())));
        assert_eq!(forename_of("Durand, Pierre (1)").as_deref(), Some("Pierre"));
        assert_eq!(parse_funding("European Research Council, ERC")[0].acronym, "ERC");
    }
}
