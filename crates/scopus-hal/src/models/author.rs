//! Author entries and their affiliations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an organization declared inline in one notice.
///
/// Scoped to a single document; rendered as `localStruct-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceholderId(pub u32);

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "localStruct-{}", self.0)
    }
}

/// Resolution of one affiliation string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffiliationLink {
    /// Existing HAL structure (`docid`).
    Structure(String),

    /// Organization declared inline in the current notice.
    Local(PlaceholderId),
}

impl AffiliationLink {
    /// Value of the `ref` attribute pointing at this structure.
    #[must_use]
    pub fn reference(&self) -> String {
        match self {
            Self::Structure(id) => format!("#struct-{id}"),
            Self::Local(id) => format!("#{id}"),
        }
    }
}

/// One affiliation of an author as given by the source.
///
/// Name, country, city, address and postcode travel together, so they can
/// never fall out of alignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affiliation {
    /// Organization text (e.g. "Laboratoire Génie Industriel, CentraleSupélec").
    pub name: String,

    /// Country name.
    #[serde(default)]
    pub country: Option<String>,

    /// City.
    #[serde(default)]
    pub city: Option<String>,

    /// Street address.
    #[serde(default)]
    pub address: Option<String>,

    /// Postal code.
    #[serde(default)]
    pub postcode: Option<String>,

    /// Resolution filled in by the identity linker.
    #[serde(skip)]
    pub link: Option<AffiliationLink>,
}

impl Affiliation {
    /// Affiliation with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Single-line postal address, when any part is known.
    #[must_use]
    pub fn address_line(&self) -> Option<String> {
        let locality = match (self.postcode.as_deref(), self.city.as_deref()) {
            (Some(pc), Some(city)) => Some(format!("{pc} {city}")),
            (None, Some(city)) => Some(city.to_string()),
            (Some(pc), None) => Some(pc.to_string()),
            (None, None) => None,
        };

        let parts: Vec<String> =
            self.address.iter().cloned().chain(locality).filter(|p| !p.is_empty()).collect();

        if parts.is_empty() { None } else { Some(parts.join(", ")) }
    }
}

/// An author of a bibliographic record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorEntry {
    /// Family name.
    pub surname: String,

    /// Initials as indexed by Scopus (e.g. "J." or "J.-P.").
    pub initial: String,

    /// Full given name, when known.
    #[serde(default)]
    pub forename: Option<String>,

    /// Scopus author id.
    #[serde(default)]
    pub scopus_id: Option<String>,

    /// Affiliations in source order.
    #[serde(default)]
    pub affiliations: Vec<Affiliation>,

    /// ORCID iD.
    #[serde(default)]
    pub orcid: Option<String>,

    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,

    /// Corresponding author flag.
    #[serde(default)]
    pub corresponding: bool,

    /// HAL structure ids taken from the curated alias table.
    #[serde(default)]
    pub structure_ids: Vec<String>,

    /// HAL person identifier (idHAL).
    #[serde(default)]
    pub hal_id: Option<String>,
}

impl AuthorEntry {
    /// Create an author from surname and initials.
    #[must_use]
    pub fn new(surname: impl Into<String>, initial: impl Into<String>) -> Self {
        Self { surname: surname.into(), initial: initial.into(), ..Self::default() }
    }

    /// Alias-table key: `Surname I.`
    #[must_use]
    pub fn key(&self) -> String {
        format!("{} {}", self.surname, self.initial)
    }

    /// Given name for display, falling back to the initials.
    #[must_use]
    pub fn display_forename(&self) -> &str {
        match self.forename.as_deref() {
            Some(f) if !f.trim().is_empty() => f,
            _ => &self.initial,
        }
    }

    /// Whether the curated alias table already fixed this author's structures.
    #[must_use]
    pub fn has_curated_structures(&self) -> bool {
        !self.structure_ids.is_empty()
    }
}
