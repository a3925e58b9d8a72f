//! Identity linking: affiliations to HAL structures.
//!
//! Each affiliation of an author without curated structure ids resolves to an
//! existing HAL structure or, on a miss, to a placeholder declared inline in
//! the notice. Placeholders live in a per-document arena: the first
//! occurrence of an affiliation string mints one, later identical strings
//! reuse it.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::defaults;
use crate::error::ClientResult;
use crate::models::{Affiliation, AffiliationLink, AuthorEntry, PlaceholderId};
use crate::repository::{RefKind, Repository, free_text};

static STRUCTURE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.*?)\s*;\s*id#(?P<id>\d+)\s*$").expect("valid suffix pattern")
});

/// Organization declared inline in one notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOrg {
    /// Placeholder id referenced by authors.
    pub id: PlaceholderId,

    /// Affiliation as first seen in the document.
    pub affiliation: Affiliation,
}

/// Authors with resolved affiliations plus the organizations to declare.
#[derive(Debug, Clone, Default)]
pub struct LinkedAuthors {
    /// Authors in source order.
    pub authors: Vec<AuthorEntry>,

    /// Inline organizations, in placeholder order.
    pub local_orgs: Vec<LocalOrg>,
}

/// Placeholder ids for one document.
#[derive(Debug, Default)]
struct PlaceholderArena {
    orgs: Vec<LocalOrg>,
    by_name: HashMap<String, PlaceholderId>,
}

impl PlaceholderArena {
    fn get_or_mint(&mut self, affiliation: &Affiliation) -> PlaceholderId {
        if let Some(id) = self.by_name.get(&affiliation.name) {
            return *id;
        }

        let id = PlaceholderId(u32::try_from(self.orgs.len()).unwrap_or(u32::MAX).saturating_add(1));
        let mut declared = affiliation.clone();
        declared.link = None;
        self.orgs.push(LocalOrg { id, affiliation: declared });
        self.by_name.insert(affiliation.name.clone(), id);
        id
    }
}

/// Split a `name; id#NNN` affiliation into its name and structure id.
#[must_use]
pub fn split_structure_suffix(raw: &str) -> (&str, Option<&str>) {
    STRUCTURE_SUFFIX.captures(raw).map_or((raw, None), |caps| {
        let name = caps.name("name").map_or(raw, |m| m.as_str());
        (name, caps.name("id").map(|m| m.as_str()))
    })
}

/// Links authors' affiliations for one document at a time.
#[derive(Debug, Clone, Copy)]
pub struct IdentityLinker {
    create_local_structures: bool,
}

impl IdentityLinker {
    /// Create a linker; without local structures unmatched affiliations stay unlinked.
    #[must_use]
    pub const fn new(create_local_structures: bool) -> Self {
        Self { create_local_structures }
    }

    /// Resolve every affiliation of one document's authors.
    ///
    /// # Errors
    ///
    /// Returns error if a structure lookup fails.
    pub async fn link<R>(&self, mut authors: Vec<AuthorEntry>, repo: &R) -> ClientResult<LinkedAuthors>
    where
        R: Repository + ?Sized,
    {
        let mut arena = PlaceholderArena::default();
        let mut resolved: HashMap<String, Option<AffiliationLink>> = HashMap::new();

        for author in &mut authors {
            if author.has_curated_structures() {
                continue;
            }

            for affiliation in &mut author.affiliations {
                let (name, direct_id) = split_structure_suffix(&affiliation.name);
                if let Some(id) = direct_id {
                    let (name, id) = (name.to_string(), id.to_string());
                    affiliation.name = name;
                    affiliation.link = Some(AffiliationLink::Structure(id));
                    continue;
                }
                if affiliation.name.trim().is_empty() {
                    continue;
                }

                let remote = match resolved.get(&affiliation.name) {
                    Some(link) => link.clone(),
                    None => {
                        let link = lookup_structure(&affiliation.name, repo)
                            .await?
                            .map(AffiliationLink::Structure);
                        resolved.insert(affiliation.name.clone(), link.clone());
                        link
                    }
                };

                affiliation.link = match remote {
                    Some(link) => Some(link),
                    None if self.create_local_structures => {
                        Some(AffiliationLink::Local(arena.get_or_mint(affiliation)))
                    }
                    None => {
                        tracing::warn!(affiliation = %affiliation.name, "Structure not found in HAL");
                        None
                    }
                };
            }
        }

        Ok(LinkedAuthors { authors, local_orgs: arena.orgs })
    }
}

/// Curated structure whose canonical label equals `name`, ignoring case.
///
/// `OLD` and `INCOMING` entries are never linked.
async fn lookup_structure<R>(name: &str, repo: &R) -> ClientResult<Option<String>>
where
    R: Repository + ?Sized,
{
    let hits = repo.reference(RefKind::Structure, "text", &free_text(name)).await?;
    let wanted = name.trim().to_lowercase();

    let found = hits.docs.into_iter().find(|doc| {
        doc.has_status(defaults::VALID_STATUS) && doc.label.trim().to_lowercase() == wanted
    });
    match &found {
        Some(doc) => tracing::debug!(affiliation = %name, docid = %doc.docid, "Structure linked"),
        None => tracing::debug!(affiliation = %name, candidates = hits.num_found, "No exact structure match"),
    }
    Ok(found.map(|doc| doc.docid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RefDoc;
    use crate::repository::InMemoryRepository;

    fn author(surname: &str, affiliations: &[&str]) -> AuthorEntry {
        AuthorEntry {
            affiliations: affiliations.iter().map(|a| Affiliation::named(*a)).collect(),
            ..AuthorEntry::new(surname, "A.")
        }
    }

    fn structure(docid: &str, label: &str) -> RefDoc {
        RefDoc { docid: docid.into(), label: label.into(), valid: Some("VALID".into()) }
    }

    #[test]
    fn test_split_structure_suffix() {
        assert_eq!(split_structure_suffix("LGI; id#1040113"), ("LGI", Some("1040113")));
        assert_eq!(split_structure_suffix("LGI, CentraleSupélec"), ("LGI, CentraleSupélec", None));
    }

    #[tokio::test]
    async fn test_exact_label_match_ignores_case() {
        let repo = InMemoryRepository::new().with_reference(
            RefKind::Structure,
            "text",
            "(centralesupélec)",
            vec![structure("1", "CentraleSupélec Paris"), structure("1040113", "CentraleSupélec")],
        );

        let linked = IdentityLinker::new(true)
            .link(vec![author("Smith", &["centralesupélec"])], &repo)
            .await
            .unwrap();

        assert_eq!(
            linked.authors[0].affiliations[0].link,
            Some(AffiliationLink::Structure("1040113".into()))
        );
        assert!(linked.local_orgs.is_empty());
    }

    #[tokio::test]
    async fn test_uncurated_structure_is_not_linked() {
        let old = RefDoc { docid: "77".into(), label: "Lab Z".into(), valid: Some("OLD".into()) };
        let incoming = RefDoc { docid: "78".into(), label: "Lab Z".into(), valid: Some("INCOMING".into()) };
        let repo = InMemoryRepository::new().with_reference(
            RefKind::Structure,
            "text",
            "(Lab Z)",
            vec![old, incoming],
        );

        let linked = IdentityLinker::new(true).link(vec![author("Smith", &["Lab Z"])], &repo).await.unwrap();

        assert_eq!(
            linked.authors[0].affiliations[0].link,
            Some(AffiliationLink::Local(PlaceholderId(1)))
        );
        assert_eq!(linked.local_orgs.len(), 1);
    }

    #[tokio::test]
    async fn test_identical_misses_share_placeholder() {
        let repo = InMemoryRepository::new();
        let authors = vec![
            author("Smith", &["Lab A, Univ X"]),
            author("Durand", &["Lab A, Univ X", "Lab B"]),
        ];

        let linked = IdentityLinker::new(true).link(authors, &repo).await.unwrap();

        let first = linked.authors[0].affiliations[0].link.clone();
        let second = linked.authors[1].affiliations[0].link.clone();
        let third = linked.authors[1].affiliations[1].link.clone();

        assert_eq!(first, Some(AffiliationLink::Local(PlaceholderId(1))));
        assert_eq!(first, second);
        assert_eq!(third, Some(AffiliationLink::Local(PlaceholderId(2))));
        assert_eq!(linked.local_orgs.len(), 2);
        assert_eq!(linked.local_orgs[0].affiliation.name, "Lab A, Univ X");
        // Identical strings are looked up once per document.
        assert_eq!(repo.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_curated_and_suffixed_affiliations_skip_lookup() {
        let repo = InMemoryRepository::new();
        let mut curated = author("Smith", &["Lab A"]);
        curated.structure_ids = vec!["200".into()];

        let linked = IdentityLinker::new(true)
            .link(vec![curated, author("Durand", &["Lab C; id#300"])], &repo)
            .await
            .unwrap();

        assert!(linked.authors[0].affiliations[0].link.is_none());
        assert_eq!(linked.authors[1].affiliations[0].name, "Lab C");
        assert_eq!(
            linked.authors[1].affiliations[0].link,
            Some(AffiliationLink::Structure("300".into()))
        );
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_local_structures_disabled() {
        let linked = IdentityLinker::new(false)
            .link(vec![author("Smith", &["Nowhere Lab"])], &InMemoryRepository::new())
            .await
            .unwrap();

        assert!(linked.authors[0].affiliations[0].link.is_none());
        assert!(linked.local_orgs.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let repo = InMemoryRepository::new().with_unavailable(RefKind::Structure);
        let result = IdentityLinker::new(true).link(vec![author("Smith", &["Lab"])], &repo).await;
        assert!(result.is_err());
    }
}
