//! Configuration for the Scopus to HAL depositor.

use std::path::PathBuf;
use std::time::Duration;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Search endpoint (documents already deposited).
    pub const SEARCH_URL: &str = "https://api.archives-ouvertes.fr/search";

    /// Referential endpoint (structures, journals, authors).
    pub const REF_URL: &str = "https://api.archives-ouvertes.fr/ref";

    /// SWORD ingestion endpoint.
    pub const SWORD_URL: &str = "https://api.archives-ouvertes.fr/sword/hal";

    /// SWORD packaging format for TEI notices.
    pub const SWORD_PACKAGING: &str = "http://purl.org/net/sword-types/AOfr";

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Delay between read requests (HAL asks clients to stay polite).
    pub const RATE_LIMIT_DELAY: Duration = Duration::from_millis(100);

    /// Cache TTL for referential lookups (one batch run).
    pub const CACHE_TTL: Duration = Duration::from_secs(3600);

    /// Maximum cache size.
    pub const CACHE_MAX_SIZE: u64 = 5000;

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 4;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);

    /// Maximum rows requested from the referential per lookup.
    pub const REF_ROWS: u32 = 100;
}

/// Field lists requested from HAL.
pub mod fields {
    /// Fields returned by document searches.
    pub const SEARCH: &[&str] = &["uri_s", "title_s"];

    /// Fields returned by referential lookups.
    pub const REF: &[&str] = &["docid", "label_s", "valid_s"];

    /// Facet used to infer a subject domain from a journal.
    pub const DOMAIN_FACET: &str = "domainAllCode_s";
}

/// Defaults for record normalization and duplicate detection.
pub mod defaults {
    /// Subject domain used when no journal-derived domain is available.
    pub const DOMAIN: &str = "spi";

    /// Language code for unmapped or missing languages.
    pub const LANGUAGE: &str = "und";

    /// A journal needs at least this many deposits before its dominant domain is trusted.
    pub const DOMAIN_MIN_RECORDS: u64 = 10;

    /// Title AND-queries with more hits than this are re-checked with a phrase query.
    pub const TITLE_PHRASE_CUTOFF: u64 = 3;

    /// Referential status marking a curated journal or structure.
    pub const VALID_STATUS: &str = "VALID";
}

/// HAL account used for SWORD deposits.
#[derive(Clone)]
pub struct Credentials {
    /// HAL login.
    pub username: String,

    /// HAL password.
    pub password: String,
}

impl Credentials {
    /// Build credentials, rejecting blank values.
    ///
    /// # Errors
    ///
    /// Returns error if either value is empty.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> anyhow::Result<Self> {
        let username = username.into();
        let password = password.into();
        anyhow::ensure!(!username.trim().is_empty(), "HAL username is empty");
        anyhow::ensure!(!password.is_empty(), "HAL password is empty");
        Ok(Self { username, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("username", &self.username).finish()
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SWORD credentials (required only when uploading).
    pub credentials: Option<Credentials>,

    /// Base URL for document search (for testing with mock servers).
    pub search_url: String,

    /// Base URL for referential lookups (for testing with mock servers).
    pub ref_url: String,

    /// SWORD deposit URL (for testing with mock servers).
    pub sword_url: String,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Delay before each read request.
    pub rate_limit_delay: Duration,

    /// Maximum retries for transient read failures. Zero disables retrying.
    pub max_retries: u32,

    /// Cache TTL.
    pub cache_ttl: Duration,

    /// Maximum cache size.
    pub cache_max_size: u64,
}

impl Config {
    /// Create a new configuration against the public HAL API.
    #[must_use]
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials,
            search_url: api::SEARCH_URL.to_string(),
            ref_url: api::REF_URL.to_string(),
            sword_url: api::SWORD_URL.to_string(),
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            rate_limit_delay: api::RATE_LIMIT_DELAY,
            max_retries: 0,
            cache_ttl: api::CACHE_TTL,
            cache_max_size: api::CACHE_MAX_SIZE,
        }
    }

    /// Create a test configuration with custom URLs for mock servers.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            credentials: Some(Credentials {
                username: "tester".to_string(),
                password: "secret".to_string(),
            }),
            search_url: format!("{}/search", base_url),
            ref_url: format!("{}/ref", base_url),
            sword_url: format!("{}/sword/hal", base_url),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            rate_limit_delay: Duration::from_millis(0), // No delay in tests
            max_retries: 0,
            cache_ttl: Duration::from_secs(0), // No caching in tests
            cache_max_size: 0,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Credentials are read from `HAL_USERNAME` / `HAL_PASSWORD`; both must be set
    /// for deposits to be possible.
    ///
    /// # Errors
    ///
    /// Returns error if a credential variable is present but blank.
    pub fn from_env() -> anyhow::Result<Self> {
        let credentials = match (std::env::var("HAL_USERNAME").ok(), std::env::var("HAL_PASSWORD").ok())
        {
            (Some(user), Some(password)) => Some(Credentials::new(user, password)?),
            _ => None,
        };
        Ok(Self::new(credentials))
    }

    /// Check if deposit credentials are configured.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Behaviour of one batch run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Collection stamps attached to every notice.
    pub stamps: Vec<String>,

    /// Directory receiving `TEI/<eid>.xml`; `None` keeps notices in memory only.
    pub output_dir: Option<PathBuf>,

    /// Send notices to the SWORD endpoint.
    pub upload: bool,

    /// Query HAL for existing copies before building.
    pub check_duplicates: bool,

    /// Declare unmatched affiliations inline as local structures.
    pub create_local_structures: bool,

    /// Subject domain used when none can be inferred.
    pub default_domain: String,

    /// Minimum deposits in a journal before trusting its dominant domain.
    pub domain_min_records: u64,

    /// Title AND-query hit count above which the phrase query decides.
    pub title_phrase_cutoff: u64,
}

impl PipelineSettings {
    /// Validate run-scoped settings before the first record is touched.
    ///
    /// # Errors
    ///
    /// Returns error if a stamp is blank.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(blank) = self.stamps.iter().position(|s| s.trim().is_empty()) {
            anyhow::bail!("stamp #{} is empty", blank + 1);
        }
        Ok(())
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stamps: Vec::new(),
            output_dir: None,
            upload: true,
            check_duplicates: true,
            create_local_structures: true,
            default_domain: defaults::DOMAIN.to_string(),
            domain_min_records: defaults::DOMAIN_MIN_RECORDS,
            title_phrase_cutoff: defaults::TITLE_PHRASE_CUTOFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(!config.has_credentials());
        assert_eq!(config.sword_url, api::SWORD_URL);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_credentials_reject_blank() {
        assert!(Credentials::new("", "pw").is_err());
        assert!(Credentials::new("user", "").is_err());
        assert!(Credentials::new("user", "pw").is_ok());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("alice", "hunter2").unwrap();
        let shown = format!("{creds:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_settings_reject_blank_stamp() {
        let settings = PipelineSettings {
            stamps: vec!["LGI-SR".to_string(), "  ".to_string()],
            ..PipelineSettings::default()
        };
        assert!(settings.validate().is_err());
        assert!(PipelineSettings::default().validate().is_ok());
    }
}
