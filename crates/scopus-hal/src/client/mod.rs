//! HAL API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff for read calls
//! - A non-retrying path for SWORD deposits (a deposit is never replayed)
//! - Referential response caching for the duration of a batch

mod sword;

use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{Config, Credentials, api, fields};
use crate::error::{ClientError, ClientResult};
use crate::models::{DepositReceipt, HalResponse, Hits, RefDoc, SearchDoc};
use crate::repository::{Depositor, FacetResult, RefKind, Repository};

pub use sword::parse_receipt;

/// HAL search, referential and SWORD client.
#[derive(Clone)]
pub struct HalClient {
    /// HTTP client with retry middleware (reads).
    client: ClientWithMiddleware,

    /// HTTP client without retries (deposits).
    deposit_client: ClientWithMiddleware,

    /// Referential response cache.
    cache: Cache<String, serde_json::Value>,

    /// SWORD credentials.
    credentials: Option<Credentials>,

    /// Search endpoint.
    search_url: String,

    /// Referential endpoint.
    ref_url: String,

    /// SWORD endpoint.
    sword_url: String,

    /// Delay before each read request.
    rate_limit_delay: Duration,
}

impl HalClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("scopus-hal/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(http.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        let deposit_client = ClientBuilder::new(http).build();

        let cache = Cache::builder()
            .max_capacity(config.cache_max_size)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            client,
            deposit_client,
            cache,
            credentials: config.credentials,
            search_url: config.search_url,
            ref_url: config.ref_url,
            sword_url: config.sword_url,
            rate_limit_delay: config.rate_limit_delay,
        })
    }

    /// Check if SWORD credentials are configured.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Search deposited documents with a raw Solr clause.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn search_documents(&self, field: &str, value: &str) -> ClientResult<Hits<SearchDoc>> {
        let params = vec![
            ("q".to_string(), format!("{field}:{value}")),
            ("fl".to_string(), fields::SEARCH.join(",")),
            ("rows".to_string(), api::REF_ROWS.to_string()),
            ("wt".to_string(), "json".to_string()),
        ];

        let response: HalResponse<SearchDoc> = self.get(&self.search_url, &params, false).await?;
        Ok(response.response)
    }

    /// Look up a referential. Responses are cached.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn lookup_reference(
        &self,
        kind: RefKind,
        field: &str,
        value: &str,
    ) -> ClientResult<Hits<RefDoc>> {
        let url = format!("{}/{}", self.ref_url, kind.path());
        let params = vec![
            ("q".to_string(), format!("{field}:{value}")),
            ("fl".to_string(), fields::REF.join(",")),
            ("rows".to_string(), api::REF_ROWS.to_string()),
            ("wt".to_string(), "json".to_string()),
        ];

        let response: HalResponse<RefDoc> = self.get(&url, &params, true).await?;
        Ok(response.response)
    }

    /// Facet counts over documents matching `field:value`.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn facet_counts(
        &self,
        field: &str,
        value: &str,
        facet_field: &str,
    ) -> ClientResult<FacetResult> {
        let params = vec![
            ("q".to_string(), format!("{field}:{value}")),
            ("rows".to_string(), "0".to_string()),
            ("facet".to_string(), "true".to_string()),
            ("facet.field".to_string(), facet_field.to_string()),
            ("facet.sort".to_string(), "count".to_string()),
            ("wt".to_string(), "json".to_string()),
        ];

        let response: HalResponse<serde_json::Value> =
            self.get(&self.search_url, &params, true).await?;

        let values = response.facet_counts.map(|f| f.ranked(facet_field)).unwrap_or_default();
        Ok(FacetResult { num_found: response.response.num_found, values })
    }

    /// Submit one TEI notice to the SWORD endpoint.
    ///
    /// Not retried: a timed-out deposit may still have been accepted.
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing, on transport failure, or if
    /// the endpoint answers anything but 201/202.
    pub async fn submit(&self, tei: &str) -> ClientResult<DepositReceipt> {
        let Some(credentials) = &self.credentials else {
            return Err(ClientError::deposit_rejected(401, "no HAL credentials configured"));
        };

        let response = self
            .deposit_client
            .post(&self.sword_url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header("Packaging", api::SWORD_PACKAGING)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .header(reqwest::header::ACCEPT, "application/xml")
            .body(tei.to_string())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        match status {
            201 | 202 => Ok(DepositReceipt { status, hal_id: parse_receipt(&body) }),
            _ => Err(ClientError::deposit_rejected(status, sword::error_summary(&body))),
        }
    }

    /// Make a GET request.
    async fn get<T>(&self, url: &str, params: &[(String, String)], cached: bool) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let cache_key = self.cache_key("GET", url, params);
        if cached {
            if let Some(value) = self.cache.get(&cache_key).await {
                return serde_json::from_value(value).map_err(ClientError::from);
            }
        }

        // Rate limit
        tokio::time::sleep(self.rate_limit_delay).await;

        tracing::debug!(url = %url, q = params.first().map_or("", |(_, v)| v.as_str()), "HAL request");
        let response = self.client.get(url).query(params).send().await?;

        let response = self.handle_response(response).await?;
        let value: serde_json::Value = response.json().await?;

        if cached {
            self.cache.insert(cache_key, value.clone()).await;
        }

        serde_json::from_value(value).map_err(ClientError::from)
    }

    /// Handle API response status codes.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                Err(ClientError::rate_limited(retry_after))
            }
            404 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::not_found(text))
            }
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::bad_request(text))
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }

    /// Generate cache key.
    fn cache_key(&self, method: &str, url: &str, params: &[(String, String)]) -> String {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(method.as_bytes());
        hasher.update(b"|");
        hasher.update(url.as_bytes());
        hasher.update(b"|");

        for (k, v) in params {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"&");
        }

        format!("{:x}", hasher.finalize())
    }
}

#[async_trait::async_trait]
impl Repository for HalClient {
    async fn search(&self, field: &str, value: &str) -> ClientResult<Hits<SearchDoc>> {
        self.search_documents(field, value).await
    }

    async fn reference(
        &self,
        kind: RefKind,
        field: &str,
        value: &str,
    ) -> ClientResult<Hits<RefDoc>> {
        self.lookup_reference(kind, field, value).await
    }

    async fn facet(&self, field: &str, value: &str, facet_field: &str) -> ClientResult<FacetResult> {
        self.facet_counts(field, value, facet_field).await
    }
}

#[async_trait::async_trait]
impl Depositor for HalClient {
    async fn deposit(&self, tei: &str) -> ClientResult<DepositReceipt> {
        self.submit(tei).await
    }
}

impl std::fmt::Debug for HalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HalClient")
            .field("search_url", &self.search_url)
            .field("has_credentials", &self.has_credentials())
            .finish()
    }
}
