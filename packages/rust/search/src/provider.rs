//! Search-provider contract and the Serper (Google Search) HTTP provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use newsdesk_shared::{NewsdeskError, Result, SearchError, SearchHit};

/// Default timeout in seconds for a search request.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("newsdesk/", env!("CARGO_PKG_VERSION"));

/// Anything that can turn a query into an ordered list of result URLs.
///
/// Implementations must report throttling as [`SearchError::RateLimited`]
/// so callers can retry it; every other failure is a
/// [`SearchError::Provider`] and is not retried.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<Vec<SearchHit>, SearchError>;
}

// ---------------------------------------------------------------------------
// Serper
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, serde::Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
}

/// Connection settings for [`SerperProvider`].
#[derive(Debug, Clone)]
pub struct SerperOptions {
    pub endpoint: String,
    pub api_key: String,
    /// `gl` parameter.
    pub country: String,
    /// `hl` parameter.
    pub language: String,
    pub timeout_secs: u64,
}

impl SerperOptions {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            country: "it".into(),
            language: "it".into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Google results via the Serper JSON API.
pub struct SerperProvider {
    opts: SerperOptions,
    client: Client,
}

impl SerperProvider {
    pub fn new(opts: SerperOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| NewsdeskError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { opts, client })
    }
}

#[async_trait]
impl SearchProvider for SerperProvider {
    #[instrument(skip(self), fields(endpoint = %self.opts.endpoint))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<Vec<SearchHit>, SearchError> {
        let body = serde_json::json!({
            "q": query,
            "num": max_results,
            "gl": self.opts.country,
            "hl": self.opts.language,
        });

        let response = self
            .client
            .post(&self.opts.endpoint)
            .header("X-API-KEY", &self.opts.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited {
                query: query.to_string(),
            });
        }
        if !status.is_success() {
            return Err(SearchError::Provider(format!("HTTP {status}")));
        }

        let data: SerperResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Provider(format!("invalid response body: {e}")))?;

        let hits: Vec<SearchHit> = data
            .organic
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .take(max_results)
            .enumerate()
            .map(|(i, r)| SearchHit {
                url: r.link,
                rank: i as u32 + 1,
            })
            .collect();

        debug!(count = hits.len(), "search complete");
        Ok(hits)
    }
}
