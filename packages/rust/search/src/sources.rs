//! Source discovery: resolve a topic into a bounded, deduplicated URL list.
//!
//! The primary query is biased toward authoritative sites; if it yields too
//! few URLs a broader fallback query tops the list up. Each query goes
//! through [`search_with_retry`], so only rate limits are retried.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};
use url::Url;

use newsdesk_shared::{SourceConfig, Topic, render_template};

use crate::backoff::{RetryPolicy, Sleeper, search_with_retry};
use crate::provider::SearchProvider;

/// Collects candidate source URLs for a topic.
pub struct SourceFetcher {
    config: SourceConfig,
}

impl SourceFetcher {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    /// Run the primary query and, if needed, the fallback query.
    ///
    /// Returns URLs in discovery order, never more than `max_sources` and
    /// never twice the same URL. An empty list means "no sources found" and
    /// is left for the caller to act on.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn fetch_sources(
        &self,
        topic: &Topic,
        provider: &dyn SearchProvider,
        sleeper: &dyn Sleeper,
    ) -> Vec<Url> {
        let policy = RetryPolicy::from(&self.config);
        let mut collected = SourceSet::new(self.config.max_sources);

        let primary = render_template(&self.config.primary_query, &[("topic", topic.as_str())]);
        self.run_query(&primary, provider, sleeper, policy, &mut collected)
            .await;

        if collected.len() < self.config.min_primary_sources && !collected.is_full() {
            let fallback =
                render_template(&self.config.fallback_query, &[("topic", topic.as_str())]);
            info!(
                found = collected.len(),
                min = self.config.min_primary_sources,
                "too few primary sources, running fallback query"
            );
            self.run_query(&fallback, provider, sleeper, policy, &mut collected)
                .await;
        }

        let urls = collected.into_urls();
        info!(count = urls.len(), "source discovery complete");
        urls
    }

    async fn run_query(
        &self,
        query: &str,
        provider: &dyn SearchProvider,
        sleeper: &dyn Sleeper,
        policy: RetryPolicy,
        collected: &mut SourceSet,
    ) {
        match search_with_retry(provider, sleeper, policy, query, self.config.max_sources).await {
            Ok(hits) => {
                for hit in hits {
                    if collected.is_full() {
                        break;
                    }
                    collected.push(&hit.url);
                }
            }
            Err(e) => {
                warn!(query, error = %e, "source query abandoned");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SourceSet
// ---------------------------------------------------------------------------

/// Insertion-ordered, capacity-bounded URL set.
struct SourceSet {
    urls: Vec<Url>,
    seen: HashSet<String>,
    capacity: usize,
}

impl SourceSet {
    fn new(capacity: usize) -> Self {
        Self {
            urls: Vec::new(),
            seen: HashSet::new(),
            capacity,
        }
    }

    fn len(&self) -> usize {
        self.urls.len()
    }

    fn is_full(&self) -> bool {
        self.urls.len() >= self.capacity
    }

    /// Add a URL unless it is invalid, non-http, a duplicate, or over capacity.
    fn push(&mut self, raw: &str) -> bool {
        if self.is_full() {
            return false;
        }

        let Ok(url) = Url::parse(raw.trim()) else {
            debug!(url = raw, "skipping unparsable result URL");
            return false;
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            debug!(%url, "skipping non-http result URL");
            return false;
        }

        if !self.seen.insert(normalize_url(&url)) {
            return false;
        }
        self.urls.push(url);
        true
    }

    fn into_urls(self) -> Vec<Url> {
        self.urls
    }
}

/// Normalize a URL for deduplication (strip fragment and trailing slash).
fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let mut s = normalized.to_string();
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}
