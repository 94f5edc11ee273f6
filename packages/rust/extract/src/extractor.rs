//! Per-URL evidence extraction.
//!
//! URLs are processed one at a time, in discovery order. Every URL ends up
//! as exactly one [`SourceRecord`]; a timeout or transport failure on one
//! URL is logged and recorded, never propagated to the batch.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use url::Url;

use newsdesk_markdown::html_to_text;
use newsdesk_shared::{ExtractConfig, FetchError, SourceRecord, SourceStatus};

use crate::http::PageFetcher;

/// Result of extracting a batch of URLs.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// One record per input URL, same order.
    pub records: Vec<SourceRecord>,
    /// Usable records joined with `source:` marker lines. Empty means no content.
    pub aggregated: String,
    pub duration: Duration,
}

impl ExtractionReport {
    pub fn usable_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_usable()).count()
    }

    pub fn has_content(&self) -> bool {
        !self.aggregated.trim().is_empty()
    }
}

/// Downloads source URLs and reduces them to bounded plain-text evidence.
pub struct ContentExtractor {
    config: ExtractConfig,
}

impl ContentExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(urls = urls.len()))]
    pub async fn extract(&self, urls: &[Url], fetcher: &dyn PageFetcher) -> ExtractionReport {
        let start = Instant::now();
        let mut records = Vec::with_capacity(urls.len());

        for url in urls {
            records.push(self.extract_one(url, fetcher).await);
        }

        let aggregated = aggregate(&records);
        let report = ExtractionReport {
            records,
            aggregated,
            duration: start.elapsed(),
        };

        info!(
            usable = report.usable_count(),
            total = urls.len(),
            chars = report.aggregated.chars().count(),
            "extraction complete"
        );
        report
    }

    async fn extract_one(&self, url: &Url, fetcher: &dyn PageFetcher) -> SourceRecord {
        if has_pdf_extension(url) {
            debug!(%url, "pdf by extension, recording reference only");
            return SourceRecord::ok(url.as_str(), placeholder(url));
        }

        let fetched = match tokio::time::timeout(self.config.timeout, fetcher.get(url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                warn!(%url, error = %e, "source fetch failed");
                return SourceRecord::failed(url.as_str(), status_for(&e));
            }
            Err(_) => {
                let timeout_ms = self.config.timeout.as_millis() as u64;
                warn!(%url, timeout_ms, "source fetch timed out");
                return SourceRecord::failed(url.as_str(), SourceStatus::TimedOut);
            }
        };

        if fetched.is_binary() {
            debug!(
                %url,
                content_type = ?fetched.content_type,
                "non-html content, recording reference only"
            );
            return SourceRecord::ok(url.as_str(), placeholder(url));
        }

        match html_to_text(&fetched.body, self.config.max_chars_per_source) {
            Ok(extracted) if !extracted.text.is_empty() => {
                debug!(
                    %url,
                    chars = extracted.text.chars().count(),
                    truncated = extracted.truncated,
                    "source extracted"
                );
                SourceRecord::ok(url.as_str(), extracted.text)
            }
            Ok(_) => {
                warn!(%url, "source yielded no readable text");
                SourceRecord::failed(url.as_str(), SourceStatus::Failed)
            }
            Err(e) => {
                warn!(%url, error = %e, "text extraction failed");
                SourceRecord::failed(url.as_str(), SourceStatus::Failed)
            }
        }
    }
}

fn status_for(err: &FetchError) -> SourceStatus {
    if err.is_timeout() {
        SourceStatus::TimedOut
    } else {
        SourceStatus::Failed
    }
}

fn has_pdf_extension(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".pdf")
}

/// Reference line recorded in place of text for non-HTML sources.
fn placeholder(url: &Url) -> String {
    format!("Document reference (not parsed): {url}")
}

/// Join usable records into one evidence block, in record order.
fn aggregate(records: &[SourceRecord]) -> String {
    records
        .iter()
        .filter(|r| r.is_usable())
        .map(|r| format!("source: {}\n{}", r.url, r.raw_text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
