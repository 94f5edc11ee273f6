//! Source download and evidence extraction.
//!
//! - [`PageFetcher`] / [`HttpFetcher`]: the HTTP collaborator (timeout,
//!   optional certificate bypass, SSRF guard)
//! - [`ContentExtractor`]: turns a URL list into per-source records and one
//!   aggregated evidence block

pub mod extractor;
pub mod http;

pub use extractor::{ContentExtractor, ExtractionReport};
pub use http::{FetchedBody, HttpFetcher, PageFetcher, is_binary_content_type};
