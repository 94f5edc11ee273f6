//! Search-driven topic ranking and source discovery.
//!
//! This crate provides:
//! - [`SearchProvider`]: the search collaborator contract, with [`SerperProvider`]
//! - [`search_with_retry`]: fixed-delay retry of rate-limited queries behind a [`Sleeper`]
//! - [`TopicRanker`]: picks the topic with the most fresh results
//! - [`SourceFetcher`]: primary + fallback queries into a bounded URL list

pub mod backoff;
pub mod provider;
pub mod ranker;
pub mod sources;

#[cfg(test)]
mod mock;

pub use backoff::{RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper, search_with_retry};
pub use provider::{SearchProvider, SerperOptions, SerperProvider};
pub use ranker::{TopicRanker, TopicScore, pick_best};
pub use sources::SourceFetcher;
