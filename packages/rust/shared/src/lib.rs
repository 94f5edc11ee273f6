//! Shared types, error model, and configuration for newsdesk.
//!
//! This crate is the foundation depended on by all other newsdesk crates.
//! It provides:
//! - [`NewsdeskError`]: the unified error type, plus collaborator errors
//! - Domain types ([`Topic`], [`SourceRecord`], [`Prompt`], [`GeneratedArticle`])
//! - Configuration ([`AppConfig`] and the per-component runtime configs)

pub mod config;
pub mod error;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractConfig, FetchSection, GenerationConfig, ModelSection, PostSection,
    PromptConfig, PromptSection, RankConfig, SearchSection, SourceConfig, TopicsSection,
    config_dir, config_file_path, init_config, load_config, load_config_from, read_api_key,
};
pub use error::{FetchError, GenerationError, NewsdeskError, Result, SearchError};
pub use text::{render_template, truncate_chars};
pub use types::{
    FAILED_ARTICLE_BODY, GeneratedArticle, GenerationOutcome, Prompt, RunId, SearchHit,
    SourceRecord, SourceStatus, Topic, join_with_terminator,
};
