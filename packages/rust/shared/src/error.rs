//! Error types for newsdesk.
//!
//! Library crates use [`NewsdeskError`] via `thiserror`; the collaborator
//! contracts (search, page fetch, text generation) each get a narrow error
//! enum so callers can decide what is retryable and what is isolated.
//! The CLI wraps everything with `color-eyre`.

use std::path::PathBuf;

/// Top-level error type for all newsdesk operations.
#[derive(Debug, thiserror::Error)]
pub enum NewsdeskError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside of the per-unit recovery paths.
    #[error("network error: {0}")]
    Network(String),

    /// HTML-to-text conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The topic catalog has no entries, so nothing can be ranked.
    #[error("topic catalog is empty")]
    EmptyCatalog,

    /// Neither the primary nor the fallback query produced a source URL.
    #[error("no sources found for topic '{topic}'")]
    NoSourcesFound { topic: String },

    /// Sources were found but none yielded usable text.
    #[error("no usable content extracted for topic '{topic}'")]
    NoContent { topic: String },

    /// The model did not produce article text.
    #[error("article generation failed for topic '{topic}': {reason}")]
    GenerationFailed { topic: String, reason: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NewsdeskError>;

impl NewsdeskError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error.
    ///
    /// Terminal run outcomes get their own codes so schedulers can tell
    /// "nothing to write about" apart from a broken setup.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NoSourcesFound { .. } => 2,
            Self::NoContent { .. } => 3,
            Self::GenerationFailed { .. } => 4,
            _ => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

/// Failure of a single search-provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The provider throttled the request; retryable.
    #[error("search provider rate-limited query '{query}'")]
    RateLimited { query: String },

    /// Any other provider failure; the query is abandoned.
    #[error("search provider error: {0}")]
    Provider(String),
}

impl SearchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Failure of a single page fetch. Always isolated to one URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("{url}: timed out")]
    Timeout { url: String },

    #[error("{url}: {message}")]
    Transport { url: String, message: String },

    #[error("{url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url}: blocked private or non-http target")]
    Blocked { url: String },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Failure raised by the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The prompt cannot be made to fit the model's input ceiling.
    #[error("prompt does not fit model ceiling of {ceiling} tokens")]
    InputTooLong { ceiling: usize },

    /// The model runtime or API rejected the request.
    #[error("model error: {0}")]
    Api(String),

    /// The model answered but produced no continuation text.
    #[error("model returned no article text")]
    EmptyOutput,
}
