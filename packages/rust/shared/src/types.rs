//! Core domain types for a single article run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A short subject label drawn from the configured catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase, dash-separated form used for categories and file names.
    ///
    /// Every non-alphanumeric character becomes a separator, so the result
    /// never contains path separators or dots.
    pub fn slug(&self) -> String {
        self.0
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// The label with its first character uppercased.
    pub fn title_case(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Search & sources
// ---------------------------------------------------------------------------

/// One result record returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    /// 1-based position in the provider's result list.
    pub rank: u32,
}

/// Outcome of fetching a single source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    TimedOut,
    Failed,
}

/// Extracted evidence for one source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub url: String,
    /// Extracted text; empty unless `status` is `Ok`.
    pub raw_text: String,
    pub status: SourceStatus,
}

impl SourceRecord {
    pub fn ok(url: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            raw_text: raw_text.into(),
            status: SourceStatus::Ok,
        }
    }

    pub fn failed(url: impl Into<String>, status: SourceStatus) -> Self {
        Self {
            url: url.into(),
            raw_text: String::new(),
            status,
        }
    }

    /// Whether this record contributes text to the evidence.
    pub fn is_usable(&self) -> bool {
        self.status == SourceStatus::Ok && !self.raw_text.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Prompt & article
// ---------------------------------------------------------------------------

/// A fully rendered generation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub topic: Topic,
    /// Evidence after truncation to the prompt budget.
    pub aggregated_text: String,
    /// The template the prompt was rendered from.
    pub instruction_template: String,
    /// Everything before the terminator.
    pub body: String,
    /// Marker the model continues after (e.g. `Article:`).
    pub terminator: String,
}

impl Prompt {
    /// The text submitted to the model.
    pub fn text(&self) -> String {
        join_with_terminator(&self.body, &self.terminator)
    }
}

/// Join a prompt body with its terminator marker.
pub fn join_with_terminator(body: &str, terminator: &str) -> String {
    format!("{body}\n\n{terminator}")
}

/// Body written into a failed article in place of generated text.
pub const FAILED_ARTICLE_BODY: &str = "[article generation failed]";

/// Whether generation produced text or fell back to the sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated,
    Failed { reason: String },
}

/// The pipeline's output article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArticle {
    pub topic: Topic,
    pub body: String,
    pub outcome: GenerationOutcome,
}

impl GeneratedArticle {
    pub fn generated(topic: Topic, body: impl Into<String>) -> Self {
        Self {
            topic,
            body: body.into(),
            outcome: GenerationOutcome::Generated,
        }
    }

    /// Sentinel article for a recovered generation failure.
    pub fn failed(topic: Topic, reason: impl Into<String>) -> Self {
        Self {
            topic,
            body: FAILED_ARTICLE_BODY.to_string(),
            outcome: GenerationOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, GenerationOutcome::Failed { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            GenerationOutcome::Failed { reason } => Some(reason),
            GenerationOutcome::Generated => None,
        }
    }
}
