//! Article generation against a text-completion model.
//!
//! [`GenerationInvoker`] owns the length-ceiling handling and output
//! post-processing; the model itself sits behind [`TextGenerator`].
//! Generation errors never escape the invoker: they become a sentinel
//! [`GeneratedArticle`] whose outcome carries the reason.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use newsdesk_shared::{
    GeneratedArticle, GenerationConfig, GenerationError, NewsdeskError, Prompt, Result,
    join_with_terminator, truncate_chars,
};

/// Request timeout for completion calls.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

/// Sampling controls passed with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
}

/// A generative model consumed through a narrow contract.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model_id(&self) -> &str;

    /// Largest input, in the model's own units, it accepts.
    fn max_input_tokens(&self) -> usize;

    /// Measure `text` in the same units as [`max_input_tokens`](Self::max_input_tokens).
    fn count_tokens(&self, text: &str) -> usize;

    /// Raw model output. May echo the prompt before the continuation.
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> std::result::Result<String, GenerationError>;
}

// ---------------------------------------------------------------------------
// GenerationInvoker
// ---------------------------------------------------------------------------

/// Fits prompts under the model ceiling, submits them, and extracts the article.
pub struct GenerationInvoker {
    config: GenerationConfig,
}

impl GenerationInvoker {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    fn params(&self) -> GenerationParams {
        GenerationParams {
            max_new_tokens: self.config.max_new_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Effective ceiling: the tighter of the configured and model limits.
    fn ceiling(&self, model: &dyn TextGenerator) -> usize {
        self.config.max_input_tokens.min(model.max_input_tokens())
    }

    /// Generate an article for `prompt`. Never fails; see [`GeneratedArticle::failed`].
    #[instrument(skip_all, fields(topic = %prompt.topic, model = model.model_id()))]
    pub async fn generate(&self, prompt: &Prompt, model: &dyn TextGenerator) -> GeneratedArticle {
        let input = match self.fit_prompt(prompt, model) {
            Ok(input) => input,
            Err(e) => {
                warn!(error = %e, "prompt cannot fit model ceiling");
                return GeneratedArticle::failed(prompt.topic.clone(), e.to_string());
            }
        };

        let raw = match model.generate(&input, &self.params()).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "generation failed");
                return GeneratedArticle::failed(prompt.topic.clone(), e.to_string());
            }
        };

        let body = extract_continuation(&raw, &prompt.terminator);
        if body.is_empty() {
            warn!(raw_len = raw.len(), "model returned no continuation");
            return GeneratedArticle::failed(
                prompt.topic.clone(),
                GenerationError::EmptyOutput.to_string(),
            );
        }

        info!(chars = body.chars().count(), "article generated");
        GeneratedArticle::generated(prompt.topic.clone(), body)
    }

    /// Return the text to submit, cut so its measured length is within the ceiling.
    ///
    /// Only the body is shortened; the terminator suffix is always kept.
    /// When cutting is needed the target is the ceiling minus the configured
    /// headroom (never less than the terminator-only prompt), and every
    /// iteration strictly shortens the body.
    pub fn fit_prompt(
        &self,
        prompt: &Prompt,
        model: &dyn TextGenerator,
    ) -> std::result::Result<String, GenerationError> {
        let ceiling = self.ceiling(model);
        let full = prompt.text();
        let measured = model.count_tokens(&full);
        if measured <= ceiling {
            debug!(measured, ceiling, "prompt within ceiling");
            return Ok(full);
        }

        let floor = model.count_tokens(&join_with_terminator("", &prompt.terminator));
        if floor > ceiling {
            return Err(GenerationError::InputTooLong { ceiling });
        }
        let target = ceiling.saturating_sub(self.config.headroom_tokens).max(floor);
        let mut body = prompt.body.as_str();
        let mut current = measured;
        let mut iterations = 0u32;

        while current > target {
            let chars = body.chars().count();
            if chars == 0 {
                return Err(GenerationError::InputTooLong { ceiling });
            }
            // Proportional estimate, forced to shrink by at least one char.
            let estimate = (chars as u128 * target as u128 / current.max(1) as u128) as usize;
            body = truncate_chars(body, estimate.min(chars - 1));
            current = model.count_tokens(&join_with_terminator(body, &prompt.terminator));
            iterations += 1;
        }

        info!(
            original = measured,
            fitted = current,
            ceiling,
            iterations,
            "prompt truncated to fit model ceiling"
        );
        Ok(join_with_terminator(body, &prompt.terminator))
    }
}

/// Take the text after the last `terminator`, trimmed. Output without the
/// marker is treated as pure continuation.
pub fn extract_continuation(raw: &str, terminator: &str) -> String {
    let tail = match raw.rsplit_once(terminator) {
        Some((_, after)) if !terminator.is_empty() => after,
        _ => raw,
    };
    tail.trim().to_string()
}

// ---------------------------------------------------------------------------
// OpenRouter completions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

/// [`TextGenerator`] backed by the OpenRouter `/completions` endpoint.
pub struct OpenRouterGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_input_tokens: usize,
}

impl OpenRouterGenerator {
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .map_err(|e| NewsdeskError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_input_tokens: config.max_input_tokens,
        })
    }
}

/// Rough token estimate: about four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[async_trait]
impl TextGenerator for OpenRouterGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }

    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    #[instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> std::result::Result<String, GenerationError> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: params.max_new_tokens,
            temperature: params.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Api(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_chars(detail.trim(), 200)
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Api(format!("invalid completion response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or(GenerationError::EmptyOutput)?;

        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}
