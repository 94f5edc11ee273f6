//! Prompt construction from topic + evidence.

use tracing::{debug, instrument};

use newsdesk_shared::{Prompt, PromptConfig, Topic, render_template, truncate_chars};

/// Renders the configured instruction template around bounded evidence.
pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    /// Build the prompt for `topic`.
    ///
    /// Evidence is cut to `evidence_chars` characters before interpolation,
    /// so the evidence part of the prompt never exceeds that budget.
    #[instrument(skip_all, fields(topic = %topic, evidence_len = aggregated.chars().count()))]
    pub fn build(&self, topic: &Topic, aggregated: &str) -> Prompt {
        let evidence = truncate_chars(aggregated.trim(), self.config.evidence_chars);
        let sections = self.config.sections.join(", ");
        let target_words = self.config.target_words.to_string();

        // Evidence goes last so placeholder-like text inside it is not expanded.
        let body = render_template(
            &self.config.template,
            &[
                ("topic", topic.as_str()),
                ("sections", &sections),
                ("target_words", &target_words),
                ("tone", &self.config.tone),
                ("evidence", evidence),
            ],
        );

        debug!(
            evidence_chars = evidence.chars().count(),
            body_chars = body.chars().count(),
            "prompt built"
        );

        Prompt {
            topic: topic.clone(),
            aggregated_text: evidence.to_string(),
            instruction_template: self.config.template.clone(),
            body: body.trim_end().to_string(),
            terminator: self.config.terminator.clone(),
        }
    }
}
