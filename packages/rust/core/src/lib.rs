//! Core pipeline orchestration and domain logic for newsdesk.
//!
//! This crate ties together topic ranking, source discovery, extraction,
//! prompt building and generation into one run, and writes the result as
//! a Markdown post.

pub mod assembler;
pub mod generation;
pub mod pipeline;
pub mod prompt;

pub use assembler::{PostMeta, post_file_name, render_post, write_post};
pub use generation::{
    GenerationInvoker, GenerationParams, OpenRouterGenerator, TextGenerator, estimate_tokens,
    extract_continuation,
};
pub use pipeline::{
    Collaborators, ProgressReporter, RunConfig, RunResult, SilentProgress, run,
};
pub use prompt::PromptBuilder;
