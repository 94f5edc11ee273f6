//! Application configuration for newsdesk.
//!
//! User config lives at `~/.newsdesk/newsdesk.toml`.
//! CLI flags override config file values, which override defaults.
//! Components never read this file directly: each one receives its own
//! runtime config, derived with `From<&AppConfig>`, at construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NewsdeskError, Result};
use crate::types::Topic;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "newsdesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".newsdesk";

// ---------------------------------------------------------------------------
// Config structs (matching newsdesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub topics: TopicsSection,

    #[serde(default)]
    pub search: SearchSection,

    #[serde(default)]
    pub fetch: FetchSection,

    #[serde(default)]
    pub prompt: PromptSection,

    #[serde(default)]
    pub model: ModelSection,

    #[serde(default)]
    pub post: PostSection,
}

/// `[topics]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsSection {
    /// Candidate topics, ranked in catalog order on ties.
    #[serde(default = "default_catalog")]
    pub catalog: Vec<String>,
}

impl Default for TopicsSection {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
        }
    }
}

impl TopicsSection {
    pub fn topics(&self) -> Vec<Topic> {
        self.catalog.iter().map(|t| Topic::new(t.as_str())).collect()
    }
}

fn default_catalog() -> Vec<String> {
    [
        "mobilità elettrica",
        "energia rinnovabile",
        "incentivi auto elettriche",
        "batterie al litio",
        "colonnine di ricarica",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSection {
    /// Name of the env var holding the search API key (never store the key itself).
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Country code passed to the provider (`gl`).
    #[serde(default = "default_locale")]
    pub country: String,

    /// Interface language passed to the provider (`hl`).
    #[serde(default = "default_locale")]
    pub language: String,

    /// Freshness query used for ranking; `{topic}` is substituted.
    #[serde(default = "default_ranking_query")]
    pub ranking_query: String,

    #[serde(default = "default_ranking_max_results")]
    pub ranking_max_results: usize,

    /// Authority-biased query for sources.
    #[serde(default = "default_primary_query")]
    pub primary_query: String,

    /// Broader query used when the primary one comes up short.
    #[serde(default = "default_fallback_query")]
    pub fallback_query: String,

    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Below this many primary URLs the fallback query runs.
    #[serde(default = "default_min_primary_sources")]
    pub min_primary_sources: usize,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            endpoint: default_search_endpoint(),
            country: default_locale(),
            language: default_locale(),
            ranking_query: default_ranking_query(),
            ranking_max_results: default_ranking_max_results(),
            primary_query: default_primary_query(),
            fallback_query: default_fallback_query(),
            max_sources: default_max_sources(),
            min_primary_sources: default_min_primary_sources(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_search_key_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}
fn default_locale() -> String {
    "it".into()
}
fn default_ranking_query() -> String {
    "{topic} ultime notizie".into()
}
fn default_ranking_max_results() -> usize {
    5
}
fn default_primary_query() -> String {
    "{topic} (site:gse.it OR site:enea.it OR site:mase.gov.it OR site:arera.it OR filetype:pdf)"
        .into()
}
fn default_fallback_query() -> String {
    "{topic} approfondimento".into()
}
fn default_max_sources() -> usize {
    3
}
fn default_min_primary_sources() -> usize {
    2
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    5
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Set to `false` for sources with broken certificates.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_max_chars_per_source")]
    pub max_chars_per_source: usize,

    /// Permit loopback/private hosts (local mirrors, tests).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            verify_ssl: true,
            user_agent: default_user_agent(),
            max_chars_per_source: default_max_chars_per_source(),
            allow_private_hosts: false,
        }
    }
}

fn default_fetch_timeout() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    concat!("Mozilla/5.0 (compatible; newsdesk/", env!("CARGO_PKG_VERSION"), ")").into()
}
fn default_max_chars_per_source() -> usize {
    1000
}

/// `[prompt]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSection {
    /// Instruction template; supports `{topic}`, `{evidence}`, `{sections}`,
    /// `{target_words}` and `{tone}`.
    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default = "default_sections")]
    pub sections: Vec<String>,

    #[serde(default = "default_target_words")]
    pub target_words: u32,

    #[serde(default = "default_tone")]
    pub tone: String,

    /// Evidence budget in characters.
    #[serde(default = "default_evidence_chars")]
    pub evidence_chars: usize,

    /// Marker the model continues after.
    #[serde(default = "default_terminator")]
    pub terminator: String,
}

impl Default for PromptSection {
    fn default() -> Self {
        Self {
            template: default_template(),
            sections: default_sections(),
            target_words: default_target_words(),
            tone: default_tone(),
            evidence_chars: default_evidence_chars(),
            terminator: default_terminator(),
        }
    }
}

fn default_template() -> String {
    "Scrivi un articolo accurato di circa {target_words} parole su \"{topic}\", \
     con tono {tone}. Struttura: {sections}. Usa solo i dati delle fonti seguenti.\n\n\
     Fonti:\n{evidence}"
        .into()
}
fn default_sections() -> Vec<String> {
    ["Introduzione", "Dati chiave", "Sviluppi recenti", "Prospettive"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_target_words() -> u32 {
    500
}
fn default_tone() -> String {
    "tecnico e divulgativo".into()
}
fn default_evidence_chars() -> usize {
    2000
}
fn default_terminator() -> String {
    "Article:".into()
}

/// `[model]` section (OpenRouter completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_model_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Input ceiling in tokens.
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    /// Lower for technical catalogs.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Tokens kept free below the ceiling when the prompt must be cut.
    #[serde(default = "default_headroom_tokens")]
    pub headroom_tokens: usize,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            api_key_env: default_model_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            max_input_tokens: default_max_input_tokens(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            headroom_tokens: default_headroom_tokens(),
        }
    }
}

fn default_model_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "mistralai/mistral-7b-instruct".into()
}
fn default_max_input_tokens() -> usize {
    1024
}
fn default_max_new_tokens() -> u32 {
    600
}
fn default_temperature() -> f32 {
    0.7
}
fn default_headroom_tokens() -> usize {
    16
}

/// `[post]` section, consumed by the post assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSection {
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_license")]
    pub license: String,

    #[serde(default)]
    pub default_image: Option<String>,

    /// Cover image per topic label.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

impl Default for PostSection {
    fn default() -> Self {
        Self {
            posts_dir: default_posts_dir(),
            tags: Vec::new(),
            license: default_license(),
            default_image: None,
            images: BTreeMap::new(),
        }
    }
}

fn default_posts_dir() -> String {
    "_posts".into()
}
fn default_license() -> String {
    "CC BY 4.0".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (derived per component)
// ---------------------------------------------------------------------------

/// Topic ranking settings.
#[derive(Debug, Clone)]
pub struct RankConfig {
    pub query_template: String,
    pub max_results: usize,
}

impl From<&AppConfig> for RankConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            query_template: config.search.ranking_query.clone(),
            max_results: config.search.ranking_max_results,
        }
    }
}

/// Source discovery settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub primary_query: String,
    pub fallback_query: String,
    pub max_sources: usize,
    pub min_primary_sources: usize,
    /// Total attempts per query, first try included.
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl From<&AppConfig> for SourceConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            primary_query: config.search.primary_query.clone(),
            fallback_query: config.search.fallback_query.clone(),
            max_sources: config.search.max_sources,
            min_primary_sources: config.search.min_primary_sources,
            retry_attempts: config.search.retry_attempts,
            retry_delay: Duration::from_secs(config.search.retry_delay_secs),
        }
    }
}

/// Page fetch + extraction settings.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub user_agent: String,
    pub max_chars_per_source: usize,
    pub allow_private_hosts: bool,
}

impl From<&AppConfig> for ExtractConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            verify_ssl: config.fetch.verify_ssl,
            user_agent: config.fetch.user_agent.clone(),
            max_chars_per_source: config.fetch.max_chars_per_source,
            allow_private_hosts: config.fetch.allow_private_hosts,
        }
    }
}

/// Prompt rendering settings.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub template: String,
    pub sections: Vec<String>,
    pub target_words: u32,
    pub tone: String,
    pub evidence_chars: usize,
    pub terminator: String,
}

impl From<&AppConfig> for PromptConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            template: config.prompt.template.clone(),
            sections: config.prompt.sections.clone(),
            target_words: config.prompt.target_words,
            tone: config.prompt.tone.clone(),
            evidence_chars: config.prompt.evidence_chars,
            terminator: config.prompt.terminator.clone(),
        }
    }
}

/// Model invocation settings.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub max_input_tokens: usize,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub headroom_tokens: usize,
    pub terminator: String,
}

impl From<&AppConfig> for GenerationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.model.base_url.clone(),
            model: config.model.model.clone(),
            max_input_tokens: config.model.max_input_tokens,
            max_new_tokens: config.model.max_new_tokens,
            temperature: config.model.temperature,
            headroom_tokens: config.model.headroom_tokens,
            terminator: config.prompt.terminator.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.newsdesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NewsdeskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.newsdesk/newsdesk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NewsdeskError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        NewsdeskError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    if config.topics.catalog.is_empty() {
        return Err(NewsdeskError::config(format!(
            "{}: [topics] catalog must list at least one topic",
            path.display()
        )));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NewsdeskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NewsdeskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NewsdeskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named env var, failing if unset or empty.
pub fn read_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(NewsdeskError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}
