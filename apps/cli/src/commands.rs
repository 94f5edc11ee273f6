//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use newsdesk_core::pipeline::{Collaborators, ProgressReporter, RunConfig, RunResult};
use newsdesk_core::{OpenRouterGenerator, write_post};
use newsdesk_extract::HttpFetcher;
use newsdesk_search::{
    SerperOptions, SerperProvider, SourceFetcher, TokioSleeper, TopicRanker, pick_best,
};
use newsdesk_shared::{
    AppConfig, ExtractConfig, GenerationConfig, RankConfig, SourceConfig, Topic,
    config_file_path, init_config, load_config, load_config_from, read_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// newsdesk: search-grounded article generation.
#[derive(Parser)]
#[command(
    name = "newsdesk",
    version,
    about = "Pick a trending topic, gather web sources, and write a grounded article post.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.newsdesk/newsdesk.toml).
    #[arg(long, env = "NEWSDESK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full pipeline and write a post.
    Run {
        /// Use this topic instead of ranking the catalog.
        #[arg(short, long)]
        topic: Option<String>,

        /// Print the article instead of writing it.
        #[arg(long)]
        dry_run: bool,

        /// Override `[post] posts_dir`.
        #[arg(long)]
        posts_dir: Option<String>,
    },

    /// Score every catalog topic and show the winner.
    Rank,

    /// List the source URLs discovered for a topic.
    Sources {
        /// Topic to search for (defaults to the ranked winner).
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "newsdesk=info",
        1 => "newsdesk=debug",
        _ => "newsdesk=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            topic,
            dry_run,
            posts_dir,
        } => cmd_run(config_path, topic, dry_run, posts_dir).await,
        Command::Rank => cmd_rank(config_path).await,
        Command::Sources { topic } => cmd_sources(config_path, topic).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn load(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

fn build_search(config: &AppConfig) -> Result<SerperProvider> {
    let key = read_api_key(&config.search.api_key_env)?;
    let mut opts = SerperOptions::new(config.search.endpoint.clone(), key);
    opts.country = config.search.country.clone();
    opts.language = config.search.language.clone();
    Ok(SerperProvider::new(opts)?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    topic: Option<String>,
    dry_run: bool,
    posts_dir: Option<String>,
) -> Result<()> {
    let mut config = load(config_path)?;
    if let Some(dir) = posts_dir {
        config.post.posts_dir = dir;
    }

    // Validate both API keys before doing anything
    let search = build_search(&config)?;
    let model_key = read_api_key(&config.model.api_key_env)?;
    let model = OpenRouterGenerator::new(&GenerationConfig::from(&config), model_key)?;
    let fetcher = HttpFetcher::new(&ExtractConfig::from(&config))?;
    let sleeper = TokioSleeper;

    let run_config = RunConfig::from_app(&config, topic.map(Topic::new));
    let collab = Collaborators {
        search: &search,
        fetcher: &fetcher,
        model: &model,
        sleeper: &sleeper,
    };

    info!(dry_run, posts_dir = %config.post.posts_dir, "starting newsdesk run");

    let reporter = CliProgress::new();
    let outcome = newsdesk_core::pipeline::run(&run_config, &collab, &reporter).await;
    reporter.clear();
    let result = outcome?;

    if dry_run {
        println!("# {}\n", result.topic.title_case());
        println!("{}", result.article.body);
        return Ok(());
    }

    let today = chrono::Local::now().date_naive();
    let meta = write_post(&config.post, &result.article, today)?;

    println!();
    println!("  Post written!");
    println!("  Run:     {}", result.run_id);
    println!("  Topic:   {}", result.topic);
    println!("  Sources: {}", result.sources.len());
    println!("  Path:    {}", meta.path.display());
    println!("  SHA256:  {}", meta.sha256);
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_rank(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let search = build_search(&config)?;
    let ranker = TopicRanker::new(RankConfig::from(&config));

    let scores = ranker.score(&config.topics.topics(), &search).await;
    let best = pick_best(&scores).ok_or_else(|| eyre!("topic catalog is empty"))?;

    println!();
    for score in &scores {
        let marker = if score.topic == best.topic { "*" } else { " " };
        let line = format!("  {marker} {:<32} {:>3}", score.topic.as_str(), score.count);
        match &score.error {
            Some(e) => println!("{line}  ({e})"),
            None => println!("{line}"),
        }
    }
    println!();
    println!("  Selected: {}", best.topic);
    println!();

    Ok(())
}

async fn cmd_sources(config_path: Option<&Path>, topic: Option<String>) -> Result<()> {
    let config = load(config_path)?;
    let search = build_search(&config)?;

    let topic = match topic {
        Some(t) => Topic::new(t),
        None => {
            TopicRanker::new(RankConfig::from(&config))
                .select_topic(&config.topics.topics(), &search)
                .await?
        }
    };

    let urls = SourceFetcher::new(SourceConfig::from(&config))
        .fetch_sources(&topic, &search, &TokioSleeper)
        .await;

    println!();
    println!("  Topic: {topic}");
    if urls.is_empty() {
        println!("  No sources found.");
    }
    for (i, url) in urls.iter().enumerate() {
        println!("  {:>2}. {url}", i + 1);
    }
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let source = match config_path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    println!("# {}", source.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn topic_selected(&self, topic: &Topic) {
        self.spinner.println(format!("  Topic: {topic}"));
    }

    fn sources_found(&self, count: usize) {
        self.spinner.set_message(format!("Found {count} sources"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}
