//! End-to-end run: rank → sources → extract → prompt → generate.
//!
//! Each phase is strictly sequential. Per-unit failures (one query, one URL)
//! are recovered inside the phase; a phase that leaves the run with nothing
//! to work on ends it with a distinct error.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use newsdesk_extract::{ContentExtractor, PageFetcher};
use newsdesk_search::{SearchProvider, Sleeper, SourceFetcher, TopicRanker};
use newsdesk_shared::{
    AppConfig, ExtractConfig, GeneratedArticle, GenerationConfig, NewsdeskError, PromptConfig,
    RankConfig, Result, RunId, SourceConfig, SourceRecord, Topic,
};

use crate::generation::{GenerationInvoker, TextGenerator};
use crate::prompt::PromptBuilder;

/// Everything one run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub catalog: Vec<Topic>,
    /// Skip ranking and use this topic.
    pub forced_topic: Option<Topic>,
    pub rank: RankConfig,
    pub sources: SourceConfig,
    pub extract: ExtractConfig,
    pub prompt: PromptConfig,
    pub generation: GenerationConfig,
}

impl RunConfig {
    pub fn from_app(config: &AppConfig, forced_topic: Option<Topic>) -> Self {
        Self {
            catalog: config.topics.topics(),
            forced_topic,
            rank: RankConfig::from(config),
            sources: SourceConfig::from(config),
            extract: ExtractConfig::from(config),
            prompt: PromptConfig::from(config),
            generation: GenerationConfig::from(config),
        }
    }
}

/// External capabilities the run depends on.
pub struct Collaborators<'a> {
    pub search: &'a dyn SearchProvider,
    pub fetcher: &'a dyn PageFetcher,
    pub model: &'a dyn TextGenerator,
    pub sleeper: &'a dyn Sleeper,
}

/// Output of a successful run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: RunId,
    pub topic: Topic,
    pub article: GeneratedArticle,
    pub sources: Vec<Url>,
    pub records: Vec<SourceRecord>,
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    fn topic_selected(&self, topic: &Topic);
    fn sources_found(&self, count: usize);
    /// Called when the run completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn topic_selected(&self, _topic: &Topic) {}
    fn sources_found(&self, _count: usize) {}
    fn done(&self, _result: &RunResult) {}
}

/// Run the full pipeline once.
///
/// Returns `NoSourcesFound` when discovery yields no URLs, `NoContent` when
/// no source produced usable text, and `GenerationFailed` when the model
/// produced no article. The model is never called without evidence.
#[instrument(skip_all, fields(forced = config.forced_topic.is_some()))]
pub async fn run(
    config: &RunConfig,
    collab: &Collaborators<'_>,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();
    let run_id = RunId::new();
    info!(%run_id, "starting run");

    // --- Phase 1: Topic ---
    let topic = match &config.forced_topic {
        Some(topic) => {
            info!(%topic, "using forced topic, ranking skipped");
            topic.clone()
        }
        None => {
            progress.phase("Ranking topics");
            TopicRanker::new(config.rank.clone())
                .select_topic(&config.catalog, collab.search)
                .await?
        }
    };
    progress.topic_selected(&topic);

    // --- Phase 2: Sources ---
    progress.phase("Searching sources");
    let sources = SourceFetcher::new(config.sources.clone())
        .fetch_sources(&topic, collab.search, collab.sleeper)
        .await;
    progress.sources_found(sources.len());

    if sources.is_empty() {
        warn!(%topic, "no sources found, stopping before generation");
        return Err(NewsdeskError::NoSourcesFound {
            topic: topic.to_string(),
        });
    }

    // --- Phase 3: Extraction ---
    progress.phase("Extracting source text");
    let report = ContentExtractor::new(config.extract.clone())
        .extract(&sources, collab.fetcher)
        .await;

    if !report.has_content() {
        warn!(%topic, sources = sources.len(), "no usable text, stopping before generation");
        return Err(NewsdeskError::NoContent {
            topic: topic.to_string(),
        });
    }

    // --- Phase 4: Prompt ---
    progress.phase("Building prompt");
    let prompt = PromptBuilder::new(config.prompt.clone()).build(&topic, &report.aggregated);

    // --- Phase 5: Generation ---
    progress.phase("Generating article");
    let article = GenerationInvoker::new(config.generation.clone())
        .generate(&prompt, collab.model)
        .await;

    if let Some(reason) = article.failure_reason() {
        return Err(NewsdeskError::GenerationFailed {
            topic: topic.to_string(),
            reason: reason.to_string(),
        });
    }

    let result = RunResult {
        run_id,
        topic,
        article,
        sources,
        records: report.records,
        elapsed: start.elapsed(),
    };

    info!(
        topic = %result.topic,
        sources = result.sources.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "run complete"
    );
    progress.done(&result);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationParams;
    use async_trait::async_trait;
    use newsdesk_extract::FetchedBody;
    use newsdesk_search::RecordingSleeper;
    use newsdesk_shared::{FetchError, GenerationError, SearchError, SearchHit, SourceStatus};
    use std::collections::HashMap;
    use std::sync::Mutex;

    // -- mocks --------------------------------------------------------------

    #[derive(Default)]
    struct StubSearch {
        results: HashMap<String, Vec<String>>,
        failing: Vec<String>,
    }

    impl StubSearch {
        fn with(mut self, query: &str, count: usize, host: &str) -> Self {
            let urls = (0..count).map(|i| format!("https://{host}/{i}")).collect();
            self.results.insert(query.to_string(), urls);
            self
        }

        fn failing(mut self, query: &str) -> Self {
            self.failing.push(query.to_string());
            self
        }
    }

    #[async_trait]
    impl SearchProvider for StubSearch {
        async fn search(
            &self,
            query: &str,
            max_results: usize,
        ) -> std::result::Result<Vec<SearchHit>, SearchError> {
            if self.failing.iter().any(|q| q == query) {
                return Err(SearchError::Provider("HTTP 500".into()));
            }
            Ok(self
                .results
                .get(query)
                .map(|urls| {
                    urls.iter()
                        .take(max_results)
                        .enumerate()
                        .map(|(i, url)| SearchHit {
                            url: url.clone(),
                            rank: i as u32 + 1,
                        })
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    /// Serves a short HTML page for every URL, or times out every fetch when `down`.
    #[derive(Default)]
    struct StubFetcher {
        down: bool,
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn get(&self, url: &Url) -> std::result::Result<FetchedBody, FetchError> {
            if self.down {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                });
            }
            Ok(FetchedBody {
                status: 200,
                content_type: Some("text/html".into()),
                body: format!("<html><body><main><p>Dati da {url}.</p></main></body></html>"),
            })
        }
    }

    struct StubModel {
        reply: std::result::Result<String, GenerationError>,
        calls: Mutex<Vec<String>>,
    }

    impl StubModel {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(GenerationError::Api("invalid index".into())),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for StubModel {
        fn model_id(&self) -> &str {
            "stub"
        }
        fn max_input_tokens(&self) -> usize {
            4096
        }
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
        async fn generate(
            &self,
            prompt: &str,
            _params: &GenerationParams,
        ) -> std::result::Result<String, GenerationError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn run_config(catalog: &[&str]) -> RunConfig {
        let mut app = AppConfig::default();
        app.topics.catalog = catalog.iter().map(|s| s.to_string()).collect();
        app.search.ranking_query = "{topic} news".into();
        app.search.primary_query = "{topic} site:gse.it".into();
        app.search.fallback_query = "{topic} approfondimento".into();
        RunConfig::from_app(&app, None)
    }

    // -- scenarios ----------------------------------------------------------

    #[tokio::test]
    async fn selects_busiest_topic_and_generates() {
        let search = StubSearch::default()
            .with("fotovoltaico news", 5, "news.example")
            .with("smart grid news", 1, "news.example")
            .with("fotovoltaico site:gse.it", 3, "gse.it");
        let fetcher = StubFetcher::default();
        let model = StubModel::replying("Article: Il fotovoltaico italiano cresce.");
        let sleeper = RecordingSleeper::new();
        let collab = Collaborators {
            search: &search,
            fetcher: &fetcher,
            model: &model,
            sleeper: &sleeper,
        };

        let result = run(&run_config(&["fotovoltaico", "smart grid"]), &collab, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.topic, Topic::new("fotovoltaico"));
        assert_eq!(result.sources.len(), 3);
        assert!(result.records.iter().all(|r| r.status == SourceStatus::Ok));
        assert_eq!(result.article.body, "Il fotovoltaico italiano cresce.");
        assert_eq!(model.calls().len(), 1);
        assert!(model.calls()[0].contains("source: https://gse.it/0"));
    }

    #[tokio::test]
    async fn no_urls_stops_before_generation() {
        let search = StubSearch::default().with("fotovoltaico news", 2, "news.example");
        let fetcher = StubFetcher::default();
        let model = StubModel::replying("Article: never");
        let sleeper = RecordingSleeper::new();
        let collab = Collaborators {
            search: &search,
            fetcher: &fetcher,
            model: &model,
            sleeper: &sleeper,
        };

        let err = run(&run_config(&["fotovoltaico", "smart grid"]), &collab, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NewsdeskError::NoSourcesFound { ref topic } if topic == "fotovoltaico"
        ));
        assert_eq!(err.exit_code(), 2);
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn all_fetches_failing_is_no_content() {
        let search = StubSearch::default().with("fotovoltaico site:gse.it", 2, "gse.it");
        let fetcher = StubFetcher { down: true };
        let model = StubModel::replying("Article: never");
        let sleeper = RecordingSleeper::new();
        let collab = Collaborators {
            search: &search,
            fetcher: &fetcher,
            model: &model,
            sleeper: &sleeper,
        };

        let err = run(&run_config(&["fotovoltaico"]), &collab, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, NewsdeskError::NoContent { .. }));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_is_reported() {
        let search = StubSearch::default().with("fotovoltaico site:gse.it", 2, "gse.it");
        let fetcher = StubFetcher::default();
        let model = StubModel::failing();
        let sleeper = RecordingSleeper::new();
        let collab = Collaborators {
            search: &search,
            fetcher: &fetcher,
            model: &model,
            sleeper: &sleeper,
        };

        let err = run(&run_config(&["fotovoltaico"]), &collab, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NewsdeskError::GenerationFailed { ref reason, .. } if reason.contains("invalid index")
        ));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn forced_topic_skips_ranking() {
        let search = StubSearch::default()
            .failing("fotovoltaico news")
            .with("idrogeno verde site:gse.it", 2, "gse.it");
        let fetcher = StubFetcher::default();
        let model = StubModel::replying("Article: Idrogeno.");
        let sleeper = RecordingSleeper::new();
        let collab = Collaborators {
            search: &search,
            fetcher: &fetcher,
            model: &model,
            sleeper: &sleeper,
        };

        let mut config = run_config(&["fotovoltaico"]);
        config.forced_topic = Some(Topic::new("idrogeno verde"));

        let result = run(&config, &collab, &SilentProgress).await.unwrap();
        assert_eq!(result.topic, Topic::new("idrogeno verde"));
        assert_eq!(result.article.body, "Idrogeno.");
    }

    #[tokio::test]
    async fn failing_ranking_queries_fall_back_to_first_topic() {
        let search = StubSearch::default()
            .failing("fotovoltaico news")
            .failing("smart grid news")
            .with("fotovoltaico site:gse.it", 2, "gse.it");
        let fetcher = StubFetcher::default();
        let model = StubModel::replying("Article: ok");
        let sleeper = RecordingSleeper::new();
        let collab = Collaborators {
            search: &search,
            fetcher: &fetcher,
            model: &model,
            sleeper: &sleeper,
        };

        let result = run(&run_config(&["fotovoltaico", "smart grid"]), &collab, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(result.topic, Topic::new("fotovoltaico"));
    }
}
