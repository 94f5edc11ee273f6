//! Topic ranking by live search-result volume.

use tracing::{info, instrument, warn};

use newsdesk_shared::{NewsdeskError, RankConfig, Result, Topic, render_template};

use crate::provider::SearchProvider;

/// Result count observed for one candidate topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScore {
    pub topic: Topic,
    pub count: usize,
    /// Set when the ranking query failed and `count` was defaulted to zero.
    pub error: Option<String>,
}

/// Scores each candidate topic by how many fresh results a query about it returns.
pub struct TopicRanker {
    config: RankConfig,
}

impl TopicRanker {
    pub fn new(config: RankConfig) -> Self {
        Self { config }
    }

    /// Query the provider once per topic, in catalog order.
    ///
    /// A failed query scores zero and ranking continues.
    #[instrument(skip_all, fields(topics = topics.len()))]
    pub async fn score(&self, topics: &[Topic], provider: &dyn SearchProvider) -> Vec<TopicScore> {
        let mut scores = Vec::with_capacity(topics.len());

        for topic in topics {
            let query = render_template(&self.config.query_template, &[("topic", topic.as_str())]);

            let score = match provider.search(&query, self.config.max_results).await {
                Ok(hits) => TopicScore {
                    topic: topic.clone(),
                    count: hits.len().min(self.config.max_results),
                    error: None,
                },
                Err(e) => {
                    warn!(%topic, error = %e, "ranking query failed, scoring zero");
                    TopicScore {
                        topic: topic.clone(),
                        count: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            scores.push(score);
        }

        scores
    }

    /// Pick the topic with the most results; the first in catalog order wins ties.
    pub async fn select_topic(
        &self,
        topics: &[Topic],
        provider: &dyn SearchProvider,
    ) -> Result<Topic> {
        let scores = self.score(topics, provider).await;
        let best = pick_best(&scores).ok_or(NewsdeskError::EmptyCatalog)?;

        info!(topic = %best.topic, count = best.count, "topic selected");
        Ok(best.topic.clone())
    }
}

/// First score reaching the maximum count.
pub fn pick_best(scores: &[TopicScore]) -> Option<&TopicScore> {
    scores
        .iter()
        .fold(None, |best: Option<&TopicScore>, s| match best {
            Some(b) if b.count >= s.count => Some(b),
            _ => Some(s),
        })
}
