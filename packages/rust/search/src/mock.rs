//! In-memory search provider for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use newsdesk_shared::{SearchError, SearchHit};

use crate::provider::SearchProvider;

/// Answers each query from a fixed table; unknown queries return no hits.
#[derive(Default)]
pub(crate) struct MapProvider {
    responses: HashMap<String, Result<Vec<String>, SearchError>>,
    log: Mutex<Vec<String>>,
}

impl MapProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_urls(mut self, query: &str, urls: &[&str]) -> Self {
        let urls = urls.iter().map(|u| (*u).to_string()).collect();
        self.responses.insert(query.to_string(), Ok(urls));
        self
    }

    pub(crate) fn with_error(mut self, query: &str, err: SearchError) -> Self {
        self.responses.insert(query.to_string(), Err(err));
        self
    }

    /// Queries issued so far, in order.
    pub(crate) fn queries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MapProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.log.lock().unwrap().push(query.to_string());
        match self.responses.get(query) {
            Some(Ok(urls)) => Ok(urls
                .iter()
                .take(max_results)
                .enumerate()
                .map(|(i, u)| SearchHit {
                    url: u.clone(),
                    rank: i as u32 + 1,
                })
                .collect()),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(vec![]),
        }
    }
}
