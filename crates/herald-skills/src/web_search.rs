//! Web search handler: query → ranked results from the search collaborator.

use herald_core::{
    CapabilityHandler, HandlerContext, HandlerResult, HeraldError, HeraldResult, RetryPolicy,
    SearchProvider, Task, TaskCategory,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::realtime::format;

const HANDLER_NAME: &str = "web_search";

/// Results requested when not configured.
pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const MAX_RESULTS_CAP: usize = 20;

static LEADING_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:please\s+)?(?:search(?:\s+the\s+web)?(?:\s+for)?|look\s*up|lookup|find information (?:on|about))(?:\s+|$)")
        .expect("static search pattern")
});

pub struct WebSearchHandler {
    search: Arc<dyn SearchProvider>,
    retry: RetryPolicy,
    max_results: usize,
}

impl WebSearchHandler {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self {
            search,
            retry: RetryPolicy::default(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS_CAP);
        self
    }
}

/// Search terms: the extracted `query`, else the utterance minus the leading verb.
fn search_terms(task: &Task) -> Option<String> {
    if let Some(q) = task.detail("query") {
        return Some(q.to_string());
    }
    let stripped = LEADING_VERB.replace(task.utterance.trim(), "");
    let stripped = stripped.trim().trim_end_matches(['?', '.', '!']).trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

#[async_trait::async_trait]
impl CapabilityHandler for WebSearchHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::WebSearch
    }

    async fn handle(&self, task: &Task, _ctx: &HandlerContext) -> HeraldResult<HandlerResult> {
        let query = search_terms(task)
            .ok_or_else(|| HeraldError::InvalidInput("What should I search for?".into()))?;
        let limit = self.max_results;
        let hits = self
            .retry
            .run(self.search.name(), || self.search.search(&query, limit))
            .await
            .map_err(|e| {
                tracing::warn!(target: "herald::skills::web_search", error = %e, query = %query, "web search failed");
                HeraldError::unavailable(self.search.name(), &e)
            })?;
        let hits: Vec<_> = hits.into_iter().take(limit).collect();

        tracing::debug!(target: "herald::skills::web_search", query = %query, results = hits.len(), "web search done");
        let message = if hits.is_empty() {
            format!("I couldn't find anything for \"{query}\".")
        } else {
            format::web_results(&query, &hits)
        };
        Ok(HandlerResult::success(TaskCategory::WebSearch, self.search.name())
            .with_message(message)
            .with_data(serde_json::json!({ "query": query, "results": hits })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_prefer_extracted_query() {
        let t = Task::new(TaskCategory::WebSearch, "search for cats").with_detail("query", "cats");
        assert_eq!(search_terms(&t).as_deref(), Some("cats"));
    }

    #[test]
    fn terms_fall_back_to_stripped_utterance() {
        let t = Task::new(TaskCategory::WebSearch, "look up the tallest building?");
        assert_eq!(search_terms(&t).as_deref(), Some("the tallest building"));
        let t = Task::new(TaskCategory::WebSearch, "search");
        assert_eq!(search_terms(&t), None);
    }
}
