//! Real-time information: a tiered cascade over cache, direct timezone resolution, category
//! providers, model-assisted categorization and a generic web-search fallback.
//!
//! Tiers, each tried only when the previous one is inapplicable or fails:
//! 1. cache (`"{category}:{subject}"`)
//! 2. direct resolution (time only, no network)
//! 3. category provider
//! 4. model categorization (only when nothing identified a category)
//! 5. web-search fallback (`partial`)
//! 6. terminal error

pub mod format;
pub mod infer;
pub mod shortcuts;
pub mod timezones;

use chrono::Utc;
use herald_core::{
    CapabilityHandler, CategoryProvider, ErrorKind, HandlerContext, HandlerResult, HeraldError,
    HeraldResult, RealTimeCategory, RealTimeConfig, RealTimeRequest, RetryPolicy, SearchProvider,
    StructuredClassifier, Task, TaskCategory, TtlCache,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const HANDLER_NAME: &str = "real_time";
const TIMEZONE_SOURCE: &str = "timezone";
/// Directly resolved time readings go stale quickly; they are cached for a fixed window.
const TIME_TTL: Duration = Duration::from_secs(600);

/// What the cache holds for a resolved request.
#[derive(Debug, Clone)]
pub struct CachedAnswer {
    pub message: String,
    pub data: serde_json::Value,
    pub source: String,
}

pub struct RealTimeEngine {
    providers: HashMap<RealTimeCategory, Arc<dyn CategoryProvider>>,
    search: Option<Arc<dyn SearchProvider>>,
    classifier: Option<Arc<dyn StructuredClassifier>>,
    cache: Arc<TtlCache<CachedAnswer>>,
    retry: RetryPolicy,
    config: RealTimeConfig,
    provider_ttl: Duration,
}

impl RealTimeEngine {
    pub fn new(cache: Arc<TtlCache<CachedAnswer>>, config: RealTimeConfig) -> Self {
        Self {
            providers: HashMap::new(),
            search: None,
            classifier: None,
            cache,
            retry: RetryPolicy::default(),
            config,
            provider_ttl: Duration::from_secs(600),
        }
    }

    pub fn with_provider(mut self, category: RealTimeCategory, provider: Arc<dyn CategoryProvider>) -> Self {
        self.providers.insert(category, provider);
        self
    }

    pub fn with_providers(mut self, providers: HashMap<RealTimeCategory, Arc<dyn CategoryProvider>>) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn StructuredClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_provider_ttl(mut self, ttl: Duration) -> Self {
        self.provider_ttl = ttl;
        self
    }

    pub fn cache(&self) -> &Arc<TtlCache<CachedAnswer>> {
        &self.cache
    }

    /// Answers `query`. `request` is the caller's structured request when it already knows
    /// the category; otherwise rule shortcuts and then the model are consulted.
    pub async fn answer(&self, query: &str, request: Option<RealTimeRequest>) -> HandlerResult {
        let query = query.trim();
        if query.is_empty() && request.is_none() {
            return HandlerResult::error(
                TaskCategory::RealTime,
                HANDLER_NAME,
                &HeraldError::InvalidInput("What would you like me to look up?".into()),
            );
        }

        let known = request.or_else(|| shortcuts::parse(query));
        let resolved = match &known {
            Some(req) => self.resolve(req).await,
            None => match self.categorize(query).await {
                Some(req) => self.resolve(&req).await,
                None => None,
            },
        };
        if let Some(result) = resolved {
            return result;
        }

        let search_text = if query.is_empty() {
            known.as_ref().and_then(|r| r.subject()).unwrap_or_default().to_string()
        } else {
            query.to_string()
        };
        if let Some(result) = self.search_fallback(&search_text).await {
            return result;
        }

        tracing::warn!(target: "herald::realtime", query, "all tiers exhausted");
        HandlerResult::error_message(
            TaskCategory::RealTime,
            HANDLER_NAME,
            ErrorKind::ExternalUnavailable,
            "Sorry, I couldn't find current information for that right now.",
        )
    }

    /// Tiers 1-3 for a structured request.
    async fn resolve(&self, request: &RealTimeRequest) -> Option<HandlerResult> {
        let Some(subject) = request.subject() else {
            tracing::debug!(target: "herald::realtime", category = %request.category, "request without subject");
            return None;
        };
        let key = request.cache_key();

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(target: "herald::realtime", key = %key, "cache hit");
            return Some(
                HandlerResult::success(TaskCategory::RealTime, format!("cache:{}", hit.source))
                    .with_message(hit.message)
                    .with_data(hit.data),
            );
        }

        if request.category == RealTimeCategory::Time {
            if let Some(resolution) = timezones::resolve(subject) {
                let now = Utc::now();
                let answer = CachedAnswer {
                    message: resolution.render(now),
                    data: resolution.to_json(now),
                    source: TIMEZONE_SOURCE.to_string(),
                };
                self.cache.put(key, answer.clone(), TIME_TTL);
                return Some(answer_result(answer));
            }
        }

        let provider = self.providers.get(&request.category)?;
        let fetched = self
            .retry
            .run(provider.name(), || provider.fetch(&request.params))
            .await;
        let payload = match fetched {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    target: "herald::realtime",
                    provider = provider.name(),
                    category = %request.category,
                    error = %e,
                    "provider failed"
                );
                return None;
            }
        };
        match format::format_payload(request.category, &request.params, &payload, Utc::now()) {
            Ok(formatted) => {
                let answer = CachedAnswer {
                    message: formatted.message,
                    data: formatted.data,
                    source: provider.name().to_string(),
                };
                self.cache.put(key, answer.clone(), self.provider_ttl);
                Some(answer_result(answer))
            }
            Err(e) => {
                tracing::warn!(
                    target: "herald::realtime",
                    provider = provider.name(),
                    error = %e,
                    "provider payload unusable"
                );
                None
            }
        }
    }

    /// Tier 4. Only categories with a way to answer them are accepted.
    async fn categorize(&self, query: &str) -> Option<RealTimeRequest> {
        if !self.config.ai_categorization {
            return None;
        }
        let classifier = self.classifier.as_ref()?;
        let request = infer::infer_request(classifier.as_ref(), query).await?;
        let answerable = self.providers.contains_key(&request.category)
            || request.category == RealTimeCategory::Time;
        if !answerable {
            tracing::debug!(
                target: "herald::realtime",
                category = %request.category,
                "inferred category has no provider"
            );
            return None;
        }
        tracing::debug!(target: "herald::realtime", category = %request.category, "category inferred");
        Some(request)
    }

    /// Tier 5.
    async fn search_fallback(&self, query: &str) -> Option<HandlerResult> {
        let search = self.search.as_ref()?;
        if query.trim().is_empty() {
            return None;
        }
        let limit = self.config.fallback_results.max(1);
        let hits = match self.retry.run(search.name(), || search.search(query, limit)).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(target: "herald::realtime", provider = search.name(), error = %e, "fallback search failed");
                return None;
            }
        };
        let hits: Vec<_> = hits.into_iter().take(limit).collect();
        if hits.is_empty() {
            tracing::debug!(target: "herald::realtime", query, "fallback search returned nothing");
            return None;
        }
        Some(
            HandlerResult::partial(TaskCategory::RealTime, search.name())
                .with_message(format::web_results(query, &hits))
                .with_data(json!({ "query": query, "results": hits })),
        )
    }
}

fn answer_result(answer: CachedAnswer) -> HandlerResult {
    HandlerResult::success(TaskCategory::RealTime, answer.source)
        .with_message(answer.message)
        .with_data(answer.data)
}

/// Handler for `real_time` tasks.
pub struct RealTimeHandler {
    engine: Arc<RealTimeEngine>,
}

impl RealTimeHandler {
    pub fn new(engine: Arc<RealTimeEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for RealTimeHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::RealTime
    }

    async fn handle(&self, task: &Task, _ctx: &HandlerContext) -> HeraldResult<HandlerResult> {
        let request = shortcuts::from_details(&task.details).or_else(|| shortcuts::parse(&task.utterance));
        let query = task.detail("query").unwrap_or(task.utterance.trim());
        Ok(self.engine.answer(query, request).await)
    }
}
