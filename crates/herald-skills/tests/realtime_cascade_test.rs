//! Integration test: the real-time cascade tier by tier.
//!
//! ## Scenarios
//! 1. A repeated request is served from cache without calling the provider.
//! 2. An unknown place with a failing provider degrades to a partial web answer.
//! 3. Nothing to look up is invalid input.
//! 4. Model categorization routes an open question to the right provider.
//! 5. Inferred categories nobody can answer go straight to the fallback.
//! 6. Every tier failing yields external_unavailable.

mod support;

use herald_core::{
    ErrorKind, RealTimeCategory, RealTimeConfig, RealTimeRequest, ResultStatus, RetryPolicy, TtlCache,
};
use herald_skills::RealTimeEngine;
use std::sync::Arc;
use support::{init_tracing, FakeProvider, FakeSearch, ScriptedClassifier};

fn engine() -> RealTimeEngine {
    init_tracing();
    RealTimeEngine::new(Arc::new(TtlCache::new(64)), RealTimeConfig::default()).with_retry(RetryPolicy::none())
}

#[tokio::test]
async fn repeated_request_hits_cache() {
    let provider = Arc::new(FakeProvider::ok("fake-stocks", serde_json::json!({"price": 189.5, "change_percent": 1.25})));
    let engine = engine().with_provider(RealTimeCategory::Stocks, provider.clone());

    let first = engine.answer("what's $AAPL at", None).await;
    assert_eq!(first.status, ResultStatus::Success);
    assert_eq!(first.source, "fake-stocks");
    assert_eq!(first.message.as_deref(), Some("AAPL: $189.50 (+1.25%)"));

    let second = engine
        .answer("", Some(RealTimeRequest::new(RealTimeCategory::Stocks, "aapl")))
        .await;
    assert_eq!(second.source, "cache:fake-stocks");
    assert_eq!(second.message, first.message);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn unknown_place_degrades_to_partial_search() {
    let provider = Arc::new(FakeProvider::failing("fake-geo"));
    let search = Arc::new(FakeSearch::with_hits(&["Atlantis time", "Lost city", "Myths", "Extra"]));
    let engine = engine()
        .with_provider(RealTimeCategory::Time, provider.clone())
        .with_search(search);

    let result = engine.answer("what time is it in Atlantis", None).await;
    assert_eq!(provider.calls(), 1);
    assert_eq!(result.status, ResultStatus::Partial);
    assert_eq!(result.source, "fake-search");
    let results = result.data.unwrap()["results"].as_array().unwrap().len();
    assert_eq!(results, RealTimeConfig::default().fallback_results);
}

#[tokio::test]
async fn empty_query_is_invalid_input() {
    let result = engine().answer("   ", None).await;
    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::InvalidInput));
}

#[tokio::test]
async fn model_categorization_picks_provider() {
    let provider = Arc::new(FakeProvider::ok("fake-stocks", serde_json::json!({"price": 512.0})));
    let search = Arc::new(FakeSearch::with_hits(&["should not be used"]));
    let engine = engine()
        .with_provider(RealTimeCategory::Stocks, provider.clone())
        .with_search(search.clone())
        .with_classifier(Arc::new(ScriptedClassifier(
            r#"{"category": "stocks", "symbol": "SPY"}"#.into(),
        )));

    let result = engine.answer("how are the markets doing", None).await;
    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.message.as_deref(), Some("SPY: $512.00"));
    assert_eq!(provider.calls(), 1);
    assert_eq!(search.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn inferred_category_without_provider_falls_back() {
    let search = Arc::new(FakeSearch::with_hits(&["Mars rover news"]));
    let engine = engine()
        .with_search(search)
        .with_classifier(Arc::new(ScriptedClassifier(
            r#"{"category": "news", "params": {"topic": "mars rover"}}"#.into(),
        )));

    let result = engine.answer("anything new with the mars rover", None).await;
    assert_eq!(result.status, ResultStatus::Partial);
    assert!(result.message.unwrap().contains("Mars rover news"));
}

#[tokio::test]
async fn exhausted_tiers_are_external_unavailable() {
    let engine = engine()
        .with_provider(RealTimeCategory::News, Arc::new(FakeProvider::failing("fake-news")))
        .with_search(Arc::new(FakeSearch::empty()));

    let result = engine.answer("news about the eclipse", None).await;
    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::ExternalUnavailable));
    assert_eq!(
        result.message.as_deref(),
        Some("Sorry, I couldn't find current information for that right now.")
    );
}
