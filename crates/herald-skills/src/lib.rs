//! Herald capability handlers and the wiring that turns collaborators into a ready assistant.
//!
//! Handlers for conversation, real-time information and weather are always registered; the
//! others are registered only when their collaborator is present, so a missing backend
//! degrades to the conversation fallback instead of failing at startup.

pub mod conversation;
pub mod messaging;
pub mod model_client;
pub mod realtime;
pub mod todo;
pub mod weather;
pub mod web;
pub mod web_scrape;
pub mod web_search;

pub use conversation::ConversationHandler;
pub use messaging::MessagingHandler;
pub use model_client::{LlmMode, ModelClient};
pub use realtime::{CachedAnswer, RealTimeEngine, RealTimeHandler};
pub use todo::TodoHandler;
pub use weather::WeatherHandler;
pub use web::HttpPageReader;
pub use web_scrape::WebScrapeHandler;
pub use web_search::WebSearchHandler;

use herald_core::{
    Assistant, CategoryProvider, ContentGenerator, HandlerRegistry, HeraldConfig,
    MessagingProvider, PageReader, RealTimeCategory, ReminderStore, SearchProvider,
    StructuredClassifier, TtlCache,
};
use std::collections::HashMap;
use std::sync::Arc;

/// External services the handlers talk to. Every field is optional.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub messaging: Option<Arc<dyn MessagingProvider>>,
    pub search: Option<Arc<dyn SearchProvider>>,
    pub pages: Option<Arc<dyn PageReader>>,
    pub reminders: Option<Arc<dyn ReminderStore>>,
    pub generator: Option<Arc<dyn ContentGenerator>>,
    pub classifier: Option<Arc<dyn StructuredClassifier>>,
    pub providers: HashMap<RealTimeCategory, Arc<dyn CategoryProvider>>,
}

impl Collaborators {
    /// Model client (mock unless `HERALD_LLM_MODE=live`) and the HTTP page reader. Messaging,
    /// search, reminders and category providers are left to the embedder.
    pub fn from_env() -> Self {
        let model = Arc::new(ModelClient::from_env());
        tracing::info!(target: "herald::skills", mode = ?model.mode(), "model client configured");
        let pages = match HttpPageReader::new() {
            Ok(reader) => Some(Arc::new(reader) as Arc<dyn PageReader>),
            Err(e) => {
                tracing::warn!(target: "herald::skills", error = %e, "page reader unavailable");
                None
            }
        };
        Self {
            pages,
            generator: Some(model.clone()),
            classifier: Some(model),
            ..Self::default()
        }
    }

    pub fn with_messaging(mut self, provider: Arc<dyn MessagingProvider>) -> Self {
        self.messaging = Some(provider);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_pages(mut self, pages: Arc<dyn PageReader>) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn with_reminders(mut self, store: Arc<dyn ReminderStore>) -> Self {
        self.reminders = Some(store);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn StructuredClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_provider(mut self, category: RealTimeCategory, provider: Arc<dyn CategoryProvider>) -> Self {
        self.providers.insert(category, provider);
        self
    }
}

/// The real-time engine shared by the real-time and weather handlers.
pub fn build_engine(config: &HeraldConfig, collaborators: &Collaborators) -> RealTimeEngine {
    let cache = Arc::new(TtlCache::new(config.cache.capacity));
    let mut engine = RealTimeEngine::new(cache, config.realtime.clone())
        .with_providers(collaborators.providers.clone())
        .with_retry(config.retry.clone())
        .with_provider_ttl(config.cache.provider_ttl());
    if let Some(search) = &collaborators.search {
        engine = engine.with_search(search.clone());
    }
    if config.realtime.ai_categorization {
        if let Some(classifier) = &collaborators.classifier {
            engine = engine.with_classifier(classifier.clone());
        }
    }
    engine
}

pub fn build_registry(config: &HeraldConfig, collaborators: &Collaborators) -> HandlerRegistry {
    let retry = config.retry.clone();
    let engine = Arc::new(build_engine(config, collaborators));
    let mut registry = HandlerRegistry::new();

    registry.register(Arc::new(
        ConversationHandler::new(collaborators.generator.clone()).with_retry(retry.clone()),
    ));
    registry.register(Arc::new(RealTimeHandler::new(engine.clone())));
    registry.register(Arc::new(WeatherHandler::new(engine)));

    if let Some(search) = &collaborators.search {
        registry.register(Arc::new(
            WebSearchHandler::new(search.clone())
                .with_retry(retry.clone())
                .with_max_results(config.skills.max_search_results),
        ));
    }
    if let Some(pages) = &collaborators.pages {
        registry.register(Arc::new(
            WebScrapeHandler::new(pages.clone())
                .with_generator(collaborators.generator.clone())
                .with_retry(retry.clone()),
        ));
    }
    if let Some(store) = &collaborators.reminders {
        registry.register(Arc::new(TodoHandler::new(store.clone()).with_retry(retry.clone())));
    }
    if let Some(provider) = &collaborators.messaging {
        registry.register_confirmable(Arc::new(
            MessagingHandler::new(provider.clone())
                .with_limits(&config.skills)
                .with_retry(retry),
        ));
    }

    let categories: Vec<&str> = registry.categories().iter().map(|c| c.as_str()).collect();
    tracing::info!(target: "herald::skills", ?categories, "handlers registered");
    registry
}

pub fn build_assistant(config: &HeraldConfig, collaborators: Collaborators) -> Assistant {
    let registry = build_registry(config, &collaborators);
    Assistant::new(config, registry, collaborators.classifier)
}
