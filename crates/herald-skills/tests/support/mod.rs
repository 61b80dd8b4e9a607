//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use herald_core::{
    CategoryProvider, CollaboratorError, ContentGenerator, Details, HeraldConfig, MessageDraft, MessagingProvider,
    PageReader, PageSummary, ReminderItem, ReminderStore, RetryPolicy, SearchHit, SearchProvider,
    SendReceipt, StructuredClassifier,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("herald=debug")
        .with_test_writer()
        .try_init();
}

/// Defaults with retries disabled so failure paths stay fast.
pub fn test_config() -> HeraldConfig {
    let mut config = HeraldConfig::default();
    config.retry = RetryPolicy::none();
    config
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub composed: AtomicUsize,
}

impl FakeMailer {
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MessagingProvider for FakeMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<SendReceipt, CollaboratorError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(SendReceipt {
            message_id: format!("msg-{}", sent.len()),
        })
    }

    async fn compose_draft(&self, topic: &str) -> Result<MessageDraft, CollaboratorError> {
        let n = self.composed.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageDraft {
            subject: format!("Draft {n}"),
            body: format!("Hello,\n\n{topic}\n\nBest"),
        })
    }
}

pub struct FakeSearch {
    pub hits: Vec<SearchHit>,
    pub calls: AtomicUsize,
}

impl FakeSearch {
    pub fn with_hits(titles: &[&str]) -> Self {
        Self {
            hits: titles
                .iter()
                .enumerate()
                .map(|(i, t)| SearchHit {
                    title: t.to_string(),
                    url: format!("https://example.com/{i}"),
                    snippet: format!("about {t}"),
                })
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::with_hits(&[])
    }
}

#[async_trait::async_trait]
impl SearchProvider for FakeSearch {
    fn name(&self) -> &str {
        "fake-search"
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

/// Category provider answering with a fixed payload or error.
pub struct FakeProvider {
    pub name: &'static str,
    pub reply: Result<serde_json::Value, CollaboratorError>,
    pub calls: AtomicUsize,
}

impl FakeProvider {
    pub fn ok(name: &'static str, payload: serde_json::Value) -> Self {
        Self {
            name,
            reply: Ok(payload),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            reply: Err(CollaboratorError::Rejected("upstream said no".into())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CategoryProvider for FakeProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, _params: &Details) -> Result<serde_json::Value, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

#[derive(Default)]
pub struct FakeReminders {
    pub items: Mutex<Vec<ReminderItem>>,
}

#[async_trait::async_trait]
impl ReminderStore for FakeReminders {
    async fn create(&self, item: ReminderItem) -> Result<String, CollaboratorError> {
        let mut items = self.items.lock().unwrap();
        items.push(item);
        Ok(format!("rem-{}", items.len()))
    }
}

/// Structured classifier that always answers with the same text.
pub struct ScriptedClassifier(pub String);

#[async_trait::async_trait]
impl StructuredClassifier for ScriptedClassifier {
    async fn classify(&self, _prompt: &str) -> Result<String, CollaboratorError> {
        Ok(self.0.clone())
    }
}

pub struct FakePages;

#[async_trait::async_trait]
impl PageReader for FakePages {
    async fn read(&self, url: &str) -> Result<PageSummary, CollaboratorError> {
        Ok(PageSummary {
            title: Some("Example".into()),
            summary: format!("Contents of {url}"),
        })
    }
}

/// Generator that answers every prompt with a fixed reply, or fails when built with `failing`.
pub struct FakeGenerator {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl ContentGenerator for FakeGenerator {
    async fn reply(&self, utterance: &str) -> Result<String, CollaboratorError> {
        self.prompts.lock().unwrap().push(utterance.to_string());
        self.reply
            .clone()
            .ok_or_else(|| CollaboratorError::Rejected("generator offline".into()))
    }
}
