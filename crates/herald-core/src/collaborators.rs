//! Narrow interfaces to the external services Herald depends on.
//!
//! Implementations (mail APIs, search engines, weather/news feeds, model endpoints) live
//! outside the core and are injected at startup. Every call is a suspension point and the
//! only place a handler may block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::types::Details;

/// Subject/body pair produced by content generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub subject: String,
    pub body: String,
}

/// Provider acknowledgement for a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
}

#[async_trait::async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<SendReceipt, CollaboratorError>;

    /// Generates a subject and body for the given topic or revision instruction.
    async fn compose_draft(&self, topic: &str) -> Result<MessageDraft, CollaboratorError>;
}

/// Model endpoint asked to answer with a JSON object. Output is untrusted text.
#[async_trait::async_trait]
pub trait StructuredClassifier: Send + Sync {
    async fn classify(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// Free-form reply generation for conversation turns.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn reply(&self, utterance: &str) -> Result<String, CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Ordered results, best first, at most `limit` long.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, CollaboratorError>;
}

/// Data feed for one real-time category (weather, news, stocks, sports, flights,
/// geocoding + time).
#[async_trait::async_trait]
pub trait CategoryProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, params: &Details) -> Result<serde_json::Value, CollaboratorError>;
}

/// Todo/reminder item handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    pub priority: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait ReminderStore: Send + Sync {
    /// Persists the item; returns an opaque id.
    async fn create(&self, item: ReminderItem) -> Result<String, CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    #[serde(default)]
    pub title: Option<String>,
    pub summary: String,
}

/// Fetches a single page and returns a readable summary.
#[async_trait::async_trait]
pub trait PageReader: Send + Sync {
    async fn read(&self, url: &str) -> Result<PageSummary, CollaboratorError>;
}
