//! Shared data model: tasks, classification output, handler results and real-time requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ErrorKind, HeraldError};

/// Parameters extracted from an utterance (e.g. `query`, `to`, `url`).
pub type Details = BTreeMap<String, String>;

/// Task category. One capability handler is registered per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    WebSearch,
    RealTime,
    Email,
    Todo,
    Weather,
    WebScrape,
    Conversation,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 7] = [
        TaskCategory::WebSearch,
        TaskCategory::RealTime,
        TaskCategory::Email,
        TaskCategory::Todo,
        TaskCategory::Weather,
        TaskCategory::WebScrape,
        TaskCategory::Conversation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::WebSearch => "web_search",
            TaskCategory::RealTime => "real_time",
            TaskCategory::Email => "email",
            TaskCategory::Todo => "todo",
            TaskCategory::Weather => "weather",
            TaskCategory::WebScrape => "web_scrape",
            TaskCategory::Conversation => "conversation",
        }
    }

    /// Upper-case label used in the structured-classification schema.
    pub fn schema_label(&self) -> &'static str {
        match self {
            TaskCategory::WebSearch => "WEBSEARCH",
            TaskCategory::RealTime => "REALTIME",
            TaskCategory::Email => "EMAIL",
            TaskCategory::Todo => "TODO",
            TaskCategory::Weather => "WEATHER",
            TaskCategory::WebScrape => "WEBSCRAPE",
            TaskCategory::Conversation => "CONVERSATION",
        }
    }

    /// Parses snake_case, kebab-case or schema labels (`web_search`, `WEBSEARCH`, `web-search`).
    pub fn from_label(label: &str) -> Option<Self> {
        let norm: String = label
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match norm.as_str() {
            "websearch" | "search" => Some(TaskCategory::WebSearch),
            "realtime" => Some(TaskCategory::RealTime),
            "email" | "messaging" | "message" => Some(TaskCategory::Email),
            "todo" | "reminder" => Some(TaskCategory::Todo),
            "weather" => Some(TaskCategory::Weather),
            "webscrape" | "scrape" => Some(TaskCategory::WebScrape),
            "conversation" | "chat" => Some(TaskCategory::Conversation),
            _ => None,
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified unit of work. Immutable once handed to the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub category: TaskCategory,
    #[serde(default)]
    pub details: Details,
    /// The raw utterance the task was classified from.
    #[serde(default)]
    pub utterance: String,
}

impl Task {
    pub fn new(category: TaskCategory, utterance: impl Into<String>) -> Self {
        Self {
            category,
            details: Details::new(),
            utterance: utterance.into(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn conversation(utterance: impl Into<String>) -> Self {
        Self::new(TaskCategory::Conversation, utterance)
    }

    /// Non-empty detail value, trimmed.
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .get(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Which classification strategy to run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierStrategy {
    #[default]
    RuleBased,
    ModelAssisted,
}

/// Classifier output: the task plus whether the producing strategy trusted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub task: Task,
    pub valid: bool,
    pub strategy: ClassifierStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ClassificationResult {
    pub fn valid(task: Task, strategy: ClassifierStrategy) -> Self {
        Self {
            task,
            valid: true,
            strategy,
            reason: None,
        }
    }

    /// Invalid result; the task falls back to conversation so it is still routable.
    pub fn invalid(utterance: &str, strategy: ClassifierStrategy, reason: impl Into<String>) -> Self {
        Self {
            task: Task::conversation(utterance),
            valid: false,
            strategy,
            reason: Some(reason.into()),
        }
    }
}

/// Outcome status of a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    /// Best-effort answer with lower confidence than a structured one.
    Partial,
    Error,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Success => "success",
            ResultStatus::Partial => "partial",
            ResultStatus::Error => "error",
        }
    }
}

/// Uniform return shape of every handler and of the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    pub status: ResultStatus,
    pub category: TaskCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Natural-language rendering of the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl HandlerResult {
    pub fn success(category: TaskCategory, source: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Success,
            category,
            data: None,
            message: None,
            source: source.into(),
            timestamp: Utc::now(),
            error_kind: None,
        }
    }

    pub fn partial(category: TaskCategory, source: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Partial,
            ..Self::success(category, source)
        }
    }

    pub fn error(category: TaskCategory, source: impl Into<String>, err: &HeraldError) -> Self {
        Self::error_message(category, source, err.kind(), err.user_message())
    }

    pub fn error_message(
        category: TaskCategory,
        source: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: ResultStatus::Error,
            category,
            data: None,
            message: Some(message.into()),
            source: source.into(),
            timestamp: Utc::now(),
            error_kind: Some(kind),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ResultStatus::Error
    }
}

/// Category of a "what is happening now" query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealTimeCategory {
    Time,
    Weather,
    News,
    Stocks,
    Sports,
    Flights,
}

impl RealTimeCategory {
    pub const ALL: [RealTimeCategory; 6] = [
        RealTimeCategory::Time,
        RealTimeCategory::Weather,
        RealTimeCategory::News,
        RealTimeCategory::Stocks,
        RealTimeCategory::Sports,
        RealTimeCategory::Flights,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RealTimeCategory::Time => "time",
            RealTimeCategory::Weather => "weather",
            RealTimeCategory::News => "news",
            RealTimeCategory::Stocks => "stocks",
            RealTimeCategory::Sports => "sports",
            RealTimeCategory::Flights => "flights",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "time" | "clock" => Some(RealTimeCategory::Time),
            "weather" => Some(RealTimeCategory::Weather),
            "news" => Some(RealTimeCategory::News),
            "stocks" | "stock" => Some(RealTimeCategory::Stocks),
            "sports" | "sport" => Some(RealTimeCategory::Sports),
            "flights" | "flight" => Some(RealTimeCategory::Flights),
            _ => None,
        }
    }

    /// Parameter that must be present for a request of this category.
    pub fn required_field(&self) -> &'static str {
        match self {
            RealTimeCategory::Time | RealTimeCategory::Weather => "location",
            RealTimeCategory::News => "topic",
            RealTimeCategory::Stocks => "symbol",
            RealTimeCategory::Sports => "team",
            RealTimeCategory::Flights => "number",
        }
    }
}

impl fmt::Display for RealTimeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured real-time request, from classification or a rule-based shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealTimeRequest {
    pub category: RealTimeCategory,
    #[serde(default)]
    pub params: Details,
}

impl RealTimeRequest {
    /// Request with its required field set to `subject`.
    pub fn new(category: RealTimeCategory, subject: impl Into<String>) -> Self {
        let mut params = Details::new();
        params.insert(category.required_field().to_string(), subject.into());
        Self { category, params }
    }

    /// Value of the category's required field, trimmed; `None` when missing or blank.
    pub fn subject(&self) -> Option<&str> {
        self.params
            .get(self.category.required_field())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Cache key: category plus the normalized subject (lower-cased, whitespace collapsed).
    pub fn cache_key(&self) -> String {
        let subject = self
            .subject()
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        format!("{}:{}", self.category.as_str(), subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_parse_in_all_spellings() {
        assert_eq!(TaskCategory::from_label("WEBSEARCH"), Some(TaskCategory::WebSearch));
        assert_eq!(TaskCategory::from_label("web_search"), Some(TaskCategory::WebSearch));
        assert_eq!(TaskCategory::from_label("Real-Time"), Some(TaskCategory::RealTime));
        assert_eq!(TaskCategory::from_label("EMAIL"), Some(TaskCategory::Email));
        assert_eq!(TaskCategory::from_label("gibberish"), None);
        for c in TaskCategory::ALL {
            assert_eq!(TaskCategory::from_label(c.schema_label()), Some(c));
            assert_eq!(TaskCategory::from_label(c.as_str()), Some(c));
        }
    }

    #[test]
    fn cache_key_normalizes_subject() {
        let a = RealTimeRequest::new(RealTimeCategory::Time, "  New   York ");
        let b = RealTimeRequest::new(RealTimeCategory::Time, "new york");
        assert_eq!(a.cache_key(), "time:new york");
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn result_status_serializes_lowercase() {
        let r = HandlerResult::partial(TaskCategory::RealTime, "search");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "partial");
        assert_eq!(v["category"], "real_time");
    }
}
