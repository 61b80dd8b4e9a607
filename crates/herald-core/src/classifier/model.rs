//! Model-assisted classification: a fixed-schema prompt, then a tolerant parse of the reply.

use serde_json::Value;
use std::sync::Arc;

use crate::collaborators::StructuredClassifier;
use crate::types::{ClassificationResult, ClassifierStrategy, Details, Task, TaskCategory};

/// Longest utterance forwarded to the model.
const MAX_PROMPT_INPUT_CHARS: usize = 2000;

fn build_classification_prompt(utterance: &str) -> String {
    format!(
        r#"You are the request router of a voice assistant. Classify the user's request and reply with ONLY a JSON object, no prose.

Schema:
{{"type": "<TYPE>", "details": {{ ... }}}}

Types and their required details:
- REALTIME: current information (time, news, stocks, sports, flights). details: {{"query": "<what to look up>"}}
- WEBSEARCH: a general web search. details: {{"query": "<search terms>"}}
- EMAIL: write or send an email. details: {{"to": "<email address>", "topic": "<optional subject>"}}
- TODO: add a task or reminder. details: {{"query": "<the task>"}}
- WEATHER: weather for a place. details: {{"query": "<location>"}}
- WEBSCRAPE: read or summarize a web page. details: {{"url": "<http(s) url>"}}
- CONVERSATION: anything else. details: {{}}

Request:
"{}"
"#,
        utterance
    )
}

/// Detail field that must be present for the model's answer to be trusted.
pub fn required_detail(category: TaskCategory) -> Option<&'static str> {
    match category {
        TaskCategory::RealTime
        | TaskCategory::WebSearch
        | TaskCategory::Todo
        | TaskCategory::Weather => Some("query"),
        TaskCategory::Email => Some("to"),
        TaskCategory::WebScrape => Some("url"),
        TaskCategory::Conversation => None,
    }
}

/// The JSON object inside a model reply: strips ```json fences and surrounding prose.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        body = rest.trim_end().strip_suffix("```").unwrap_or(rest).trim();
    }
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

/// Flattens a JSON details object into string values. Nulls and empty strings are dropped.
pub fn details_from_json(value: &Value) -> Details {
    let mut out = Details::new();
    let Some(obj) = value.as_object() else {
        return out;
    };
    for (key, v) in obj {
        let text = match v {
            Value::Null => continue,
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        if !text.is_empty() {
            out.insert(key.clone(), text);
        }
    }
    out
}

/// Validates a raw model reply into a classification. Never fails; problems mark it invalid.
pub fn parse_classification(raw: &str, utterance: &str) -> ClassificationResult {
    let invalid = |reason: String| {
        tracing::debug!(
            target: "herald::classifier",
            response = %raw,
            reason = %reason,
            "model classification rejected"
        );
        ClassificationResult::invalid(utterance, ClassifierStrategy::ModelAssisted, reason)
    };

    let Some(json) = extract_json_object(raw) else {
        return invalid("no JSON object in response".into());
    };
    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => return invalid(format!("unparsable JSON: {e}")),
    };
    let Some(label) = value.get("type").and_then(Value::as_str) else {
        return invalid("missing \"type\"".into());
    };
    let Some(category) = TaskCategory::from_label(label) else {
        return invalid(format!("unknown type {label:?}"));
    };
    let details = value.get("details").map(details_from_json).unwrap_or_default();
    if let Some(field) = required_detail(category) {
        if !details.contains_key(field) {
            return invalid(format!("{} without required \"{field}\"", category.schema_label()));
        }
    }

    let mut task = Task::new(category, utterance.trim());
    task.details = details;
    ClassificationResult::valid(task, ClassifierStrategy::ModelAssisted)
}

/// Classification through the structured-classification collaborator.
#[derive(Clone)]
pub struct ModelClassifier {
    service: Arc<dyn StructuredClassifier>,
}

impl ModelClassifier {
    pub fn new(service: Arc<dyn StructuredClassifier>) -> Self {
        Self { service }
    }

    pub async fn classify(&self, utterance: &str) -> ClassificationResult {
        let trimmed = utterance.trim();
        if trimmed.is_empty() {
            return ClassificationResult::invalid(trimmed, ClassifierStrategy::ModelAssisted, "empty utterance");
        }
        let input: String = trimmed.chars().take(MAX_PROMPT_INPUT_CHARS).collect();
        let prompt = build_classification_prompt(&input);
        match self.service.classify(&prompt).await {
            Ok(raw) => parse_classification(&raw, trimmed),
            Err(e) => ClassificationResult::invalid(
                trimmed,
                ClassifierStrategy::ModelAssisted,
                format!("classification service failed: {e}"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences_and_prose() {
        let raw = "```json\n{\"type\": \"WEATHER\", \"details\": {\"query\": \"Oslo\"}}\n```";
        assert_eq!(
            extract_json_object(raw),
            Some("{\"type\": \"WEATHER\", \"details\": {\"query\": \"Oslo\"}}")
        );
        assert_eq!(extract_json_object("Sure! {\"a\":1} hope that helps"), Some("{\"a\":1}"));
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn valid_reply_becomes_task() {
        let r = parse_classification(
            r#"{"type":"EMAIL","details":{"to":"bob@example.com","topic":"lunch"}}"#,
            "email bob about lunch",
        );
        assert!(r.valid);
        assert_eq!(r.task.category, TaskCategory::Email);
        assert_eq!(r.task.detail("to"), Some("bob@example.com"));
        assert_eq!(r.task.detail("topic"), Some("lunch"));
    }

    #[test]
    fn missing_required_field_is_invalid() {
        let r = parse_classification(r#"{"type":"WEBSCRAPE","details":{}}"#, "scrape it");
        assert!(!r.valid);
        assert_eq!(r.task.category, TaskCategory::Conversation);
    }

    #[test]
    fn unknown_type_and_garbage_are_invalid() {
        assert!(!parse_classification(r#"{"type":"SPACESHIP","details":{}}"#, "x").valid);
        assert!(!parse_classification("{not json}", "x").valid);
        assert!(!parse_classification("", "x").valid);
    }

    #[test]
    fn conversation_needs_no_details() {
        let r = parse_classification(r#"{"type":"CONVERSATION"}"#, "hello there");
        assert!(r.valid);
        assert_eq!(r.task.category, TaskCategory::Conversation);
    }
}
