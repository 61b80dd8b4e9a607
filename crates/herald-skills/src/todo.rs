//! Todo/reminder handler with light natural-language parsing of priority and due time.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use herald_core::{
    CapabilityHandler, HandlerContext, HandlerResult, HeraldError, HeraldResult, ReminderItem,
    ReminderStore, RetryPolicy, Task, TaskCategory,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const HANDLER_NAME: &str = "todo";

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static todo pattern")
}

static LEADING: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^\s*(?:please\s+)?(?:add(?:\s+a)?(?:\s+(?:todo|to-do|task|reminder))?(?:\s+to)?|remind me to|create a (?:todo|to-do|task|reminder)(?:\s+to)?|new (?:todo|to-do|task))(?:\s*:?\s+|\s*$)")
});
static TRAILING_LIST: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\s+(?:to|on)\s+(?:my|the)\s+(?:(?:todo|to-do|task|reminder)s?\s+)?list\b")
});
static IN_N: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\bin\s+(\d{1,4})\s+(minute|min|hour|hr|day)s?\b"));
static TODAY: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(?:today|tonight)\b"));
static TOMORROW: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\btomorrow\b"));
static HIGH: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(?:urgent(?:ly)?|asap|important|high priority)\b"));
static LOW: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(?:low priority|someday|whenever)\b"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Result of parsing a todo request.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTodo {
    pub title: String,
    pub priority: Priority,
    pub due: Option<DateTime<Utc>>,
}

/// Due time from relative phrases: `in N minutes|hours|days`, `tomorrow` (09:00 UTC next day),
/// `today`/`tonight` (end of the current UTC day).
pub fn parse_due(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(c) = IN_N.captures(text) {
        let n: i64 = c.get(1)?.as_str().parse().ok()?;
        let unit = c.get(2)?.as_str().to_lowercase();
        let delta = match unit.as_str() {
            "minute" | "min" => Duration::minutes(n),
            "hour" | "hr" => Duration::hours(n),
            _ => Duration::days(n),
        };
        return Some(now + delta);
    }
    if TOMORROW.is_match(text) {
        let day = (now + Duration::days(1)).date_naive();
        return Some(day.and_time(NaiveTime::from_hms_opt(9, 0, 0)?).and_utc());
    }
    if TODAY.is_match(text) {
        return Some(now.date_naive().and_time(NaiveTime::from_hms_opt(23, 59, 0)?).and_utc());
    }
    None
}

pub fn parse_priority(text: &str) -> Priority {
    if HIGH.is_match(text) {
        Priority::High
    } else if LOW.is_match(text) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

/// Title with request verbs, list phrases, timing and priority words removed.
fn clean_title(text: &str) -> String {
    let mut title = LEADING.replace(text, "").to_string();
    for re in [&*TRAILING_LIST, &*IN_N, &*TOMORROW, &*TODAY, &*HIGH, &*LOW] {
        title = re.replace_all(&title, "").to_string();
    }
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" ,", ",")
        .trim_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | ':' | '-'))
        .trim()
        .to_string()
}

pub fn parse_todo(task: &Task, now: DateTime<Utc>) -> Option<ParsedTodo> {
    let source = task.detail("query").unwrap_or(task.utterance.trim());
    let title = clean_title(source);
    if title.is_empty() {
        return None;
    }
    // Timing and priority may sit outside the extracted query, so look at the whole request.
    let whole = format!("{} {}", task.utterance, source);
    Some(ParsedTodo {
        title,
        priority: parse_priority(&whole),
        due: parse_due(&whole, now),
    })
}

pub struct TodoHandler {
    store: Arc<dyn ReminderStore>,
    retry: RetryPolicy,
}

impl TodoHandler {
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for TodoHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::Todo
    }

    async fn handle(&self, task: &Task, _ctx: &HandlerContext) -> HeraldResult<HandlerResult> {
        let now = Utc::now();
        let parsed = parse_todo(task, now)
            .ok_or_else(|| HeraldError::InvalidInput("What should I add to your list?".into()))?;

        let item = ReminderItem {
            title: parsed.title.clone(),
            description: task.utterance.trim().to_string(),
            due: parsed.due,
            priority: parsed.priority.as_str().to_string(),
            category: "task".to_string(),
            location: task.detail("location").map(str::to_string),
            created_at: now,
        };
        let id = self
            .retry
            .run("reminder_store", || self.store.create(item.clone()))
            .await
            .map_err(|e| {
                tracing::warn!(target: "herald::skills::todo", error = %e, "reminder create failed");
                HeraldError::unavailable("reminder_store", &e)
            })?;

        tracing::info!(target: "herald::skills::todo", id = %id, priority = parsed.priority.as_str(), "todo added");
        let message = match parsed.due {
            Some(due) => format!(
                "Added \"{}\" to your list, due {}.",
                parsed.title,
                due.format("%a %b %-d at %H:%M UTC")
            ),
            None => format!("Added \"{}\" to your list.", parsed.title),
        };
        Ok(HandlerResult::success(TaskCategory::Todo, HANDLER_NAME)
            .with_message(message)
            .with_data(serde_json::json!({
                "id": id,
                "title": item.title,
                "priority": item.priority,
                "due": item.due,
            })))
    }
}
