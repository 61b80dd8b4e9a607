//! Keyword-gated classification. Groups are tested in a fixed order and the first match wins;
//! a secondary pattern then pulls the main parameter out of the original-case text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ClassificationResult, ClassifierStrategy, Task, TaskCategory};

struct KeywordGroup {
    category: TaskCategory,
    keywords: Regex,
    extract: Option<(Regex, &'static str)>,
    clean: fn(&str) -> String,
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("static classifier pattern")
}

/// `\b(?:a|b|c)` over the keywords: matches at the start of a word.
fn keywords(words: &[&str]) -> Regex {
    keywords_with_whole(words, &[])
}

/// As [`keywords`], plus `whole` words that must also end at a word boundary.
fn keywords_with_whole(prefixes: &[&str], whole: &[&str]) -> Regex {
    let alternation = prefixes
        .iter()
        .map(|w| regex::escape(w))
        .chain(whole.iter().map(|w| format!(r"{}\b", regex::escape(w))))
        .collect::<Vec<_>>()
        .join("|");
    pattern(&format!(r"\b(?:{alternation})"))
}

static GROUPS: Lazy<Vec<KeywordGroup>> = Lazy::new(|| {
    vec![
        KeywordGroup {
            category: TaskCategory::Weather,
            keywords: keywords(&["weather", "temperature", "forecast"]),
            extract: Some((
                pattern(r"(?i)\b(?:weather|temperature|forecast)\b.*?\b(?:in|at|for)\s+([\w\s,'.-]+)"),
                "query",
            )),
            clean: clean_place,
        },
        KeywordGroup {
            category: TaskCategory::Email,
            keywords: keywords(&["email", "e-mail", "send mail", "compose"]),
            extract: Some((
                pattern(r"([A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+)"),
                "to",
            )),
            clean: clean_plain,
        },
        KeywordGroup {
            category: TaskCategory::WebSearch,
            keywords: keywords(&["search", "lookup", "look up", "find information"]),
            extract: Some((pattern(r"(?i)\bfor\s+([\w\s'.-]+)"), "query")),
            clean: clean_plain,
        },
        KeywordGroup {
            category: TaskCategory::WebScrape,
            keywords: keywords(&["scrape", "extract", "analyze url", "analyse url", "summarize http"]),
            extract: Some((pattern(r"(https?://\S+)"), "url")),
            clean: clean_url,
        },
        KeywordGroup {
            category: TaskCategory::Todo,
            keywords: keywords(&["todo", "to-do", "task", "reminder", "remind me"]),
            extract: Some((pattern(r"(?i)\b(?:add|remind me to)\s+([\w\s'.:-]+)"), "query")),
            clean: clean_todo,
        },
        KeywordGroup {
            category: TaskCategory::RealTime,
            keywords: keywords_with_whole(
                &[
                    "realtime",
                    "real-time",
                    "current",
                    "latest",
                    "today's",
                    "what time",
                    "headlines",
                    "stock price",
                    "score of",
                ],
                &["now", "news"],
            ),
            extract: Some((pattern(r"(?i)\binformation (?:on|about)\s+([\w\s'.-]+)"), "query")),
            clean: clean_plain,
        },
    ]
});

static TRAILING_WHEN: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\s+(?:(?:for|on)\s+)?(?:right now|now|today|tonight|tomorrow|(?:this|next) (?:morning|afternoon|evening|week|weekend))$")
});

/// A time phrase before the place, as in "forecast for tomorrow in Paris". Matches the whole
/// value when no place follows.
static LEADING_WHEN: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:right now|now|today|tonight|tomorrow|(?:this|next) (?:morning|afternoon|evening|week|weekend))(?:\s+(?:in|at|for)\s+|\s*$)")
});

static TRAILING_LIST: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\s+(?:to|on)\s+(?:my|the)\s+(?:(?:todo|to-do|task|reminder)s?\s+)?list$")
});

fn clean_plain(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | '?' | '!' | ';'))
        .trim()
        .to_string()
}

fn clean_place(raw: &str) -> String {
    let mut place = clean_plain(raw);
    while let Some(m) = LEADING_WHEN.find(&place) {
        place = clean_plain(&place[m.end()..]);
    }
    while let Some(m) = TRAILING_WHEN.find(&place) {
        place.truncate(m.start());
        place = clean_plain(&place);
    }
    place
}

fn clean_url(raw: &str) -> String {
    raw.trim_end_matches(|c: char| matches!(c, '.' | ',' | ')' | ']' | '>' | '"' | '\'' | ';'))
        .to_string()
}

fn clean_todo(raw: &str) -> String {
    let item = clean_plain(raw);
    match TRAILING_LIST.find(&item) {
        Some(m) => clean_plain(&item[..m.start()]),
        None => item,
    }
}

/// Rule-based classifier. Stateless; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, utterance: &str) -> ClassificationResult {
        let task = self.task_for(utterance);
        tracing::debug!(
            target: "herald::classifier",
            category = %task.category,
            details = task.details.len(),
            "rule-based classification"
        );
        ClassificationResult::valid(task, ClassifierStrategy::RuleBased)
    }

    fn task_for(&self, utterance: &str) -> Task {
        let trimmed = utterance.trim();
        if trimmed.is_empty() {
            return Task::conversation(trimmed);
        }
        let lowered = trimmed.to_lowercase();
        let Some(group) = GROUPS.iter().find(|g| g.keywords.is_match(&lowered)) else {
            return Task::conversation(trimmed);
        };

        let mut task = Task::new(group.category, trimmed);
        if let Some((re, key)) = &group.extract {
            let value = re
                .captures(trimmed)
                .and_then(|c| c.get(1))
                .map(|m| (group.clean)(m.as_str()))
                .filter(|v| !v.is_empty());
            if let Some(value) = value {
                task.details.insert((*key).to_string(), value);
            }
        }
        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Task {
        RuleClassifier::new().classify(text).task
    }

    #[test]
    fn weather_extracts_location_in_original_case() {
        let t = classify("What's the weather in Tokyo?");
        assert_eq!(t.category, TaskCategory::Weather);
        assert_eq!(t.detail("query"), Some("Tokyo"));

        let t = classify("forecast for New York tomorrow");
        assert_eq!(t.detail("query"), Some("New York"));

        let t = classify("weather for tomorrow in Paris");
        assert_eq!(t.detail("query"), Some("Paris"));

        let t = classify("what's the forecast for this weekend in Berlin");
        assert_eq!(t.detail("query"), Some("Berlin"));

        let t = classify("weather in Lisbon for tomorrow");
        assert_eq!(t.detail("query"), Some("Lisbon"));

        let t = classify("weather for tomorrow");
        assert_eq!(t.category, TaskCategory::Weather);
        assert!(t.details.is_empty());
    }

    #[test]
    fn weather_without_place_keeps_category() {
        let t = classify("how's the weather");
        assert_eq!(t.category, TaskCategory::Weather);
        assert!(t.details.is_empty());
    }

    #[test]
    fn email_extracts_address() {
        let t = classify("Send an email to alice@example.com about the meeting");
        assert_eq!(t.category, TaskCategory::Email);
        assert_eq!(t.detail("to"), Some("alice@example.com"));

        let t = classify("compose an email to my boss");
        assert_eq!(t.category, TaskCategory::Email);
        assert!(t.details.is_empty());
    }

    #[test]
    fn search_scrape_todo_and_realtime() {
        let t = classify("search the web for rust async tutorials");
        assert_eq!(t.category, TaskCategory::WebSearch);
        assert_eq!(t.detail("query"), Some("rust async tutorials"));

        let t = classify("scrape https://example.com/page.");
        assert_eq!(t.category, TaskCategory::WebScrape);
        assert_eq!(t.detail("url"), Some("https://example.com/page"));

        let t = classify("add buy milk to my todo list");
        assert_eq!(t.category, TaskCategory::Todo);
        assert_eq!(t.detail("query"), Some("buy milk"));

        let t = classify("latest information on the mars rover");
        assert_eq!(t.category, TaskCategory::RealTime);
        assert_eq!(t.detail("query"), Some("the mars rover"));
    }

    #[test]
    fn first_group_wins() {
        // Weather outranks real-time even though "current" is present.
        assert_eq!(classify("current weather in Paris").category, TaskCategory::Weather);
        // Email outranks search.
        assert_eq!(
            classify("email bob@example.com the search results").category,
            TaskCategory::Email
        );
    }

    #[test]
    fn keywords_match_at_word_start() {
        // "snowfall" must not trigger "now"; "research" must not trigger "search".
        assert_eq!(classify("I like snowfall").category, TaskCategory::Conversation);
        assert_eq!(classify("tell me about research").category, TaskCategory::Conversation);
        // "now" and "news" are whole words only.
        assert_eq!(classify("that road goes nowhere").category, TaskCategory::Conversation);
        assert_eq!(classify("nowadays I read the newsletter").category, TaskCategory::Conversation);
        assert_eq!(classify("what's happening now").category, TaskCategory::RealTime);
    }

    #[test]
    fn empty_input_is_conversation() {
        let t = classify("   ");
        assert_eq!(t.category, TaskCategory::Conversation);
        assert!(t.details.is_empty());
    }
}
