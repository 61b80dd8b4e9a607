//! Web scrape handler: read one page and summarize it.
//!
//! With a content generator the page text is summarized chunk by chunk; otherwise, or when
//! generation fails, the text is truncated.

use herald_core::{
    CapabilityHandler, ContentGenerator, HandlerContext, HandlerResult, HeraldError, HeraldResult, PageReader,
    RetryPolicy, Task, TaskCategory,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const HANDLER_NAME: &str = "web_scrape";
const SUMMARY_CHARS: usize = 1_000;
/// Words of page text sent to the generator per request.
const CHUNK_WORDS: usize = 1_500;

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("static url pattern"));

pub struct WebScrapeHandler {
    reader: Arc<dyn PageReader>,
    generator: Option<Arc<dyn ContentGenerator>>,
    retry: RetryPolicy,
}

impl WebScrapeHandler {
    pub fn new(reader: Arc<dyn PageReader>) -> Self {
        Self {
            reader,
            generator: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_generator(mut self, generator: Option<Arc<dyn ContentGenerator>>) -> Self {
        self.generator = generator;
        self
    }

    /// Model summary of `text`, one request per chunk. `None` when there is no generator or
    /// any chunk fails.
    async fn model_summary(&self, text: &str) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let mut parts = Vec::new();
        for chunk in chunk_words(text, CHUNK_WORDS) {
            let prompt = summary_prompt(&chunk);
            match self.retry.run("generator", || generator.reply(&prompt)).await {
                Ok(reply) if !reply.trim().is_empty() => parts.push(reply.trim().to_string()),
                Ok(_) => {
                    tracing::debug!(target: "herald::skills::web_scrape", "empty summary; truncating instead");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(target: "herald::skills::web_scrape", error = %e, "summary failed; truncating instead");
                    return None;
                }
            }
        }
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }
}

fn chunk_words(text: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(size.max(1)).map(|c| c.join(" ")).collect()
}

fn summary_prompt(chunk: &str) -> String {
    format!(
        "Summarize this web page content in a few sentences for a spoken reply. \
         Keep the key facts and names.\n\n{chunk}"
    )
}

fn target_url(task: &Task) -> Option<String> {
    let raw = task
        .detail("url")
        .map(str::to_string)
        .or_else(|| URL.find(&task.utterance).map(|m| m.as_str().to_string()))?;
    let url = raw.trim_end_matches(['.', ',', ')', ']', '>', '"', '\'', ';']);
    (url.starts_with("http://") || url.starts_with("https://")).then(|| url.to_string())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push('…');
    out
}

#[async_trait::async_trait]
impl CapabilityHandler for WebScrapeHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::WebScrape
    }

    async fn handle(&self, task: &Task, _ctx: &HandlerContext) -> HeraldResult<HandlerResult> {
        let url = target_url(task)
            .ok_or_else(|| HeraldError::InvalidInput("Which web page should I read? Please include the full link.".into()))?;
        let page = self
            .retry
            .run("page_reader", || self.reader.read(&url))
            .await
            .map_err(|e| {
                tracing::warn!(target: "herald::skills::web_scrape", url = %url, error = %e, "page read failed");
                HeraldError::unavailable("page_reader", &e)
            })?;

        let text = page.summary.trim();
        let (summary, summarized) = match self.model_summary(text).await {
            Some(summary) => (summary, true),
            None => (truncate(text, SUMMARY_CHARS), false),
        };
        let message = match page.title.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(title) => format!("{}: {}", title.trim(), summary),
            None => summary.clone(),
        };
        Ok(HandlerResult::success(TaskCategory::WebScrape, HANDLER_NAME)
            .with_message(message)
            .with_data(serde_json::json!({
                "url": url,
                "title": page.title,
                "summary": summary,
                "summarized": summarized,
            })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_from_details_or_utterance() {
        let t = Task::new(TaskCategory::WebScrape, "x").with_detail("url", "https://a.example/x");
        assert_eq!(target_url(&t).as_deref(), Some("https://a.example/x"));
        let t = Task::new(TaskCategory::WebScrape, "summarize http://b.example/post).");
        assert_eq!(target_url(&t).as_deref(), Some("http://b.example/post"));
        let t = Task::new(TaskCategory::WebScrape, "scrape that page");
        assert_eq!(target_url(&t), None);
    }

    #[test]
    fn text_is_chunked_by_words() {
        let chunks = chunk_words("a b c d e", 2);
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
        assert!(chunk_words("   ", 2).is_empty());
    }

    #[test]
    fn long_summaries_are_truncated() {
        let long = "a".repeat(SUMMARY_CHARS + 10);
        let out = truncate(&long, SUMMARY_CHARS);
        assert_eq!(out.chars().count(), SUMMARY_CHARS + 1);
        assert!(out.ends_with('…'));
    }
}
