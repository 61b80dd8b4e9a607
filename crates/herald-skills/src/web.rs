//! Plain-HTTP page reader: GET plus `scraper` text extraction for single pages.

use herald_core::{CollaboratorError, PageReader, PageSummary};
use std::time::Duration;

use crate::model_client::transport_error;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = "Herald/0.1 (voice assistant)";
/// Characters of page text kept in a summary.
const SUMMARY_CHARS: usize = 12_000;
/// Pages larger than this are refused.
pub const MAX_PAGE_BYTES: usize = 100_000;

/// Elements whose text is never part of the readable page.
const SKIPPED_ELEMENTS: [&str; 6] = ["script", "style", "nav", "footer", "iframe", "noscript"];

/// Page title and whitespace-collapsed body text, without scripts, styles or page chrome.
pub fn extract_title_and_text(html: &str) -> (Option<String>, String) {
    let doc = scraper::Html::parse_document(html);
    let title = scraper::Selector::parse("title").ok().and_then(|sel| {
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    });
    let root = scraper::Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .unwrap_or_else(|| doc.root_element());
    let mut pieces = Vec::new();
    collect_text(root, &mut pieces);
    let text = pieces.join(" ");
    (title, text.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn collect_text<'a>(el: scraper::ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in el.children() {
        if let Some(child_el) = scraper::ElementRef::wrap(child) {
            if !SKIPPED_ELEMENTS.contains(&child_el.value().name()) {
                collect_text(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push(&**text);
        }
    }
}

fn too_large(bytes: u64, max: usize) -> CollaboratorError {
    CollaboratorError::Rejected(format!("page is {bytes} bytes, over the {max} byte limit"))
}

/// Appends `chunk` unless the body would exceed `max` bytes.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], max: usize) -> Result<(), CollaboratorError> {
    let total = body.len() + chunk.len();
    if total > max {
        return Err(too_large(total as u64, max));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

/// Truncates page text to the summary budget, marking the cut with `…`.
fn summarize(text: &str) -> String {
    let mut summary: String = text.chars().take(SUMMARY_CHARS).collect();
    if summary.len() < text.len() {
        summary.push('…');
    }
    summary
}

pub struct HttpPageReader {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpPageReader {
    pub fn new() -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            max_bytes: MAX_PAGE_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait::async_trait]
impl PageReader for HttpPageReader {
    async fn read(&self, url: &str) -> Result<PageSummary, CollaboratorError> {
        let mut res = self.client.get(url).send().await.map_err(transport_error)?;
        let status = res.status();
        if !status.is_success() {
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                CollaboratorError::Unavailable(format!("HTTP {status}"))
            } else {
                CollaboratorError::Rejected(format!("HTTP {status} for {url}"))
            });
        }
        if let Some(declared) = res.content_length().filter(|len| *len > self.max_bytes as u64) {
            return Err(too_large(declared, self.max_bytes));
        }
        let mut body = Vec::new();
        while let Some(chunk) = res.chunk().await.map_err(transport_error)? {
            append_capped(&mut body, &chunk, self.max_bytes)?;
        }
        let html = String::from_utf8_lossy(&body);
        let (title, text) = extract_title_and_text(&html);
        if text.is_empty() {
            return Err(CollaboratorError::Malformed("page has no readable text".into()));
        }
        tracing::debug!(target: "herald::skills::web_scrape", url, chars = text.len(), "page fetched");
        Ok(PageSummary {
            title,
            summary: summarize(&text),
        })
    }
}
