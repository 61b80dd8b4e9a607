//! Outbound messaging: draft, revise on request, and send only after confirmation.

use herald_core::{
    ConfirmableHandler, Details, HandlerContext, HandlerResult, HeraldError, HeraldResult,
    MessageDraft, MessagingProvider, PendingAction, PendingActionKind, RetryPolicy, SkillsConfig,
    Task, TaskCategory,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const HANDLER_NAME: &str = "messaging";

static EMAIL_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("static address pattern")
});

static TOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:about|regarding|re:|saying|that says)\s+(.+)$").expect("static topic pattern")
});

pub fn is_valid_address(address: &str) -> bool {
    EMAIL_ADDRESS.is_match(address.trim())
}

pub struct MessagingHandler {
    provider: Arc<dyn MessagingProvider>,
    retry: RetryPolicy,
    max_subject_chars: usize,
    max_body_chars: usize,
}

impl MessagingHandler {
    pub fn new(provider: Arc<dyn MessagingProvider>) -> Self {
        let limits = SkillsConfig::default();
        Self {
            provider,
            retry: RetryPolicy::default(),
            max_subject_chars: limits.max_subject_chars,
            max_body_chars: limits.max_body_chars,
        }
    }

    pub fn with_limits(mut self, config: &SkillsConfig) -> Self {
        self.max_subject_chars = config.max_subject_chars;
        self.max_body_chars = config.max_body_chars;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn compose(&self, prompt: &str) -> HeraldResult<MessageDraft> {
        let draft = self
            .retry
            .run("compose_draft", || self.provider.compose_draft(prompt))
            .await
            .map_err(|e| {
                tracing::warn!(target: "herald::skills::messaging", error = %e, "draft generation failed");
                HeraldError::unavailable("messaging", &e)
            })?;
        let subject: String = draft.subject.trim().chars().take(self.max_subject_chars).collect();
        let body = draft.body.trim().to_string();
        if body.is_empty() {
            return Err(HeraldError::failure(TaskCategory::Email, "empty draft body"));
        }
        Ok(MessageDraft { subject, body })
    }

    /// Checks address, subject and body limits before anything leaves the process.
    fn validate(&self, to: &str, subject: &str, body: &str) -> HeraldResult<()> {
        if !is_valid_address(to) {
            return Err(HeraldError::InvalidInput(format!(
                "\"{to}\" doesn't look like a valid email address."
            )));
        }
        if subject.trim().is_empty() || subject.chars().count() > self.max_subject_chars {
            return Err(HeraldError::InvalidInput(format!(
                "The subject must be between 1 and {} characters.",
                self.max_subject_chars
            )));
        }
        if body.trim().is_empty() || body.chars().count() > self.max_body_chars {
            return Err(HeraldError::InvalidInput(format!(
                "The message body must be between 1 and {} characters.",
                self.max_body_chars
            )));
        }
        Ok(())
    }
}

/// What the message is about: explicit `topic`, the phrase after "about …", or the whole request.
fn topic_of(task: &Task) -> String {
    if let Some(topic) = task.detail("topic") {
        return topic.to_string();
    }
    TOPIC
        .captures(&task.utterance)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_end_matches(['.', '!', '?']).to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| task.utterance.trim().to_string())
}

fn payload(to: &str, topic: &str, draft: MessageDraft) -> Details {
    let mut p = Details::new();
    p.insert("to".into(), to.to_string());
    p.insert("topic".into(), topic.to_string());
    p.insert("subject".into(), draft.subject);
    p.insert("body".into(), draft.body);
    p
}

fn field<'a>(payload: &'a Details, key: &str) -> &'a str {
    payload.get(key).map(String::as_str).unwrap_or_default()
}

#[async_trait::async_trait]
impl ConfirmableHandler for MessagingHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::Email
    }

    fn action_kind(&self) -> PendingActionKind {
        PendingActionKind::OutboundMessage
    }

    async fn draft(&self, task: &Task, _ctx: &HandlerContext) -> HeraldResult<Details> {
        let to = task.detail("to").ok_or_else(|| {
            HeraldError::InvalidInput(
                "Who should I send it to? Please include their email address.".into(),
            )
        })?;
        if !is_valid_address(to) {
            return Err(HeraldError::InvalidInput(format!(
                "\"{to}\" doesn't look like a valid email address."
            )));
        }
        let topic = topic_of(task);
        let draft = self.compose(&topic).await?;
        tracing::debug!(target: "herald::skills::messaging", to, subject = %draft.subject, "draft composed");
        Ok(payload(to, &topic, draft))
    }

    async fn revise(
        &self,
        action: &PendingAction,
        instruction: &str,
        _ctx: &HandlerContext,
    ) -> HeraldResult<Details> {
        let p = &action.payload;
        let prompt = format!(
            "Rewrite this email following the instruction.\nInstruction: {}\nSubject: {}\nBody:\n{}",
            instruction.trim(),
            field(p, "subject"),
            field(p, "body")
        );
        let draft = self.compose(&prompt).await?;
        Ok(payload(field(p, "to"), field(p, "topic"), draft))
    }

    async fn commit(&self, action: &PendingAction, _ctx: &HandlerContext) -> HeraldResult<HandlerResult> {
        let p = &action.payload;
        let (to, subject, body) = (field(p, "to"), field(p, "subject"), field(p, "body"));
        self.validate(to, subject, body)?;

        let receipt = self
            .retry
            .run("send", || self.provider.send(to, subject, body))
            .await
            .map_err(|e| {
                tracing::warn!(target: "herald::skills::messaging", to, error = %e, "send failed");
                HeraldError::unavailable("messaging", &e)
            })?;
        tracing::info!(
            target: "herald::skills::messaging",
            to,
            message_id = %receipt.message_id,
            "message sent"
        );
        Ok(HandlerResult::success(TaskCategory::Email, HANDLER_NAME)
            .with_message(format!("Done. Your email to {to} has been sent."))
            .with_data(serde_json::json!({
                "to": to,
                "subject": subject,
                "message_id": receipt.message_id,
            })))
    }

    fn render_draft(&self, payload: &Details) -> String {
        format!(
            "Here's the draft to {}:\nSubject: {}\n\n{}",
            field(payload, "to"),
            field(payload, "subject"),
            field(payload, "body")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_validation() {
        assert!(is_valid_address("alice@example.com"));
        assert!(is_valid_address("first.last+tag@mail.example.co.uk"));
        assert!(!is_valid_address("alice@localhost"));
        assert!(!is_valid_address("not an address"));
    }

    #[test]
    fn topic_prefers_about_phrase() {
        let t = Task::new(TaskCategory::Email, "email bob@example.com about the Friday offsite.")
            .with_detail("to", "bob@example.com");
        assert_eq!(topic_of(&t), "the Friday offsite");
        let t = Task::new(TaskCategory::Email, "email bob").with_detail("topic", "lunch");
        assert_eq!(topic_of(&t), "lunch");
    }
}
