//! Free conversation: the default handler when nothing more specific applies.

use herald_core::{
    CapabilityHandler, ContentGenerator, HandlerContext, HandlerResult, HeraldError, HeraldResult,
    RetryPolicy, Task, TaskCategory,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const HANDLER_NAME: &str = "conversation";

static GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:hi|hello|hey|good (?:morning|afternoon|evening))\b").expect("static greeting pattern")
});
static THANKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:thanks|thank you|cheers)\b").expect("static thanks pattern"));

/// Reply used when no generator is available or it fails.
fn canned_reply(utterance: &str) -> &'static str {
    if GREETING.is_match(utterance) {
        "Hello! How can I help you today?"
    } else if THANKS.is_match(utterance) {
        "You're welcome!"
    } else {
        "I'm not sure how to help with that yet. You can ask me about the weather, the news, \
         search the web, add a todo, or send an email."
    }
}

pub struct ConversationHandler {
    generator: Option<Arc<dyn ContentGenerator>>,
    retry: RetryPolicy,
}

impl ConversationHandler {
    pub fn new(generator: Option<Arc<dyn ContentGenerator>>) -> Self {
        Self {
            generator,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait::async_trait]
impl CapabilityHandler for ConversationHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::Conversation
    }

    async fn handle(&self, task: &Task, _ctx: &HandlerContext) -> HeraldResult<HandlerResult> {
        let utterance = task.utterance.trim();
        if utterance.is_empty() {
            return Err(HeraldError::InvalidInput(
                "I didn't catch that. Could you say it again?".into(),
            ));
        }

        if let Some(generator) = &self.generator {
            match self.retry.run("content_generator", || generator.reply(utterance)).await {
                Ok(reply) if !reply.trim().is_empty() => {
                    return Ok(HandlerResult::success(TaskCategory::Conversation, HANDLER_NAME)
                        .with_message(reply.trim()));
                }
                Ok(_) => {
                    tracing::debug!(target: "herald::skills::conversation", "empty generated reply");
                }
                Err(e) => {
                    tracing::warn!(target: "herald::skills::conversation", error = %e, "reply generation failed");
                }
            }
        }
        Ok(HandlerResult::success(TaskCategory::Conversation, HANDLER_NAME)
            .with_message(canned_reply(utterance)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn canned_replies_without_generator() {
        let h = ConversationHandler::new(None);
        let ctx = HandlerContext::new("c", false);
        let r = h.handle(&Task::conversation("hello there"), &ctx).await.unwrap();
        assert_eq!(r.message.as_deref(), Some("Hello! How can I help you today?"));
        let r = h.handle(&Task::conversation("thanks!"), &ctx).await.unwrap();
        assert_eq!(r.message.as_deref(), Some("You're welcome!"));
    }

    #[tokio::test]
    async fn empty_utterance_is_invalid_input() {
        let h = ConversationHandler::new(None);
        let err = h
            .handle(&Task::conversation("  "), &HandlerContext::new("c", false))
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::InvalidInput(_)));
    }
}
