//! Two-state confirmation flow for actions that must be reviewed before they execute.
//!
//! `NONE` → (draft) → `PENDING`; from `PENDING` a confirm signal commits, a cancel signal
//! discards, an edit signal revises in place. Any other utterance is reclassified normally
//! with the draft left untouched.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::ConfirmationConfig;
use crate::error::{HeraldError, HeraldResult};
use crate::handler::{ConfirmableHandler, HandlerContext, HandlerRegistry};
use crate::router::{Router, ROUTER_SOURCE};
use crate::session::SessionState;
use crate::types::{Details, HandlerResult, Task, TaskCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingActionKind {
    OutboundMessage,
}

impl PendingActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingActionKind::OutboundMessage => "outbound_message",
        }
    }
}

/// A drafted action awaiting the user's decision. At most one per conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: Uuid,
    pub kind: PendingActionKind,
    /// Category whose confirmable handler owns this action.
    pub category: TaskCategory,
    pub payload: Details,
    pub created_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn new(kind: PendingActionKind, category: TaskCategory, payload: Details) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            category,
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return false;
        };
        now - self.created_at > ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfirmationState {
    None,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationSignal {
    Confirm,
    Cancel,
    Edit,
}

/// Keyword matcher for confirmation signals. Tested in order confirm, cancel, edit.
#[derive(Debug, Clone)]
pub struct SignalDetector {
    confirm: Option<Regex>,
    cancel: Option<Regex>,
    edit: Option<Regex>,
}

impl SignalDetector {
    pub fn new(config: &ConfirmationConfig) -> Self {
        Self {
            confirm: keyword_regex(&config.confirm_keywords),
            cancel: keyword_regex(&config.cancel_keywords),
            edit: keyword_regex(&config.edit_keywords),
        }
    }

    pub fn detect(&self, utterance: &str) -> Option<ConfirmationSignal> {
        let text = utterance.to_lowercase();
        let hit = |re: &Option<Regex>| re.as_ref().is_some_and(|r| r.is_match(&text));
        if hit(&self.confirm) {
            Some(ConfirmationSignal::Confirm)
        } else if hit(&self.cancel) {
            Some(ConfirmationSignal::Cancel)
        } else if hit(&self.edit) {
            Some(ConfirmationSignal::Edit)
        } else {
            None
        }
    }
}

/// Word-prefix alternation over the keywords; `None` when the list is empty.
fn keyword_regex(keywords: &[String]) -> Option<Regex> {
    let alternation = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .map(|k| regex::escape(&k))
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        return None;
    }
    match Regex::new(&format!(r"\b(?:{alternation})")) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(target: "herald::confirmation", error = %e, "invalid confirmation keywords");
            None
        }
    }
}

/// What the machine did with an utterance that arrived while a draft may be pending.
#[derive(Debug)]
pub enum Intercept {
    /// The utterance was a confirmation signal; this is the turn's result.
    Handled(HandlerResult),
    /// Not a signal (or nothing pending): classify and route as usual.
    Reclassify,
}

pub struct ConfirmationMachine {
    detector: SignalDetector,
    pending_ttl: Duration,
}

impl ConfirmationMachine {
    pub fn new(config: &ConfirmationConfig) -> Self {
        Self {
            detector: SignalDetector::new(config),
            pending_ttl: config.pending_ttl(),
        }
    }

    pub fn state(session: &SessionState) -> ConfirmationState {
        if session.pending.is_some() {
            ConfirmationState::Pending
        } else {
            ConfirmationState::None
        }
    }

    /// Steps the machine for `utterance`. Expired drafts are dropped first.
    pub async fn intercept(
        &self,
        session: &mut SessionState,
        utterance: &str,
        router: &Router,
        registry: &HandlerRegistry,
        ctx: &HandlerContext,
    ) -> Intercept {
        self.expire(session, ctx);
        let Some(pending) = session.pending.clone() else {
            return Intercept::Reclassify;
        };
        let Some(signal) = self.detector.detect(utterance) else {
            tracing::debug!(
                target: "herald::confirmation",
                conversation = %ctx.conversation_id,
                action = %pending.id,
                "no confirmation signal; draft kept"
            );
            return Intercept::Reclassify;
        };
        let Some(handler) = registry.confirmable(pending.category) else {
            session.pending = None;
            let err = HeraldError::failure(pending.category, "no confirmable handler registered");
            return Intercept::Handled(HandlerResult::error(pending.category, ROUTER_SOURCE, &err));
        };

        let result = match signal {
            ConfirmationSignal::Confirm => {
                // Destroyed regardless of the send outcome.
                session.pending = None;
                self.commit(pending, handler, router, ctx).await
            }
            ConfirmationSignal::Cancel => {
                session.pending = None;
                tracing::info!(
                    target: "herald::confirmation",
                    conversation = %ctx.conversation_id,
                    action = %pending.id,
                    "pending action cancelled"
                );
                HandlerResult::success(pending.category, handler.name())
                    .with_message("Okay, I've discarded that draft.")
                    .with_data(serde_json::json!({
                        "cancelled": pending.id.to_string(),
                        "kind": pending.kind.as_str(),
                    }))
            }
            ConfirmationSignal::Edit => self.revise(session, pending, utterance, handler, router, ctx).await,
        };
        Intercept::Handled(result)
    }

    /// Drafts the action for `task` and holds it as the conversation's pending action.
    /// A failed draft leaves the state unchanged.
    pub async fn begin(
        &self,
        session: &mut SessionState,
        task: Task,
        handler: Arc<dyn ConfirmableHandler>,
        router: &Router,
        ctx: &HandlerContext,
    ) -> HandlerResult {
        let category = handler.category();
        let name = handler.name().to_string();
        let drafted = {
            let handler = handler.clone();
            let ctx = ctx.clone();
            router
                .bounded(category, &name, async move { handler.draft(&task, &ctx).await })
                .await
        };
        let payload = match drafted {
            Ok(payload) => payload,
            Err(err) => return Router::error_result(category, &name, &err),
        };

        let action = PendingAction::new(handler.action_kind(), category, payload);
        if let Some(previous) = session.pending.replace(action.clone()) {
            tracing::info!(
                target: "herald::confirmation",
                conversation = %ctx.conversation_id,
                replaced = %previous.id,
                "new draft replaces outstanding one"
            );
        }
        tracing::info!(
            target: "herald::confirmation",
            conversation = %ctx.conversation_id,
            action = %action.id,
            kind = action.kind.as_str(),
            "action drafted; awaiting confirmation"
        );
        draft_result(handler.as_ref(), &action)
    }

    async fn commit(
        &self,
        pending: PendingAction,
        handler: Arc<dyn ConfirmableHandler>,
        router: &Router,
        ctx: &HandlerContext,
    ) -> HandlerResult {
        let category = pending.category;
        let name = handler.name().to_string();
        let id = pending.id;
        let ctx_owned = ctx.clone();
        let outcome = router
            .bounded(category, &name, async move { handler.commit(&pending, &ctx_owned).await })
            .await;
        match outcome {
            Ok(mut result) => {
                tracing::info!(
                    target: "herald::confirmation",
                    conversation = %ctx.conversation_id,
                    action = %id,
                    status = result.status.as_str(),
                    "pending action committed"
                );
                result.category = category;
                result
            }
            Err(err) => Router::error_result(category, &name, &err),
        }
    }

    async fn revise(
        &self,
        session: &mut SessionState,
        pending: PendingAction,
        instruction: &str,
        handler: Arc<dyn ConfirmableHandler>,
        router: &Router,
        ctx: &HandlerContext,
    ) -> HandlerResult {
        let category = pending.category;
        let name = handler.name().to_string();
        let revised: HeraldResult<Details> = {
            let handler = handler.clone();
            let pending = pending.clone();
            let instruction = instruction.to_string();
            let ctx = ctx.clone();
            router
                .bounded(category, &name, async move {
                    handler.revise(&pending, &instruction, &ctx).await
                })
                .await
        };
        match revised {
            Ok(payload) => {
                let action = PendingAction::new(pending.kind, category, payload);
                tracing::info!(
                    target: "herald::confirmation",
                    conversation = %ctx.conversation_id,
                    previous = %pending.id,
                    action = %action.id,
                    "draft revised"
                );
                session.pending = Some(action.clone());
                draft_result(handler.as_ref(), &action)
            }
            // The previous draft stays pending.
            Err(err) => Router::error_result(category, &name, &err),
        }
    }

    fn expire(&self, session: &mut SessionState, ctx: &HandlerContext) {
        let expired = session
            .pending
            .as_ref()
            .is_some_and(|p| p.is_expired(self.pending_ttl, ctx.received_at));
        if expired {
            if let Some(p) = session.pending.take() {
                tracing::info!(
                    target: "herald::confirmation",
                    conversation = %ctx.conversation_id,
                    action = %p.id,
                    "pending action expired"
                );
            }
        }
    }
}

fn draft_result(handler: &dyn ConfirmableHandler, action: &PendingAction) -> HandlerResult {
    let message = format!(
        "{}\n\nSay \"confirm\" to send it, \"edit\" to change it, or \"cancel\" to discard it.",
        handler.render_draft(&action.payload)
    );
    HandlerResult::success(action.category, handler.name())
        .with_message(message)
        .with_data(serde_json::json!({
            "awaiting_confirmation": true,
            "action_id": action.id.to_string(),
            "kind": action.kind.as_str(),
            "draft": action.payload,
        }))
}
