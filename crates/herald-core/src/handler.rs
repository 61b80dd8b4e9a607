//! Capability handler contract and the category-keyed registry built at startup.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::confirmation::{PendingAction, PendingActionKind};
use crate::error::HeraldResult;
use crate::types::{Details, HandlerResult, Task, TaskCategory};

/// Per-invocation context handed to handlers. Owned, so it can move into a spawned task.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub conversation_id: String,
    /// Voice-layer "listening" flag for this conversation (per-session, never global).
    pub listening: bool,
    pub received_at: DateTime<Utc>,
}

impl HandlerContext {
    pub fn new(conversation_id: impl Into<String>, listening: bool) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            listening,
            received_at: Utc::now(),
        }
    }
}

/// One pluggable unit per task category.
///
/// Handlers may fail however they like; the router turns any `Err` (or panic) into an
/// error [`HandlerResult`].
#[async_trait::async_trait]
pub trait CapabilityHandler: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> TaskCategory;

    async fn handle(&self, task: &Task, ctx: &HandlerContext) -> HeraldResult<HandlerResult>;
}

/// Capability whose action must be reviewed and confirmed before it runs (e.g. sending
/// a message). The confirmation state machine owns the pending payload; implementations
/// only draft, revise and commit it.
#[async_trait::async_trait]
pub trait ConfirmableHandler: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> TaskCategory;

    fn action_kind(&self) -> PendingActionKind;

    /// Builds the payload held for review. `HeraldError::InvalidInput` when the task lacks
    /// something mandatory (e.g. a recipient).
    async fn draft(&self, task: &Task, ctx: &HandlerContext) -> HeraldResult<Details>;

    /// Regenerates the payload following the user's edit instruction.
    async fn revise(
        &self,
        action: &PendingAction,
        instruction: &str,
        ctx: &HandlerContext,
    ) -> HeraldResult<Details>;

    /// Executes the confirmed action.
    async fn commit(&self, action: &PendingAction, ctx: &HandlerContext) -> HeraldResult<HandlerResult>;

    /// Review text for a drafted payload.
    fn render_draft(&self, payload: &Details) -> String;
}

/// Handlers keyed by category. Built once, then shared read-only.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TaskCategory, Arc<dyn CapabilityHandler>>,
    confirmables: HashMap<TaskCategory, Arc<dyn ConfirmableHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for its category, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn CapabilityHandler>) {
        let category = handler.category();
        if self.handlers.insert(category, handler).is_some() {
            tracing::warn!(target: "herald::router", %category, "handler replaced");
        }
    }

    /// Registers a capability that requires confirmation before it executes.
    pub fn register_confirmable(&mut self, handler: Arc<dyn ConfirmableHandler>) {
        self.confirmables.insert(handler.category(), handler);
    }

    pub fn get(&self, category: TaskCategory) -> Option<Arc<dyn CapabilityHandler>> {
        self.handlers.get(&category).cloned()
    }

    /// Handler for `category`, or the conversation handler when none is registered.
    pub fn resolve(&self, category: TaskCategory) -> Option<Arc<dyn CapabilityHandler>> {
        self.get(category).or_else(|| {
            tracing::debug!(target: "herald::router", %category, "no handler; using conversation");
            self.get(TaskCategory::Conversation)
        })
    }

    pub fn confirmable(&self, category: TaskCategory) -> Option<Arc<dyn ConfirmableHandler>> {
        self.confirmables.get(&category).cloned()
    }

    pub fn categories(&self) -> Vec<TaskCategory> {
        let mut out: Vec<_> = self
            .handlers
            .keys()
            .chain(self.confirmables.keys())
            .copied()
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn len(&self) -> usize {
        self.categories().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.confirmables.is_empty()
    }
}
