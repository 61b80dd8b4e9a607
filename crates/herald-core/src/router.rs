//! Router: resolves a task's handler and runs it under the category's time budget.
//!
//! Public contract: always returns a [`HandlerResult`], never propagates a handler
//! failure, and returns within the budget. Each invocation runs in its own spawned task so
//! a timeout can abort it (dropping every nested collaborator future) and a panic is
//! contained.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::config::RouterConfig;
use crate::error::{HeraldError, HeraldResult};
use crate::handler::{HandlerContext, HandlerRegistry};
use crate::types::{HandlerResult, Task, TaskCategory};

/// `source` stamped on results the router produces itself.
pub const ROUTER_SOURCE: &str = "router";

pub struct Router {
    registry: Arc<HandlerRegistry>,
    config: RouterConfig,
}

impl Router {
    pub fn new(registry: Arc<HandlerRegistry>, config: RouterConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Dispatches `task` to its handler (or the conversation fallback).
    pub async fn route(&self, task: Task, ctx: &HandlerContext) -> HandlerResult {
        let category = task.category;
        let Some(handler) = self.registry.resolve(category) else {
            tracing::error!(target: "herald::router", %category, "no handler registered");
            return HandlerResult::error(
                category,
                ROUTER_SOURCE,
                &HeraldError::failure(category, "no handler registered"),
            );
        };
        let name = handler.name().to_string();
        tracing::debug!(target: "herald::router", %category, handler = %name, "routing task");

        let ctx = ctx.clone();
        let outcome = self
            .bounded(category, &name, async move { handler.handle(&task, &ctx).await })
            .await;
        match outcome {
            Ok(result) => normalize(result, category, &name),
            Err(err) => Self::error_result(category, &name, &err),
        }
    }

    /// Runs `fut` in its own task under `category`'s budget. Timeout aborts the task and
    /// yields `HandlerTimeout`; a panic yields `HandlerFailure`.
    pub async fn bounded<T, F>(&self, category: TaskCategory, handler: &str, fut: F) -> HeraldResult<T>
    where
        T: Send + 'static,
        F: Future<Output = HeraldResult<T>> + Send + 'static,
    {
        let budget = self.config.timeout_for(category);
        let started = Instant::now();
        let mut join = AbortOnDrop(tokio::spawn(fut));

        match tokio::time::timeout(budget, &mut join.0).await {
            Err(_elapsed) => {
                join.0.abort();
                tracing::warn!(
                    target: "herald::router",
                    %category,
                    handler,
                    budget_ms = budget.as_millis() as u64,
                    "handler timed out; cancelled"
                );
                Err(HeraldError::HandlerTimeout {
                    category,
                    after: budget,
                })
            }
            Ok(Err(join_err)) => {
                let reason = if join_err.is_panic() {
                    "handler panicked"
                } else {
                    "handler task cancelled"
                };
                tracing::error!(target: "herald::router", %category, handler, reason, "handler aborted");
                Err(HeraldError::failure(category, reason))
            }
            Ok(Ok(result)) => {
                tracing::debug!(
                    target: "herald::router",
                    %category,
                    handler,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ok = result.is_ok(),
                    "handler finished"
                );
                result
            }
        }
    }

    /// Error result for `err`. Timeouts are attributed to the router itself.
    pub fn error_result(category: TaskCategory, handler: &str, err: &HeraldError) -> HandlerResult {
        match err {
            HeraldError::HandlerTimeout { .. } => HandlerResult::error(category, ROUTER_SOURCE, err),
            _ => {
                tracing::warn!(target: "herald::router", %category, handler, error = %err, "handler failed");
                HandlerResult::error(category, handler, err)
            }
        }
    }
}

/// Aborts the spawned handler task when the caller's future is dropped before it finishes.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Stamps the routed category and fills an empty `source` with the handler name.
fn normalize(mut result: HandlerResult, category: TaskCategory, handler: &str) -> HandlerResult {
    result.category = category;
    if result.source.trim().is_empty() {
        result.source = handler.to_string();
    }
    result
}
