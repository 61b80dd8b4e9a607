//! The boundary a voice or text front end calls: one utterance in, one result out.

use std::sync::Arc;

use crate::classifier::Classifier;
use crate::collaborators::StructuredClassifier;
use crate::config::HeraldConfig;
use crate::confirmation::{ConfirmationMachine, ConfirmationState, Intercept, PendingAction};
use crate::handler::{HandlerContext, HandlerRegistry};
use crate::router::Router;
use crate::session::SessionStore;
use crate::types::HandlerResult;

pub struct Assistant {
    classifier: Classifier,
    router: Router,
    confirmation: ConfirmationMachine,
    sessions: SessionStore,
}

impl Assistant {
    /// `model` backs the model-assisted classification strategy when configured.
    pub fn new(
        config: &HeraldConfig,
        registry: HandlerRegistry,
        model: Option<Arc<dyn StructuredClassifier>>,
    ) -> Self {
        tracing::info!(
            target: "herald::assistant",
            handlers = registry.len(),
            strategy = ?config.classifier.strategy,
            "assistant ready"
        );
        Self {
            classifier: Classifier::new(&config.classifier, model),
            router: Router::new(Arc::new(registry), config.router.clone()),
            confirmation: ConfirmationMachine::new(&config.confirmation),
            sessions: SessionStore::with_config(&config.sessions),
        }
    }

    /// Handles one utterance for `conversation_id`. Never fails. Utterances within one
    /// conversation are processed in arrival order.
    pub async fn handle(&self, utterance: &str, conversation_id: &str) -> HandlerResult {
        let session = self.sessions.session(conversation_id);
        let mut state = session.lock().await;
        state.turns += 1;
        state.touch();
        let ctx = HandlerContext::new(conversation_id, state.listening);
        tracing::debug!(
            target: "herald::assistant",
            conversation = conversation_id,
            turn = state.turns,
            "utterance received"
        );

        let registry = Arc::clone(self.router.registry());
        if let Intercept::Handled(result) = self
            .confirmation
            .intercept(&mut state, utterance, &self.router, &registry, &ctx)
            .await
        {
            return result;
        }

        let task = self.classifier.classify(utterance).await.task;
        if let Some(handler) = registry.confirmable(task.category) {
            return self
                .confirmation
                .begin(&mut state, task, handler, &self.router, &ctx)
                .await;
        }
        self.router.route(task, &ctx).await
    }

    pub async fn set_listening(&self, conversation_id: &str, listening: bool) {
        let session = self.sessions.session(conversation_id);
        session.lock().await.listening = listening;
    }

    pub async fn is_listening(&self, conversation_id: &str) -> bool {
        match self.sessions.get(conversation_id) {
            Some(session) => session.lock().await.listening,
            None => false,
        }
    }

    pub async fn pending_action(&self, conversation_id: &str) -> Option<PendingAction> {
        let session = self.sessions.get(conversation_id)?;
        let state = session.lock().await;
        state.pending.clone()
    }

    pub async fn confirmation_state(&self, conversation_id: &str) -> ConfirmationState {
        match self.sessions.get(conversation_id) {
            Some(session) => ConfirmationMachine::state(&*session.lock().await),
            None => ConfirmationState::None,
        }
    }

    /// Forgets the conversation, discarding any pending action.
    pub fn end_conversation(&self, conversation_id: &str) -> bool {
        let removed = self.sessions.remove(conversation_id);
        if removed {
            tracing::debug!(target: "herald::assistant", conversation = conversation_id, "conversation ended");
        }
        removed
    }

    /// Drops idle conversations that hold no pending action.
    pub fn sweep_idle_sessions(&self) -> usize {
        self.sessions.sweep_idle()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}
