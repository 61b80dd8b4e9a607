//! Per-conversation state. Each conversation has its own async lock so utterances within it
//! are handled one at a time, in arrival order, while different conversations run in parallel.
//!
//! Sessions idle longer than the configured window and holding no pending action are swept
//! once the store reaches its sweep threshold.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::SessionsConfig;
use crate::confirmation::PendingAction;

#[derive(Debug, Clone)]
pub struct SessionState {
    /// Voice-layer flag; owned by the conversation, never process-wide.
    pub listening: bool,
    pub pending: Option<PendingAction>,
    pub turns: u64,
    pub last_active: Instant,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            listening: false,
            pending: None,
            turns: 0,
            last_active: Instant::now(),
        }
    }
}

impl SessionState {
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    fn evictable(&self, idle_ttl: Duration, now: Instant) -> bool {
        self.pending.is_none() && now.saturating_duration_since(self.last_active) >= idle_ttl
    }
}

pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<SessionState>>>,
    idle_ttl: Duration,
    sweep_threshold: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_config(&SessionsConfig::default())
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &SessionsConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl: config.idle_ttl(),
            sweep_threshold: config.sweep_threshold.max(1),
        }
    }

    /// Session handle for `conversation_id`, created on first use.
    pub fn session(&self, conversation_id: &str) -> Arc<Mutex<SessionState>> {
        if let Some(existing) = self.sessions.get(conversation_id) {
            return existing.clone();
        }
        if self.sessions.len() >= self.sweep_threshold {
            self.sweep_idle();
        }
        self.sessions
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }

    /// Existing session only.
    pub fn get(&self, conversation_id: &str) -> Option<Arc<Mutex<SessionState>>> {
        self.sessions.get(conversation_id).map(|s| s.clone())
    }

    /// Drops the conversation's state, including any pending action.
    pub fn remove(&self, conversation_id: &str) -> bool {
        self.sessions.remove(conversation_id).is_some()
    }

    /// Removes idle sessions with no pending action. Sessions locked by an in-flight turn are
    /// kept. Returns how many were removed.
    pub fn sweep_idle(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| match session.try_lock() {
            Ok(state) => !state.evictable(self.idle_ttl, now),
            Err(_) => true,
        });
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::debug!(target: "herald::session", removed, remaining = self.sessions.len(), "idle sessions swept");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
