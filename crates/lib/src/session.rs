//! Chat sessions and their question/answer history.
//!
//! Sessions are keyed by id and hold an append-only list of turns. The store is a cache of
//! the backend's history: a history fetch replaces the whole mapping, a successful question
//! appends in place. All state lives behind one lock so readers never see a mapping whose
//! current-session pointer has not been reconciled yet.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gateway::{Backend, GatewayError, SessionHistory};

/// Unique session identifier (opaque string).
pub type SessionId = String;

/// Pointer used before any session exists; the backend creates it on first question.
pub const DEFAULT_SESSION_ID: &str = "default_session";

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The target session is not in the store (the current-session pointer is out of sync).
    #[error("session not found: {0}")]
    NotFound(SessionId),
}

/// Everything a renderer needs, read under one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Session ids in iteration order.
    pub ids: Vec<SessionId>,
    /// Resolved current session id.
    pub current: SessionId,
    /// Turns of the current session (empty when it has none or is not in the store).
    pub turns: Vec<Turn>,
}

#[derive(Debug)]
struct SessionState {
    /// Insertion order; every entry is a key of `turns`.
    order: Vec<SessionId>,
    turns: HashMap<SessionId, Vec<Turn>>,
    current: SessionId,
    /// Last millisecond stamp handed out by `create_session`.
    last_stamp: i64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            turns: HashMap::new(),
            current: DEFAULT_SESSION_ID.to_string(),
            last_stamp: 0,
        }
    }

    fn insert(&mut self, id: SessionId, turns: Vec<Turn>) {
        if self.turns.insert(id.clone(), turns).is_none() {
            self.order.push(id);
        }
    }

    /// Reselect the first session when the pointer references a missing id.
    fn resolve_current(&mut self) -> SessionId {
        if !self.turns.contains_key(&self.current) {
            if let Some(first) = self.order.first() {
                log::warn!(
                    "sessions: current session {} not in store, switching to {}",
                    self.current,
                    first
                );
                self.current = first.clone();
            }
        }
        self.current.clone()
    }

    fn current_turns(&self) -> Vec<Turn> {
        self.turns.get(&self.current).cloned().unwrap_or_default()
    }
}

/// In-memory store for sessions (load, create, select, append).
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Empty store pointing at [`DEFAULT_SESSION_ID`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState::new())),
        }
    }

    /// Replace the whole mapping with the server's view. Order of sessions and turns is kept;
    /// a repeated session id keeps its first position and its last turn list.
    pub async fn load_from_history(&self, sessions: Vec<SessionHistory>) {
        let mut next = SessionState::new();
        for s in sessions {
            next.insert(s.session_id, s.messages);
        }
        let mut g = self.inner.write().await;
        next.current = std::mem::take(&mut g.current);
        next.last_stamp = g.last_stamp;
        *g = next;
        g.resolve_current();
        log::debug!("sessions: loaded {} from history", g.order.len());
    }

    /// Fetch history and load it. On failure the mapping becomes empty and the error is returned.
    pub async fn refresh(&self, backend: &dyn Backend) -> Result<(), GatewayError> {
        match backend.get_history().await {
            Ok(history) => {
                self.load_from_history(history).await;
                Ok(())
            }
            Err(e) => {
                log::warn!("sessions: history fetch failed, starting empty: {}", e);
                self.load_from_history(Vec::new()).await;
                Err(e)
            }
        }
    }

    /// Create an empty session with a fresh `session_<millis>` id and make it current.
    pub async fn create_session(&self) -> SessionId {
        let now = chrono::Utc::now().timestamp_millis();
        let mut g = self.inner.write().await;
        let mut stamp = now.max(g.last_stamp + 1);
        let mut id = format!("session_{}", stamp);
        while g.turns.contains_key(&id) {
            stamp += 1;
            id = format!("session_{}", stamp);
        }
        g.last_stamp = stamp;
        g.insert(id.clone(), Vec::new());
        g.current = id.clone();
        log::info!("sessions: created {}", id);
        id
    }

    /// Point at `id`. Not validated here; a missing id is resolved on the next read.
    pub async fn select_session(&self, id: impl Into<SessionId>) {
        self.inner.write().await.current = id.into();
    }

    /// Create an empty session with the given id if it does not exist; returns the id.
    pub async fn get_or_create(&self, id: impl Into<SessionId>) -> SessionId {
        let id = id.into();
        let mut g = self.inner.write().await;
        if !g.turns.contains_key(&id) {
            g.insert(id.clone(), Vec::new());
        }
        id
    }

    /// Append a turn to the session; the turn is dropped and an error returned if the session is missing.
    pub async fn append_turn(
        &self,
        id: &str,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<(), SessionError> {
        let mut g = self.inner.write().await;
        let turns = g
            .turns
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        turns.push(Turn::new(question, answer));
        Ok(())
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.turns.contains_key(id)
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.order.is_empty()
    }

    /// Session ids in iteration order.
    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.inner.read().await.order.clone()
    }

    /// Turns of a session; empty if the id is unknown.
    pub async fn turns(&self, id: &str) -> Vec<Turn> {
        self.inner
            .read()
            .await
            .turns
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Current session id, reselecting an existing one if the pointer is stale.
    pub async fn current_session_id(&self) -> SessionId {
        self.inner.write().await.resolve_current()
    }

    /// Turns of the current session.
    pub async fn current_turns(&self) -> Vec<Turn> {
        let mut g = self.inner.write().await;
        g.resolve_current();
        g.current_turns()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut g = self.inner.write().await;
        let current = g.resolve_current();
        SessionSnapshot {
            ids: g.order.clone(),
            turns: g.current_turns(),
            current,
        }
    }

    /// Drop all sessions and reset the pointer (logout).
    pub async fn clear(&self) {
        *self.inner.write().await = SessionState::new();
    }
}
