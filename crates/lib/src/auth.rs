//! Auth gate: holds the bearer token and decides whether a protected view may render.
//!
//! The gate is cheap to clone; clones share the same token so the gateway always
//! sees the credential most recently set or cleared.

use std::sync::{Arc, RwLock};

use crate::token::TokenStore;

/// Client views. Only [`View::Chatbot`] requires a token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Welcome,
    Login,
    Signup,
    Chatbot,
}

impl View {
    pub fn is_protected(self) -> bool {
        matches!(self, View::Chatbot)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token present; the caller should show [`AuthError::redirect`].
    #[error("not authenticated")]
    Unauthenticated,
    #[error("token must not be empty")]
    EmptyToken,
    /// Backend rejected the credential.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token storage failed: {0}")]
    Storage(String),
}

impl AuthError {
    /// The view to show instead when access is denied.
    pub fn redirect(&self) -> View {
        View::Login
    }
}

/// Current credential plus the storage it is persisted to.
#[derive(Clone)]
pub struct AuthGate {
    token: Arc<RwLock<Option<String>>>,
    store: Arc<dyn TokenStore>,
}

impl AuthGate {
    /// Gate with no token, persisting to `store` on set/clear. Does not read the store.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            store,
        }
    }

    /// Gate seeded from whatever token `store` currently holds.
    pub fn load(store: Arc<dyn TokenStore>) -> Self {
        let gate = Self::new(store);
        gate.reload();
        gate
    }

    /// Re-read the persisted token (protected-view entry).
    pub fn reload(&self) {
        let loaded = self.store.load();
        log::debug!("auth: token {}", if loaded.is_some() { "present" } else { "absent" });
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = loaded;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Current token, for attaching as `Authorization: Bearer`.
    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Store a credential. Empty tokens and store failures leave the gate unchanged.
    pub fn set_token(&self, token: &str) -> Result<(), AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        self.store
            .save(token)
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        log::info!("auth: token set");
        Ok(())
    }

    /// Remove the credential. The in-memory token is always cleared, even if the store fails.
    pub fn clear_token(&self) -> Result<(), AuthError> {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.store
            .clear()
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        log::info!("auth: token cleared");
        Ok(())
    }

    /// Check whether `view` may render. Unprotected views always pass.
    pub fn guard(&self, view: View) -> Result<(), AuthError> {
        if view.is_protected() && !self.has_token() {
            return Err(AuthError::Unauthenticated);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;

    fn gate() -> AuthGate {
        AuthGate::new(Arc::new(MemoryTokenStore::new()))
    }

    #[test]
    fn set_then_clear() {
        let g = gate();
        assert!(!g.has_token());
        g.set_token("t0k").unwrap();
        assert!(g.has_token());
        assert_eq!(g.token().as_deref(), Some("t0k"));
        g.clear_token().unwrap();
        assert!(!g.has_token());
        g.clear_token().unwrap();
        assert!(!g.has_token());
    }

    #[test]
    fn empty_token_rejected() {
        let g = gate();
        assert!(matches!(g.set_token("   "), Err(AuthError::EmptyToken)));
        assert!(!g.has_token());
    }

    #[test]
    fn failed_save_leaves_gate_unauthenticated() {
        let g = AuthGate::new(Arc::new(crate::testing::ReadOnlyTokenStore));
        assert!(matches!(g.set_token("t0k"), Err(AuthError::Storage(_))));
        assert!(!g.has_token());
        assert!(g.guard(View::Chatbot).is_err());
    }

    #[test]
    fn load_reads_persisted_token_and_clones_share_state() {
        let store = Arc::new(MemoryTokenStore::with_token("persisted"));
        let g = AuthGate::load(store.clone());
        let other = g.clone();
        assert_eq!(other.token().as_deref(), Some("persisted"));
        g.clear_token().unwrap();
        assert!(!other.has_token());
        assert!(store.load().is_none());
    }

    #[test]
    fn guard_only_blocks_protected_views() {
        let g = gate();
        assert!(g.guard(View::Welcome).is_ok());
        assert!(g.guard(View::Login).is_ok());
        assert!(g.guard(View::Signup).is_ok());
        let err = g.guard(View::Chatbot).unwrap_err();
        assert_eq!(err.redirect(), View::Login);
        g.set_token("x").unwrap();
        assert!(g.guard(View::Chatbot).is_ok());
    }
}
