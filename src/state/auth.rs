//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Single source of truth for "who is logged in". Route guards, the
//! bootstrapper, and the auth flows read and mutate it; the REST client does
//! not, it reads the mirrored token from durable storage instead.
//!
//! PERSISTENCE
//! ===========
//! Once hydrated, every change writes `{token, user, is_authenticated}` under
//! the auth-state key and mirrors the token and user under their own keys.
//! `loading` and `error` are transient and never written. Changes made
//! before hydration stay in memory until [`AuthStore::hydrate`] merges the
//! persisted record over them.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::net::types::User;
use crate::storage::{self, Storage, keys};

/// Snapshot of the auth session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<User>,
    /// True once persisted state has been loaded.
    pub is_hydrated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    /// Authenticated means a credential is held, whether or not the profile
    /// has been fetched yet.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn has_profile(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedAuth {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    is_authenticated: bool,
}

/// Shared handle to the auth session. Clones observe the same state.
#[derive(Clone)]
pub struct AuthStore {
    state: Arc<watch::Sender<AuthState>>,
    storage: Arc<dyn Storage>,
}

impl AuthStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self { state: Arc::new(state), storage }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.state.borrow().is_hydrated
    }

    pub fn set_token(&self, token: Option<String>) {
        self.update(|s| s.token = token);
    }

    pub fn set_user(&self, user: Option<User>) {
        self.update(|s| s.user = user);
    }

    /// Record a successful credential exchange.
    pub fn login(&self, token: String, user: User) {
        tracing::info!(email = %user.email, "logged in");
        self.update(|s| {
            s.token = Some(token);
            s.user = Some(user);
            s.error = None;
            s.loading = false;
        });
    }

    /// Drop the credential, profile, and auth-adjacent local state. The
    /// hydration flag is left untouched.
    pub fn logout(&self) {
        tracing::info!("logged out");
        self.update(|s| {
            s.token = None;
            s.user = None;
            s.error = None;
            s.loading = false;
        });
        self.storage.remove(keys::SIGNUP_EMAIL);
    }

    pub fn set_hydrated(&self, hydrated: bool) {
        self.update(|s| s.is_hydrated = hydrated);
    }

    pub fn set_loading(&self, loading: bool) {
        self.update(|s| s.loading = loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update(|s| s.error = error);
    }

    /// Load the persisted record, merge it over the in-memory state, and mark
    /// the store hydrated. Calling it again after hydration is a no-op.
    pub fn hydrate(&self) {
        if self.is_hydrated() {
            return;
        }
        let persisted = storage::load_json::<PersistedAuth>(self.storage.as_ref(), keys::AUTH_STATE);
        self.update(|s| {
            if let Some(persisted) = persisted {
                if persisted.token.is_some() {
                    s.token = persisted.token;
                }
                if persisted.user.is_some() {
                    s.user = persisted.user;
                }
            }
            s.is_hydrated = true;
        });
        tracing::debug!(authenticated = self.is_authenticated(), "auth store hydrated");
    }

    fn update(&self, apply: impl FnOnce(&mut AuthState)) {
        self.state.send_modify(apply);
        let state = self.snapshot();
        if state.is_hydrated {
            self.persist(&state);
        }
    }

    fn persist(&self, state: &AuthState) {
        let record = PersistedAuth {
            token: state.token.clone(),
            user: state.user.clone(),
            is_authenticated: state.is_authenticated(),
        };
        storage::save_json(self.storage.as_ref(), keys::AUTH_STATE, &record);

        match &state.token {
            Some(token) => self.storage.set(keys::TOKEN, token),
            None => self.storage.remove(keys::TOKEN),
        }
        match &state.user {
            Some(user) => storage::save_json(self.storage.as_ref(), keys::USER, user),
            None => self.storage.remove(keys::USER),
        }
    }
}
