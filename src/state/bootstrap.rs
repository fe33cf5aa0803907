//! Startup reconciliation of "have a token" with "have a profile".
//!
//! SYSTEM CONTEXT
//! ==============
//! Front ends run [`AuthBootstrapper::run`] once at startup (or call
//! [`AuthBootstrapper::reconcile`] from their own change hook). Nothing that
//! depends on the credential happens before the auth store is hydrated, so a
//! logged-in user is never bounced to the login screen during the instant
//! before persisted state loads.
//!
//! FAILURE POLICY
//! ==============
//! Any profile-fetch error, 401 included, means the stored credential is
//! unusable: the store is logged out in full. No retry, no separate error
//! state.

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod bootstrap_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use super::auth::{AuthState, AuthStore};
use crate::net::api::Api;
use crate::net::client::LOGIN_PATH;
use crate::net::error::ApiError;
use crate::net::types::User;

/// Where the current user's profile comes from. Enables mocking in tests.
#[async_trait::async_trait]
pub trait ProfileSource: Send + Sync {
    /// # Errors
    ///
    /// Returns the normalized backend error.
    async fn fetch_profile(&self) -> Result<User, ApiError>;
}

#[async_trait::async_trait]
impl ProfileSource for Api {
    async fn fetch_profile(&self) -> Result<User, ApiError> {
        self.me().await
    }
}

/// What a single reconcile pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapStep {
    /// Store not hydrated yet; nothing decided.
    AwaitingHydration,
    /// Another pass is already fetching the profile.
    InFlight,
    /// No token, or token and profile both present.
    Skipped,
    ProfileLoaded,
    /// The fetch failed and the session was cleared.
    LoggedOut,
    /// The token changed while the fetch was in flight; result dropped.
    Discarded,
}

/// Which branch a page should render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthView {
    /// Hydration or bootstrap still pending: show a neutral loading view.
    Loading,
    SignedIn,
    SignedOut,
}

#[must_use]
pub fn auth_view(state: &AuthState, ready: bool) -> AuthView {
    if !state.is_hydrated || !ready {
        AuthView::Loading
    } else if state.is_authenticated() {
        AuthView::SignedIn
    } else {
        AuthView::SignedOut
    }
}

/// Redirect target for a page that requires a signed-in user.
#[must_use]
pub fn login_redirect(view: AuthView) -> Option<&'static str> {
    (view == AuthView::SignedOut).then_some(LOGIN_PATH)
}

pub struct AuthBootstrapper {
    store: AuthStore,
    profiles: Arc<dyn ProfileSource>,
    in_flight: AtomicBool,
    ready: watch::Sender<bool>,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AuthBootstrapper {
    pub fn new(store: AuthStore, profiles: Arc<dyn ProfileSource>) -> Self {
        let (ready, _) = watch::channel(false);
        Self { store, profiles, in_flight: AtomicBool::new(false), ready }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Receiver that flips to `true` once the first reconcile completes.
    #[must_use]
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    #[must_use]
    pub fn view(&self) -> AuthView {
        auth_view(&self.store.snapshot(), self.is_ready())
    }

    /// Run one reconcile pass against the current store state.
    pub async fn reconcile(&self) -> BootstrapStep {
        let state = self.store.snapshot();
        if !state.is_hydrated {
            return BootstrapStep::AwaitingHydration;
        }

        let step = match (&state.token, &state.user) {
            (Some(token), None) => {
                if self.in_flight.swap(true, Ordering::AcqRel) {
                    return BootstrapStep::InFlight;
                }
                let _guard = InFlightGuard(&self.in_flight);
                self.load_profile(token).await
            }
            _ => BootstrapStep::Skipped,
        };

        self.ready.send_if_modified(|ready| !std::mem::replace(ready, true));
        step
    }

    async fn load_profile(&self, token: &str) -> BootstrapStep {
        self.store.set_loading(true);
        let result = self.profiles.fetch_profile().await;
        self.store.set_loading(false);

        let current = self.store.token();
        if current.as_deref() != Some(token) {
            // A rejected fetch may already have logged the store out.
            if current.is_none() && result.is_err() {
                return BootstrapStep::LoggedOut;
            }
            tracing::debug!("credential changed during profile fetch; dropping result");
            return BootstrapStep::Discarded;
        }

        match result {
            Ok(user) => {
                tracing::debug!(email = %user.email, "profile restored from stored credential");
                self.store.set_user(Some(user));
                BootstrapStep::ProfileLoaded
            }
            Err(e) => {
                tracing::warn!(status = e.status, error = %e, "stored credential rejected; logging out");
                self.store.logout();
                BootstrapStep::LoggedOut
            }
        }
    }

    /// Reconcile now and again after every auth store change. Never returns
    /// while the store is alive; spawn it.
    pub async fn run(self: Arc<Self>) {
        let mut changes = self.store.subscribe();
        loop {
            changes.borrow_and_update();
            self.reconcile().await;
            if changes.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait until the first reconcile pass has completed.
    pub async fn wait_ready(&self) {
        let mut ready = self.ready.subscribe();
        // Sender lives in `self`, so this only errs if `self` is gone.
        let _ = ready.wait_for(|ready| *ready).await;
    }
}
