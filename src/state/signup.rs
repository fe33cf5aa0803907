//! Signup, verification, and login orchestration.
//!
//! SYSTEM CONTEXT
//! ==============
//! Sits between the auth endpoints and [`AuthStore`]. Besides the store it
//! owns two pieces of auth-adjacent local state: the email stashed between
//! signup (or an unverified login) and verification, and profile preferences
//! chosen at signup, kept per email until that email verifies and they can
//! be pushed to the backend.

#[cfg(test)]
#[path = "signup_test.rs"]
mod signup_test;

use std::sync::Arc;

use super::auth::AuthStore;
use crate::net::api::Api;
use crate::net::error::ApiError;
use crate::net::types::{MessageResponse, ProfileUpdate, SignupResponse, TokenResponse, User};
use crate::storage::{self, Storage, keys};

#[derive(Clone)]
pub struct AuthFlow {
    api: Api,
    store: AuthStore,
    storage: Arc<dyn Storage>,
}

impl AuthFlow {
    pub fn new(api: Api, store: AuthStore, storage: Arc<dyn Storage>) -> Self {
        Self { api, store, storage }
    }

    /// Email waiting for verification, if any.
    #[must_use]
    pub fn pending_email(&self) -> Option<String> {
        self.storage.get(keys::SIGNUP_EMAIL).filter(|e| !e.is_empty())
    }

    /// Preferences chosen at signup that have not reached the backend yet.
    #[must_use]
    pub fn pending_preferences(&self, email: &str) -> Option<ProfileUpdate> {
        storage::load_json(self.storage.as_ref(), &keys::pending_profile(email))
    }

    /// Register an account. The backend emails a verification code.
    ///
    /// # Errors
    ///
    /// 400 for a duplicate email, 422 for missing fields.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
        preferences: Option<ProfileUpdate>,
    ) -> Result<SignupResponse, ApiError> {
        let response = self
            .track(self.api.signup(email, password, full_name))
            .await?;

        self.storage.set(keys::SIGNUP_EMAIL, &response.email);
        if let Some(preferences) = preferences.filter(|p| !p.is_empty()) {
            storage::save_json(self.storage.as_ref(), &keys::pending_profile(&response.email), &preferences);
        }
        Ok(response)
    }

    /// Exchange credentials for a token, then load the profile.
    ///
    /// A 403 means the account is unverified; the email is stashed so the
    /// verify step can pick it up.
    ///
    /// # Errors
    ///
    /// 401 for bad credentials or when the new token is rejected by
    /// `/users/me`, 403 for an unverified account.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        // The token has to reach durable storage before `/users/me` goes out.
        self.store.hydrate();

        let token = match self.track(self.api.login(email, password)).await {
            Ok(token) => token,
            Err(e) => {
                if e.is_forbidden() {
                    self.storage.set(keys::SIGNUP_EMAIL, email.trim());
                }
                return Err(e);
            }
        };

        self.store.set_token(Some(token.access_token.clone()));
        match self.api.me().await {
            Ok(user) => self.store.login(token.access_token.clone(), user),
            Err(e) if e.is_unauthorized() => {
                self.store.logout();
                self.store.set_error(Some(e.message.clone()));
                return Err(e);
            }
            Err(e) => tracing::warn!(status = e.status, error = %e, "profile fetch after login failed"),
        }
        Ok(token)
    }

    /// Submit a verification code for `email`, or for the stashed email.
    ///
    /// On success the session is logged in, the stash is cleared, and any
    /// pending signup preferences are pushed. On failure the stash is kept
    /// so the user can retry.
    ///
    /// # Errors
    ///
    /// 400 for a bad code; a status-0 error when no email is known.
    pub async fn verify(&self, email: Option<&str>, code: &str) -> Result<User, ApiError> {
        let email = match email.map(str::to_owned).or_else(|| self.pending_email()) {
            Some(email) => email,
            None => return Err(ApiError::client("No email is waiting for verification")),
        };
        self.store.hydrate();

        let response = self.track(self.api.verify(&email, code)).await?;
        self.store.login(response.access_token, response.user.clone());
        self.storage.remove(keys::SIGNUP_EMAIL);

        Ok(self
            .sync_pending_preferences(&email)
            .await
            .unwrap_or(response.user))
    }

    /// # Errors
    ///
    /// Returns the normalized backend error; a status-0 error when no email
    /// is known.
    pub async fn resend_verification(&self, email: Option<&str>) -> Result<MessageResponse, ApiError> {
        let email = match email.map(str::to_owned).or_else(|| self.pending_email()) {
            Some(email) => email,
            None => return Err(ApiError::client("No email is waiting for verification")),
        };
        self.api.resend_verification(&email).await
    }

    /// Apply a partial profile update and store the result.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let user = self.api.update_me(update).await?;
        self.store.set_user(Some(user.clone()));
        Ok(user)
    }

    pub fn logout(&self) {
        self.store.logout();
    }

    async fn sync_pending_preferences(&self, email: &str) -> Option<User> {
        let pending = self.pending_preferences(email)?;
        match self.api.update_me(&pending).await {
            Ok(user) => {
                self.storage.remove(&keys::pending_profile(email));
                self.store.set_user(Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                tracing::warn!(status = e.status, error = %e, "pending profile preferences not synced");
                None
            }
        }
    }

    /// Mirror a call's progress into the store's transient flags.
    async fn track<T>(&self, call: impl Future<Output = Result<T, ApiError>>) -> Result<T, ApiError> {
        self.store.set_loading(true);
        self.store.set_error(None);
        let result = call.await;
        self.store.set_loading(false);
        if let Err(e) = &result {
            self.store.set_error(Some(e.message.clone()));
        }
        result
    }
}
