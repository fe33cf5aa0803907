//! Authenticated REST client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every backend call goes through [`RestClient`]. It reads the bearer token
//! from durable storage at dispatch time rather than from the in-memory auth
//! store, so it always sends the latest persisted credential and needs no
//! reference to the stores.
//!
//! AUTH INTERCEPTOR
//! ================
//! A 401 on an auth-flow path (`/auth/...`) is returned untouched: a wrong
//! password is a form error, not an expired session. A 401 anywhere else
//! clears the persisted credential and profile, asks the [`Navigator`] for a
//! hard navigation to the login screen, and is then still returned so the
//! caller's own error handling runs.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::transport::{HttpRequest, HttpTransport, Transport, TransportError};
use crate::config::ClientConfig;
use crate::storage::{Storage, keys};

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_LOGIN_PATH: &str = "/admin/login";

/// Path fragment shared by every endpoint that establishes or recovers
/// identity (login, signup, verify, resend, reset).
pub const AUTH_FLOW_MARKER: &str = "/auth/";

/// Performs a hard navigation (full reload of the front end at `path`).
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for headless embedding: logs the request and does nothing else.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        tracing::warn!(%path, "navigation requested");
    }
}

/// Whether `path` belongs to the authentication flow itself.
#[must_use]
pub fn is_auth_flow_path(path: &str) -> bool {
    path.contains(AUTH_FLOW_MARKER)
}

/// Which persisted credential a client attaches and clears.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CredentialScope {
    User,
    Admin,
}

impl CredentialScope {
    fn token_key(self) -> &'static str {
        match self {
            Self::User => keys::TOKEN,
            Self::Admin => keys::ADMIN_TOKEN,
        }
    }

    fn login_path(self) -> &'static str {
        match self {
            Self::User => LOGIN_PATH,
            Self::Admin => ADMIN_LOGIN_PATH,
        }
    }
}

#[derive(Clone)]
pub struct RestClient {
    base_url: Arc<str>,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    navigator: Arc<dyn Navigator>,
    timeout: Duration,
    scope: CredentialScope,
}

impl RestClient {
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            transport,
            storage,
            navigator,
            timeout,
            scope: CredentialScope::User,
        }
    }

    /// Build a client over reqwest using `config`'s base URL and timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &ClientConfig,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.timeouts.connect)?;
        Ok(Self::new(&config.base_url, Arc::new(transport), storage, navigator, config.timeouts.request))
    }

    /// A client sharing this one's transport and storage that attaches the
    /// admin credential instead of the user token.
    #[must_use]
    pub fn for_admin(&self) -> Self {
        Self { scope: CredentialScope::Admin, ..self.clone() }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on any failure.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, self.timeout).await
    }

    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on any failure.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.post_with_timeout(path, body, self.timeout).await
    }

    /// `POST` with a per-call ceiling instead of the client default.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on any failure.
    pub async fn post_with_timeout<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let body = encode_body(path, body)?;
        self.request(Method::POST, path, Some(body), timeout).await
    }

    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on any failure.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = encode_body(path, body)?;
        self.request(Method::PUT, path, Some(body), self.timeout).await
    }

    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on any failure.
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = encode_body(path, body)?;
        self.request(Method::PATCH, path, Some(body), self.timeout).await
    }

    /// # Errors
    ///
    /// Returns a normalized [`ApiError`] on any failure.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None, self.timeout).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let bearer = self
            .storage
            .get(self.scope.token_key())
            .filter(|token| !token.is_empty());
        tracing::debug!(%method, %path, authenticated = bearer.is_some(), "api request");

        let request = HttpRequest { method, url: format!("{}{path}", self.base_url), bearer, body, timeout };
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(TransportError::Unreachable(reason)) => {
                tracing::warn!(%path, %reason, "backend unreachable");
                return Err(ApiError::network(&self.base_url));
            }
            Err(TransportError::Failed(reason)) => return Err(ApiError::client(reason)),
        };

        if !response.is_success() {
            if response.status == 401 && !is_auth_flow_path(path) {
                self.expire_session(path);
            }
            return Err(ApiError::from_response(response.status, &response.body));
        }

        let raw = if response.body.trim().is_empty() { "null" } else { response.body.as_str() };
        serde_json::from_str(raw).map_err(|e| ApiError::client(format!("invalid response from {path}: {e}")))
    }

    fn expire_session(&self, path: &str) {
        tracing::warn!(%path, "credential rejected; clearing session and redirecting to login");
        self.storage.remove(self.scope.token_key());
        if self.scope == CredentialScope::User {
            self.storage.remove(keys::USER);
            self.storage.remove(keys::AUTH_STATE);
        }
        self.navigator.navigate(self.scope.login_path());
    }
}

fn encode_body<B: Serialize + ?Sized>(path: &str, body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::client(format!("failed to encode request for {path}: {e}")))
}
