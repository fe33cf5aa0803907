//! Durable client storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! Plays the role browser `localStorage` plays for a web front end: a flat
//! string-to-string map that survives restarts. The REST client reads the
//! bearer token from here on every request, and the stores write their
//! persisted records here on every change. All access is last-write-wins.
//!
//! DESIGN
//! ======
//! One small trait with two implementations: [`MemoryStorage`] for tests and
//! short-lived embedding, [`FileStorage`] for the CLI. Writes are infallible
//! from the caller's point of view; backends log failures instead of
//! propagating them, so a full disk never breaks an in-memory login.

mod file;
mod memory;


use serde::Serialize;
use serde::de::DeserializeOwned;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Well-known storage keys.
pub mod keys {
    /// Bearer token read by the REST client at dispatch time.
    pub const TOKEN: &str = "token";
    /// Cached user profile JSON.
    pub const USER: &str = "user";
    /// Persisted auth-store record (`{token, user, is_authenticated}`).
    pub const AUTH_STATE: &str = "auth-storage";
    /// Email stashed between signup/login and verification.
    pub const SIGNUP_EMAIL: &str = "signup_email";
    /// Reserved for front-end preference state; not written by this crate.
    pub const UI_PREFERENCES: &str = "ui-preferences";
    /// Persisted interview store snapshot.
    pub const INTERVIEW_SESSION: &str = "interview-session";
    /// Admin bearer token, kept apart from the user token.
    pub const ADMIN_TOKEN: &str = "admin_token";

    const PENDING_PROFILE_PREFIX: &str = "pending_profile_prefs:";

    /// Key holding profile preferences chosen at signup for `email`, pushed
    /// to the backend once that email verifies.
    pub fn pending_profile(email: &str) -> String {
        format!("{PENDING_PROFILE_PREFIX}{}", email.trim().to_ascii_lowercase())
    }
}

/// Errors raised while opening a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {path} is not a JSON object: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Flat key/value store backing every persisted piece of client state.
pub trait Storage: Send + Sync {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str);

    /// Remove `key` if present.
    fn remove(&self, key: &str);
}

/// Load and decode a JSON value stored under `key`.
///
/// Missing keys and undecodable values both read as `None`.
pub fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(%key, error = %e, "ignoring undecodable stored value");
            None
        }
    }
}

/// Encode `value` as JSON and store it under `key`.
pub fn save_json<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => storage.set(key, &raw),
        Err(e) => tracing::warn!(%key, error = %e, "failed to encode value for storage"),
    }
}
