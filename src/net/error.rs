//! Uniform error shape for every backend call.
//!
//! ERROR HANDLING
//! ==============
//! Callers never see transport-library errors. Whatever went wrong (HTTP
//! status, unreachable server, undecodable body) arrives as an [`ApiError`]
//! with a display-ready message and the HTTP status, or `0` when the request
//! never produced a usable response.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde::Serialize;
use serde_json::Value;

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Normalized backend failure: `{message, status, details?}`.
#[derive(Clone, Debug, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    /// HTTP status, or `0` for failures that never reached the server.
    pub status: u16,
    /// Parsed error body, when the server sent JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self { message: message.into(), status, details: None }
    }

    /// The request never reached the server (connect failure, timeout).
    #[must_use]
    pub fn network(base_url: &str) -> Self {
        Self::new(
            0,
            format!("Unable to reach the server at {base_url}. Please check that the backend is running."),
        )
    }

    /// A client-side failure unrelated to the server's answer.
    #[must_use]
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    /// Build an error from a non-success response body.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let details = serde_json::from_str::<Value>(body).ok();
        let message = details
            .as_ref()
            .and_then(extract_error_message)
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_owned());
        Self { message, status, details }
    }

    /// Missing or malformed input (400 / 422).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self.status, 400 | 422)
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    /// No usable response: unreachable server, timeout, or client-side failure.
    #[must_use]
    pub fn is_network(&self) -> bool {
        self.status == 0
    }
}

/// Pull a human-readable message out of an error body.
///
/// Order: string `detail`; list `detail` of `{msg}` joined by `", "`;
/// `message`; otherwise `None`.
#[must_use]
pub fn extract_error_message(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(detail)) => return Some(detail.clone()),
        Some(Value::Array(items)) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !parts.is_empty() {
                return Some(parts.join(", "));
            }
        }
        _ => {}
    }
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
