//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SPEECH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATE_DIR_NAME: &str = ".interview-client";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL '{0}': expected http:// or https://")]
    InvalidBaseUrl(String),

    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    pub request: Duration,
    pub speech: Duration,
    pub connect: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            speech: Duration::from_secs(DEFAULT_SPEECH_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root including the version prefix, without a trailing slash.
    pub base_url: String,
    pub timeouts: ClientTimeouts,
    /// Directory holding the durable storage file.
    pub state_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeouts: ClientTimeouts::default(),
            state_dir: default_state_dir(),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `INTERVIEW_API_BASE_URL`: default `http://127.0.0.1:8000/api/v1`
    /// - `INTERVIEW_REQUEST_TIMEOUT_SECS`: default 30
    /// - `INTERVIEW_SPEECH_TIMEOUT_SECS`: default 15
    /// - `INTERVIEW_CONNECT_TIMEOUT_SECS`: default 10
    /// - `INTERVIEW_STATE_DIR`: default `$HOME/.interview-client`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or a timeout is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(
            &std::env::var("INTERVIEW_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned()),
        )?;
        let timeouts = ClientTimeouts {
            request: env_secs("INTERVIEW_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            speech: env_secs("INTERVIEW_SPEECH_TIMEOUT_SECS", DEFAULT_SPEECH_TIMEOUT_SECS)?,
            connect: env_secs("INTERVIEW_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        let state_dir = std::env::var("INTERVIEW_STATE_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map_or_else(default_state_dir, PathBuf::from);

        Ok(Self { base_url, timeouts, state_dir })
    }

    /// Replace the base URL, applying the same validation as [`Self::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not http(s).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }
}

pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn env_secs(var: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue { var, value: raw }),
    }
}

fn default_state_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(DEFAULT_STATE_DIR_NAME)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
