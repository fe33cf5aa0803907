//! Wire DTOs for the REST backend.
//!
//! DESIGN
//! ======
//! Field names follow the backend's snake_case JSON. Identifiers are held as
//! strings; the backend is free to send them as JSON numbers and they are
//! normalized on the way in. Optional fields default so older or leaner
//! backend builds still decode.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// AUTH
// =============================================================================

/// A user profile as returned by `/users/me` and `/auth/verify`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend user identifier.
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Preferred interview role (e.g. `"backend engineer"`).
    #[serde(default)]
    pub role_preference: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_admin: bool,
    /// Open-ended preference bag (target companies, difficulty, voice, ...).
    #[serde(default)]
    pub preferences: Map<String, Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl User {
    /// Name to show in greetings: full name when set, else the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Partial profile update for `PATCH /users/me`. Also the shape stashed
/// locally between signup and verification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Map<String, Value>>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.role_preference.is_none() && self.preferences.is_none()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<&'a str>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SignupResponse {
    #[serde(default)]
    pub message: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerifyRequest<'a> {
    pub email: &'a str,
    pub code: &'a str,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct VerifyResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

#[derive(Clone, Debug, Serialize)]
pub struct EmailRequest<'a> {
    pub email: &'a str,
}

/// Generic `{message}` acknowledgement.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

// =============================================================================
// INTERVIEW SESSIONS
// =============================================================================

/// Backend-assigned progress label of an interview session.
///
/// Ordering among the in-progress stages is backend policy; the client only
/// distinguishes [`Stage::Done`] (terminal) from everything else.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    Warmup,
    Behavioral,
    Main,
    Intro,
    Question,
    Followup,
    Evaluation,
    Done,
    /// A stage label this client does not know yet. Still in progress.
    Other(String),
}

impl Stage {
    /// True only for the terminal `done` stage.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Warmup => "warmup",
            Self::Behavioral => "behavioral",
            Self::Main => "main",
            Self::Intro => "intro",
            Self::Question => "question",
            Self::Followup => "followup",
            Self::Evaluation => "evaluation",
            Self::Done => "done",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for Stage {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "warmup" => Self::Warmup,
            "behavioral" => Self::Behavioral,
            "main" => Self::Main,
            "intro" => Self::Intro,
            "question" => Self::Question,
            "followup" => Self::Followup,
            "evaluation" => Self::Evaluation,
            "done" => Self::Done,
            _ => Self::Other(raw),
        }
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interview configuration chosen before a session starts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interviewer_id: Option<String>,
}

/// A session object as returned by `POST /sessions`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub company_style: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Interviewer persona reference.
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub interviewer_id: Option<String>,
    pub stage: Stage,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Row of `GET /sessions`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub role: String,
    pub stage: Stage,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub overall_score: Option<f64>,
}

/// Who authored a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Interviewer,
    #[serde(alias = "user", alias = "candidate")]
    Student,
    #[serde(other)]
    Other,
}

/// One transcript entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Interviewer message returned by `start` and `message`, optionally carrying
/// the stage the backend moved the session to.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InterviewerReply {
    #[serde(flatten)]
    pub message: Message,
    #[serde(default)]
    pub stage: Option<Stage>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub content: &'a str,
}

/// Terminal scoring artifact of a finalized session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(deserialize_with = "deserialize_id")]
    pub session_id: String,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub overall_score: Option<f64>,
    /// Stage reported alongside the evaluation, when the backend sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

// =============================================================================
// AI
// =============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<&'a str>,
}

/// Synthesized speech; `audio` is base64 as delivered by the backend.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SpeechClip {
    pub audio: String,
    #[serde(default)]
    pub format: Option<String>,
}

// =============================================================================
// ID NORMALIZATION
// =============================================================================

fn id_from_value<E: serde::de::Error>(value: Value) -> Result<String, E> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(E::custom("expected string or integer id")),
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    id_from_value(Value::deserialize(deserializer)?)
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        other => id_from_value::<D::Error>(other).map(Some),
    }
}
