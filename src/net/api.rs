//! Typed wrappers for every backend endpoint the client consumes.
//!
//! ERROR HANDLING
//! ==============
//! Every call returns `Result<_, ApiError>`; the 401 redirect rule is already
//! applied by the underlying [`RestClient`] before an error reaches here.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use super::client::RestClient;
use super::error::ApiError;
use super::types::{
    ChatReply, ChatRequest, EmailRequest, Evaluation, InterviewSession, InterviewerReply, LoginRequest, Message,
    MessageResponse, ProfileUpdate, SendMessageRequest, SessionConfig, SessionSummary, SignupRequest,
    SignupResponse, SpeechClip, SpeechRequest, TokenResponse, User, VerifyRequest, VerifyResponse,
};

fn session_messages_endpoint(session_id: &str) -> String {
    format!("/sessions/{session_id}/messages")
}

fn session_start_endpoint(session_id: &str) -> String {
    format!("/sessions/{session_id}/start")
}

fn session_message_endpoint(session_id: &str) -> String {
    format!("/sessions/{session_id}/message")
}

fn session_finalize_endpoint(session_id: &str) -> String {
    format!("/sessions/{session_id}/finalize")
}

fn session_results_endpoint(session_id: &str) -> String {
    format!("/analytics/sessions/{session_id}/results")
}

#[derive(Clone)]
pub struct Api {
    client: RestClient,
    speech_timeout: Duration,
}

impl Api {
    #[must_use]
    pub fn new(client: RestClient, speech_timeout: Duration) -> Self {
        Self { client, speech_timeout }
    }

    #[must_use]
    pub fn client(&self) -> &RestClient {
        &self.client
    }

    // =========================================================================
    // AUTH
    // =========================================================================

    /// `POST /auth/signup`.
    ///
    /// # Errors
    ///
    /// 400 for a duplicate email, 422 for missing fields.
    pub async fn signup(&self, email: &str, password: &str, full_name: Option<&str>) -> Result<SignupResponse, ApiError> {
        self.client
            .post("/auth/signup", &SignupRequest { email, password, full_name })
            .await
    }

    /// `POST /auth/login`.
    ///
    /// # Errors
    ///
    /// 401 for bad credentials, 403 for an unverified account.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        self.client
            .post("/auth/login", &LoginRequest { email, password })
            .await
    }

    /// `POST /auth/verify`.
    ///
    /// # Errors
    ///
    /// 400 for a bad or expired code.
    pub async fn verify(&self, email: &str, code: &str) -> Result<VerifyResponse, ApiError> {
        self.client
            .post("/auth/verify", &VerifyRequest { email, code })
            .await
    }

    /// `POST /auth/resend-verification`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn resend_verification(&self, email: &str) -> Result<MessageResponse, ApiError> {
        self.client
            .post("/auth/resend-verification", &EmailRequest { email })
            .await
    }

    // =========================================================================
    // PROFILE
    // =========================================================================

    /// `GET /users/me`.
    ///
    /// # Errors
    ///
    /// 401 when the stored credential is missing or invalid.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.client.get("/users/me").await
    }

    /// `PATCH /users/me`.
    ///
    /// # Errors
    ///
    /// 401 when the stored credential is missing or invalid.
    pub async fn update_me(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.client.patch("/users/me", update).await
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// `POST /sessions`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn create_session(&self, config: &SessionConfig) -> Result<InterviewSession, ApiError> {
        self.client.post("/sessions", config).await
    }

    /// `GET /sessions`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ApiError> {
        self.client.get("/sessions").await
    }

    /// `GET /sessions/{id}/messages`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn session_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError> {
        self.client
            .get(&session_messages_endpoint(session_id))
            .await
    }

    /// `POST /sessions/{id}/start`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn start_session(&self, session_id: &str) -> Result<InterviewerReply, ApiError> {
        self.client
            .post(&session_start_endpoint(session_id), &serde_json::json!({}))
            .await
    }

    /// `POST /sessions/{id}/message`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn send_message(&self, session_id: &str, content: &str) -> Result<InterviewerReply, ApiError> {
        self.client
            .post(&session_message_endpoint(session_id), &SendMessageRequest { content })
            .await
    }

    /// `POST /sessions/{id}/finalize`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn finalize_session(&self, session_id: &str) -> Result<Evaluation, ApiError> {
        self.client
            .post(&session_finalize_endpoint(session_id), &serde_json::json!({}))
            .await
    }

    /// `GET /analytics/sessions/{id}/results`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn session_results(&self, session_id: &str) -> Result<Evaluation, ApiError> {
        self.client
            .get(&session_results_endpoint(session_id))
            .await
    }

    // =========================================================================
    // AI
    // =========================================================================

    /// `POST /ai/chat`.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn chat(&self, message: &str) -> Result<ChatReply, ApiError> {
        self.client.post("/ai/chat", &ChatRequest { message }).await
    }

    /// `POST /ai/speech`, bounded by the shorter speech timeout.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error; a timeout reads as status 0.
    pub async fn synthesize_speech(&self, text: &str, voice: Option<&str>) -> Result<SpeechClip, ApiError> {
        self.client
            .post_with_timeout("/ai/speech", &SpeechRequest { text, voice }, self.speech_timeout)
            .await
    }
}
