//! Interview session state and the calls that move it forward.
//!
//! DESIGN
//! ======
//! The current session, its transcript, and its evaluation live in one watch
//! channel so every reader sees a consistent triple. The client never picks
//! a stage itself: the stage is whatever `create`, `start`, `message`, or
//! `finalize` last reported, stored verbatim. Replies for a session that is
//! no longer current are handed back to the caller but not applied.
//!
//! The user's own answer is not appended locally on send. The transcript is
//! what the backend returns; [`InterviewService::refresh_messages`] is the
//! way to reconcile after concurrent sends.

#[cfg(test)]
#[path = "interview_test.rs"]
mod interview_test;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::net::api::Api;
use crate::net::error::ApiError;
use crate::net::types::{
    Evaluation, InterviewSession, InterviewerReply, Message, SessionConfig, SessionSummary, Stage,
};
use crate::storage::{self, Storage, keys};

/// Consistent view of the current interview.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewSnapshot {
    pub session: Option<InterviewSession>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub evaluation: Option<Evaluation>,
}

impl InterviewSnapshot {
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    #[must_use]
    pub fn stage(&self) -> Option<&Stage> {
        self.session.as_ref().map(|s| &s.stage)
    }

    /// True once the backend has moved the session to `done`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.stage().is_some_and(Stage::is_terminal)
    }
}

#[derive(Clone)]
pub struct InterviewStore {
    state: Arc<watch::Sender<InterviewSnapshot>>,
    storage: Arc<dyn Storage>,
}

impl InterviewStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (state, _) = watch::channel(InterviewSnapshot::default());
        Self { state: Arc::new(state), storage }
    }

    /// Reload the persisted snapshot, if one exists.
    pub fn restore(&self) {
        if let Some(snapshot) = storage::load_json::<InterviewSnapshot>(self.storage.as_ref(), keys::INTERVIEW_SESSION) {
            self.state.send_replace(snapshot);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> InterviewSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<InterviewSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current_id(&self) -> Option<String> {
        self.state.borrow().session_id().map(str::to_owned)
    }

    /// Make `session` current, dropping the previous transcript and result.
    pub fn set_session(&self, session: InterviewSession) {
        self.update(|s| {
            *s = InterviewSnapshot { session: Some(session), messages: Vec::new(), evaluation: None };
        });
    }

    /// Forget the current session entirely.
    pub fn clear(&self) {
        self.update(|s| *s = InterviewSnapshot::default());
    }

    /// Apply `f` only if `session_id` is still the current session.
    fn apply_for(&self, session_id: &str, f: impl FnOnce(&mut InterviewSnapshot)) -> bool {
        let applied = self.state.send_if_modified(|s| {
            if s.session_id() != Some(session_id) {
                return false;
            }
            f(s);
            true
        });
        if applied {
            self.persist();
        } else {
            tracing::debug!(%session_id, "ignoring update for a session that is no longer current");
        }
        applied
    }

    fn apply_reply(&self, session_id: &str, reply: &InterviewerReply) {
        self.apply_for(session_id, |s| {
            s.messages.push(reply.message.clone());
            if let (Some(stage), Some(session)) = (&reply.stage, s.session.as_mut()) {
                session.stage = stage.clone();
            }
        });
    }

    fn update(&self, f: impl FnOnce(&mut InterviewSnapshot)) {
        self.state.send_modify(f);
        self.persist();
    }

    fn persist(&self) {
        let snapshot = self.snapshot();
        if snapshot.session.is_some() {
            storage::save_json(self.storage.as_ref(), keys::INTERVIEW_SESSION, &snapshot);
        } else {
            self.storage.remove(keys::INTERVIEW_SESSION);
        }
    }
}

/// Backend calls that create and advance interview sessions, applied to an
/// [`InterviewStore`].
#[derive(Clone)]
pub struct InterviewService {
    api: Api,
    store: InterviewStore,
}

impl InterviewService {
    pub fn new(api: Api, store: InterviewStore) -> Self {
        Self { api, store }
    }

    #[must_use]
    pub fn store(&self) -> &InterviewStore {
        &self.store
    }

    /// Create a session and make it current.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error; the store is left unchanged.
    pub async fn create_session(&self, config: &SessionConfig) -> Result<InterviewSession, ApiError> {
        let session = self.api.create_session(config).await?;
        tracing::info!(session_id = %session.id, stage = %session.stage, "interview session created");
        self.store.set_session(session.clone());
        Ok(session)
    }

    /// Ask the interviewer for the opening message.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn start_session(&self, session_id: &str) -> Result<Message, ApiError> {
        let reply = self.api.start_session(session_id).await?;
        self.store.apply_reply(session_id, &reply);
        Ok(reply.message)
    }

    /// Send the user's answer and record the interviewer's reply.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn send_message(&self, session_id: &str, content: &str) -> Result<Message, ApiError> {
        let reply = self.api.send_message(session_id, content).await?;
        self.store.apply_reply(session_id, &reply);
        Ok(reply.message)
    }

    /// Replace the local transcript with the backend's.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn refresh_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError> {
        let messages = self.api.session_messages(session_id).await?;
        self.store
            .apply_for(session_id, |s| s.messages.clone_from(&messages));
        Ok(messages)
    }

    /// Finalize the session and record its evaluation.
    ///
    /// Finalizing an already finished session is passed through: whatever the
    /// backend answers, the same evaluation or an error, is what the caller
    /// gets.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error; a previously stored evaluation
    /// is kept.
    pub async fn finalize_session(&self, session_id: &str) -> Result<Evaluation, ApiError> {
        let evaluation = self.api.finalize_session(session_id).await?;
        self.store.apply_for(session_id, |s| {
            if let (Some(stage), Some(session)) = (&evaluation.stage, s.session.as_mut()) {
                session.stage = stage.clone();
            }
            s.evaluation = Some(evaluation.clone());
        });
        Ok(evaluation)
    }

    /// Fetch the evaluation detail for any past session.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn load_results(&self, session_id: &str) -> Result<Evaluation, ApiError> {
        let evaluation = self.api.session_results(session_id).await?;
        self.store.apply_for(session_id, |s| {
            if s.evaluation.is_none() {
                s.evaluation = Some(evaluation.clone());
            }
        });
        Ok(evaluation)
    }

    /// # Errors
    ///
    /// Returns the normalized backend error.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ApiError> {
        self.api.list_sessions().await
    }

    /// Drop the current session locally. Nothing is sent to the backend.
    pub fn discard(&self) {
        if let Some(id) = self.store.current_id() {
            tracing::debug!(session_id = %id, "discarding interview session");
        }
        self.store.clear();
    }
}
