//! Client core for the interview-practice application.
//!
//! SYSTEM CONTEXT
//! ==============
//! Everything between the user-facing front end and the REST backend lives
//! here: durable client storage, the authenticated REST client, the auth
//! session store with its hydration-aware bootstrapper, and the interview
//! session store. Front ends (the `interview-cli` crate today) build one
//! [`AppContext`] at startup and hand its parts to whatever needs them.

pub mod app;
pub mod config;
pub mod net;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use app::AppContext;
pub use config::ClientConfig;
pub use net::client::{LogNavigator, Navigator, RestClient};
pub use net::error::ApiError;
pub use net::types::{Evaluation, InterviewSession, Message, MessageRole, SessionConfig, Stage, User};
pub use state::auth::{AuthState, AuthStore};
pub use state::bootstrap::{AuthBootstrapper, AuthView};
pub use state::interview::{InterviewService, InterviewStore};
pub use state::signup::AuthFlow;
pub use storage::{FileStorage, MemoryStorage, Storage};
