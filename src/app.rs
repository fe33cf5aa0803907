//! Application context.
//!
//! DESIGN
//! ======
//! `AppContext` is built once at startup and handed to whatever needs it.
//! There are no module-level singletons: the REST client, the stores, and
//! the flows all share one durable [`Storage`] and one [`Navigator`] passed
//! in here, so tests can swap either for a fake.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::net::api::Api;
use crate::net::client::{LOGIN_PATH, Navigator, RestClient};
use crate::net::transport::{Transport, TransportError};
use crate::state::admin::AdminCredentials;
use crate::state::auth::AuthStore;
use crate::state::bootstrap::AuthBootstrapper;
use crate::state::interview::{InterviewService, InterviewStore};
use crate::state::signup::AuthFlow;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppContext {
    pub config: ClientConfig,
    pub storage: Arc<dyn Storage>,
    pub api: Api,
    pub auth: AuthStore,
    pub auth_flow: AuthFlow,
    pub bootstrapper: Arc<AuthBootstrapper>,
    pub interview: InterviewService,
    pub admin: AdminCredentials,
}

impl AppContext {
    /// Wire every component over a reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, TransportError> {
        let auth = AuthStore::new(storage.clone());
        let navigator = ExpireOnRedirect::wrap(&auth, navigator);
        let client = RestClient::from_config(&config, storage.clone(), navigator)?;
        Ok(Self::assemble(config, storage, auth, client))
    }

    /// Wire every component over an explicit transport.
    pub fn with_transport(
        config: ClientConfig,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let auth = AuthStore::new(storage.clone());
        let navigator = ExpireOnRedirect::wrap(&auth, navigator);
        let client = RestClient::new(&config.base_url, transport, storage.clone(), navigator, config.timeouts.request);
        Self::assemble(config, storage, auth, client)
    }

    fn assemble(config: ClientConfig, storage: Arc<dyn Storage>, auth: AuthStore, client: RestClient) -> Self {
        let api = Api::new(client, config.timeouts.speech);
        let auth_flow = AuthFlow::new(api.clone(), auth.clone(), storage.clone());
        let bootstrapper = Arc::new(AuthBootstrapper::new(auth.clone(), Arc::new(api.clone())));
        let interview = InterviewService::new(api.clone(), InterviewStore::new(storage.clone()));
        let admin = AdminCredentials::new(storage.clone());
        Self { config, storage, api, auth, auth_flow, bootstrapper, interview, admin }
    }

    /// REST client that attaches the admin credential instead of the user's.
    #[must_use]
    pub fn admin_client(&self) -> RestClient {
        self.api.client().for_admin()
    }

    /// Hydrate persisted state and run the first bootstrap pass.
    ///
    /// After this returns the auth view is no longer `Loading`: either the
    /// stored credential produced a profile, or it was discarded.
    pub async fn start(&self) {
        self.auth.hydrate();
        self.interview.store().restore();
        self.bootstrapper.reconcile().await;
    }
}

/// Logs the auth store out before a forced redirect to the login screen.
///
/// A browser reload would wipe in-memory state on its own; here the store
/// outlives the navigation, and a stale token left in it would be written
/// back to storage on the next change.
struct ExpireOnRedirect {
    auth: AuthStore,
    inner: Arc<dyn Navigator>,
}

impl ExpireOnRedirect {
    fn wrap(auth: &AuthStore, inner: Arc<dyn Navigator>) -> Arc<dyn Navigator> {
        Arc::new(Self { auth: auth.clone(), inner })
    }
}

impl Navigator for ExpireOnRedirect {
    fn navigate(&self, path: &str) {
        if path == LOGIN_PATH {
            let state = self.auth.snapshot();
            if state.is_authenticated() || state.has_profile() {
                self.auth.logout();
            }
        }
        self.inner.navigate(path);
    }
}

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;
