//! Admin credential namespace.
//!
//! Admin tokens live under their own storage key so an admin session never
//! overwrites, or is cleared by, the regular user session. Requests made
//! with [`RestClient::for_admin`](crate::net::client::RestClient::for_admin)
//! attach this token.

use std::sync::Arc;

use crate::storage::{Storage, keys};

#[derive(Clone)]
pub struct AdminCredentials {
    storage: Arc<dyn Storage>,
}

impl AdminCredentials {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.storage.get(keys::ADMIN_TOKEN).filter(|t| !t.is_empty())
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }

    pub fn set_token(&self, token: &str) {
        self.storage.set(keys::ADMIN_TOKEN, token);
    }

    pub fn clear(&self) {
        self.storage.remove(keys::ADMIN_TOKEN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::auth::AuthStore;
    use crate::storage::MemoryStorage;

    #[test]
    fn admin_token_is_independent_of_user_session() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let admin = AdminCredentials::new(storage.clone());
        let store = AuthStore::new(storage.clone());
        store.hydrate();

        admin.set_token("admin-tok");
        store.set_token(Some("user-tok".to_owned()));
        store.logout();

        assert_eq!(admin.token().as_deref(), Some("admin-tok"));
        admin.clear();
        assert!(!admin.is_signed_in());
    }

    #[test]
    fn empty_token_reads_as_signed_out() {
        let admin = AdminCredentials::new(Arc::new(MemoryStorage::new()));
        admin.set_token("");
        assert!(!admin.is_signed_in());
    }
}
