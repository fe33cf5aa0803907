use super::*;
use crate::storage::{MemoryStorage, Storage, keys};
use crate::test_helpers::user_json;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;
use tokio::sync::Notify;

// =========================================================================
// MockProfiles
// =========================================================================

struct MockProfiles {
    calls: AtomicUsize,
    result: Mutex<Result<User, ApiError>>,
    gate: Option<Arc<Notify>>,
}

impl MockProfiles {
    fn ok(email: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result: Mutex::new(Ok(serde_json::from_value(user_json(email)).unwrap())),
            gate: None,
        })
    }

    fn err(status: u16) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result: Mutex::new(Err(ApiError::new(status, "nope"))),
            gate: None,
        })
    }

    fn gated(email: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result: Mutex::new(Ok(serde_json::from_value(user_json(email)).unwrap())),
            gate: Some(gate),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProfileSource for MockProfiles {
    async fn fetch_profile(&self) -> Result<User, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.lock().unwrap().clone()
    }
}

fn store() -> (MemoryStorage, AuthStore) {
    let storage = MemoryStorage::new();
    let store = AuthStore::new(Arc::new(storage.clone()));
    (storage, store)
}

// =========================================================================
// reconcile
// =========================================================================

#[tokio::test]
async fn does_nothing_before_hydration() {
    let (_, store) = store();
    store.set_token(Some("tok".to_owned()));
    let profiles = MockProfiles::ok("a@example.com");
    let boot = AuthBootstrapper::new(store.clone(), profiles.clone());

    assert_eq!(boot.reconcile().await, BootstrapStep::AwaitingHydration);
    assert_eq!(profiles.calls(), 0);
    assert!(!boot.is_ready());
    assert_eq!(boot.view(), AuthView::Loading);
}

#[tokio::test]
async fn fetches_profile_for_token_without_user() {
    let (storage, store) = store();
    store.hydrate();
    store.set_token(Some("tok".to_owned()));
    let profiles = MockProfiles::ok("a@example.com");
    let boot = AuthBootstrapper::new(store.clone(), profiles.clone());

    assert_eq!(boot.reconcile().await, BootstrapStep::ProfileLoaded);
    assert_eq!(profiles.calls(), 1);
    assert_eq!(store.user().map(|u| u.email), Some("a@example.com".to_owned()));
    assert!(storage.get(keys::USER).unwrap().contains("a@example.com"));
    assert!(!store.snapshot().loading);
    assert!(boot.is_ready());
    assert_eq!(boot.view(), AuthView::SignedIn);
}

#[tokio::test]
async fn cached_profile_means_zero_fetches() {
    let (_, store) = store();
    store.hydrate();
    store.login("tok".to_owned(), serde_json::from_value(user_json("a@example.com")).unwrap());
    let profiles = MockProfiles::ok("b@example.com");
    let boot = AuthBootstrapper::new(store.clone(), profiles.clone());

    for _ in 0..3 {
        assert_eq!(boot.reconcile().await, BootstrapStep::Skipped);
    }
    assert_eq!(profiles.calls(), 0);
    assert_eq!(store.user().map(|u| u.email), Some("a@example.com".to_owned()));
}

#[tokio::test]
async fn no_token_is_ready_and_signed_out() {
    let (_, store) = store();
    store.hydrate();
    let profiles = MockProfiles::ok("a@example.com");
    let boot = AuthBootstrapper::new(store, profiles.clone());

    assert_eq!(boot.reconcile().await, BootstrapStep::Skipped);
    assert_eq!(profiles.calls(), 0);
    assert_eq!(boot.view(), AuthView::SignedOut);
    assert_eq!(login_redirect(boot.view()), Some(LOGIN_PATH));
}

#[tokio::test]
async fn fetch_failure_logs_out_without_retry() {
    for status in [401, 500, 0] {
        let (storage, store) = store();
        store.hydrate();
        store.set_token(Some("stale".to_owned()));
        let profiles = MockProfiles::err(status);
        let boot = AuthBootstrapper::new(store.clone(), profiles.clone());

        assert_eq!(boot.reconcile().await, BootstrapStep::LoggedOut);
        assert_eq!(boot.reconcile().await, BootstrapStep::Skipped);

        assert_eq!(profiles.calls(), 1, "status {status}");
        let state = store.snapshot();
        assert!(state.token.is_none());
        assert!(state.user.is_none());
        assert!(state.is_hydrated);
        assert!(state.error.is_none());
        assert!(storage.get(keys::TOKEN).is_none());
        assert_eq!(boot.view(), AuthView::SignedOut);
    }
}

#[tokio::test]
async fn concurrent_reconcile_issues_one_fetch() {
    let (_, store) = store();
    store.hydrate();
    store.set_token(Some("tok".to_owned()));
    let gate = Arc::new(Notify::new());
    let profiles = MockProfiles::gated("a@example.com", gate.clone());
    let boot = Arc::new(AuthBootstrapper::new(store.clone(), profiles.clone()));

    let first = tokio::spawn({
        let boot = boot.clone();
        async move { boot.reconcile().await }
    });
    while profiles.calls() == 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(boot.reconcile().await, BootstrapStep::InFlight);
    assert!(!boot.is_ready());

    gate.notify_one();
    assert_eq!(first.await.unwrap(), BootstrapStep::ProfileLoaded);
    assert_eq!(profiles.calls(), 1);
}

#[tokio::test]
async fn result_is_dropped_when_token_changes_mid_fetch() {
    let (_, store) = store();
    store.hydrate();
    store.set_token(Some("old".to_owned()));
    let gate = Arc::new(Notify::new());
    let profiles = MockProfiles::gated("old@example.com", gate.clone());
    let boot = Arc::new(AuthBootstrapper::new(store.clone(), profiles.clone()));

    let pass = tokio::spawn({
        let boot = boot.clone();
        async move { boot.reconcile().await }
    });
    while profiles.calls() == 0 {
        tokio::task::yield_now().await;
    }
    store.logout();
    gate.notify_one();

    assert_eq!(pass.await.unwrap(), BootstrapStep::Discarded);
    assert!(store.user().is_none());
}

// =========================================================================
// run loop
// =========================================================================

#[tokio::test]
async fn run_waits_for_hydration_then_loads_profile() {
    let storage = MemoryStorage::new();
    storage.set(keys::AUTH_STATE, r#"{"token":"persisted","user":null,"is_authenticated":true}"#);
    let store = AuthStore::new(Arc::new(storage.clone()));
    let profiles = MockProfiles::ok("a@example.com");
    let boot = Arc::new(AuthBootstrapper::new(store.clone(), profiles.clone()));

    let runner = tokio::spawn(boot.clone().run());
    tokio::task::yield_now().await;
    assert_eq!(profiles.calls(), 0);
    assert_eq!(boot.view(), AuthView::Loading);

    store.hydrate();
    tokio::time::timeout(std::time::Duration::from_secs(5), boot.wait_ready())
        .await
        .unwrap();
    let mut changes = store.subscribe();
    tokio::time::timeout(std::time::Duration::from_secs(5), changes.wait_for(|s| s.user.is_some()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(profiles.calls(), 1);
    assert_eq!(boot.view(), AuthView::SignedIn);
    runner.abort();
}

// =========================================================================
// auth_view
// =========================================================================

#[test]
fn view_requires_hydration_and_readiness() {
    let mut state = AuthState { token: Some("t".to_owned()), ..AuthState::default() };
    assert_eq!(auth_view(&state, true), AuthView::Loading);
    state.is_hydrated = true;
    assert_eq!(auth_view(&state, false), AuthView::Loading);
    assert_eq!(auth_view(&state, true), AuthView::SignedIn);
    state.token = None;
    assert_eq!(auth_view(&state, true), AuthView::SignedOut);
}

#[test]
fn redirect_only_when_signed_out() {
    assert_eq!(login_redirect(AuthView::Loading), None);
    assert_eq!(login_redirect(AuthView::SignedIn), None);
    assert_eq!(login_redirect(AuthView::SignedOut), Some("/login"));
}
