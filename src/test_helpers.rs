//! Shared fakes for unit tests: a scripted transport, a recording navigator,
//! and a fixture wiring them into a [`RestClient`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};

use crate::net::client::{Navigator, RestClient};
use crate::net::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::storage::MemoryStorage;

pub const BASE_URL: &str = "http://backend.test/api/v1";

struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Result<HttpResponse, TransportError>>,
    last: Option<Result<HttpResponse, TransportError>>,
}

/// Transport answering from per-route reply queues. Once a route's queue is
/// drained its last reply repeats; unscripted routes answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, method: Method, path: &str, status: u16, body: Value) {
        let body = if body.is_null() { String::new() } else { body.to_string() };
        self.push(method, path, Ok(HttpResponse { status, body }));
    }

    pub fn fail(&self, method: Method, path: &str, error: TransportError) {
        self.push(method, path, Err(error));
    }

    fn push(&self, method: Method, path: &str, reply: Result<HttpResponse, TransportError>) {
        let mut routes = self.routes.lock().unwrap();
        if let Some(route) = routes.iter_mut().find(|r| r.method == method && r.path == path) {
            route.replies.push_back(reply);
        } else {
            routes.push(Route { method, path: path.to_owned(), replies: VecDeque::from([reply]), last: None });
        }
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of requests sent to `method path`.
    pub fn count(&self, method: &Method, path: &str) -> usize {
        let url = format!("{BASE_URL}{path}");
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.method == method && r.url == url)
            .count()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        let path = request.url.strip_prefix(BASE_URL).unwrap_or(&request.url).to_owned();

        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes.iter_mut().find(|r| r.method == request.method && r.path == path) else {
            return Ok(HttpResponse { status: 404, body: json!({ "detail": "Not Found" }).to_string() });
        };
        if let Some(reply) = route.replies.pop_front() {
            route.last = Some(reply.clone());
            return reply;
        }
        route.last.clone().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_owned());
    }
}

pub struct Fixture {
    pub storage: MemoryStorage,
    pub transport: Arc<ScriptedTransport>,
    pub navigator: Arc<RecordingNavigator>,
    pub client: RestClient,
}

pub fn fixture() -> Fixture {
    let storage = MemoryStorage::new();
    let transport = ScriptedTransport::new();
    let navigator = Arc::new(RecordingNavigator::default());
    let client = RestClient::new(
        BASE_URL,
        transport.clone(),
        Arc::new(storage.clone()),
        navigator.clone(),
        Duration::from_secs(30),
    );
    Fixture { storage, transport, navigator, client }
}

pub fn user_json(email: &str) -> Value {
    json!({
        "id": 1,
        "email": email,
        "full_name": "Test User",
        "role_preference": "backend",
        "is_verified": true,
        "preferences": {}
    })
}
