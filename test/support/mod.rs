use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex
    },
    time::Duration
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::{
    auth::{CredentialStore, MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY},
    client::ApiClient,
    config::endpoints,
    web::{ApiRequest, Body, Error, Method, RawResponse, Transport}
};

pub const FRESH_TOKEN: &str = "fresh-token";
pub const STALE_TOKEN: &str = "stale-token";
pub const REFRESH_TOKEN: &str = "refresh-1";

#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Body,
    pub query: Vec<(String, String)>
}

/// Scripted backend. Protected routes accept only `FRESH_TOKEN`; the refresh
/// endpoint hands it out for `REFRESH_TOKEN`.
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    overrides: Mutex<HashMap<String, RawResponse>>,
    network_failures: Mutex<Vec<String>>,
    refresh_gate: Option<Arc<Notify>>,
    held: Option<(String, Arc<Notify>)>,
    refresh_rejected: bool,
    rotated_refresh: Option<String>,
    always_unauthorized: bool
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            overrides: Mutex::new(HashMap::new()),
            network_failures: Mutex::new(Vec::new()),
            refresh_gate: None,
            held: None,
            refresh_rejected: false,
            rotated_refresh: None,
            always_unauthorized: false
        }
    }

    /// Holds every refresh call until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.refresh_gate = Some(gate);
        self
    }

    /// Holds the answer to `path` until `gate` is notified, unless the call carries `FRESH_TOKEN`.
    pub fn holding(mut self, path: &str, gate: Arc<Notify>) -> Self {
        self.held = Some((path.to_string(), gate));
        self
    }

    pub fn rejecting_refresh(mut self) -> Self {
        self.refresh_rejected = true;
        self
    }

    pub fn rotating_refresh(mut self, refresh_token: &str) -> Self {
        self.rotated_refresh = Some(refresh_token.to_string());
        self
    }

    pub fn always_unauthorized(mut self) -> Self {
        self.always_unauthorized = true;
        self
    }

    pub fn respond(self, path: &str, status: u16, body: Value) -> Self {
        self.overrides.lock().unwrap().insert(path.to_string(), RawResponse::new(status, body));
        self
    }

    pub fn failing_network(self, path: &str) -> Self {
        self.network_failures.lock().unwrap().push(path.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|call| call.path == path).collect()
    }

    pub fn refresh_calls(&self) -> usize {
        self.calls_to(endpoints::REFRESH).len()
    }

    async fn refresh(&self, request: &ApiRequest) -> RawResponse {
        if let Some(gate) = &self.refresh_gate {
            gate.notified().await;
        }

        let presented = match &request.body {
            Body::Json(body) => body["refresh"].as_str().map(str::to_string),
            _ => None
        };
        if self.refresh_rejected || presented.as_deref() != Some(REFRESH_TOKEN) {
            return RawResponse::new(401, json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" }));
        }

        match &self.rotated_refresh {
            Some(refresh) => RawResponse::new(200, json!({ "access": FRESH_TOKEN, "refresh": refresh })),
            None => RawResponse::new(200, json!({ "access": FRESH_TOKEN }))
        }
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse, Error> {
        self.calls.lock().unwrap().push(Call {
            method: request.method.clone(),
            path: request.path.clone(),
            bearer: bearer.map(str::to_string),
            body: request.body.clone(),
            query: request.options.query.clone()
        });

        if let Some((path, gate)) = &self.held {
            if *path == request.path && bearer != Some(FRESH_TOKEN) {
                gate.notified().await;
            }
        }

        if self.network_failures.lock().unwrap().contains(&request.path) {
            return Err(Error::Network("connection refused".to_string()));
        }
        if let Some(response) = self.overrides.lock().unwrap().get(&request.path) {
            return Ok(response.clone());
        }

        let response = match request.path.as_str() {
            endpoints::REFRESH => self.refresh(request).await,
            endpoints::LOGIN | endpoints::REGISTER => RawResponse::new(
                200,
                json!({
                    "access": STALE_TOKEN,
                    "refresh": REFRESH_TOKEN,
                    "expires_in": 300,
                    "user": { "id": 7, "email": "admin@sail.test", "role": "admin" }
                })
            ),
            endpoints::VERIFY => match &request.body {
                Body::Json(body) if body["token"] == FRESH_TOKEN => RawResponse::new(200, json!({})),
                _ => RawResponse::new(401, json!({ "detail": "Token is invalid or expired" }))
            },
            path if !self.always_unauthorized && bearer == Some(FRESH_TOKEN) => {
                RawResponse::new(200, json!({ "path": path, "token": FRESH_TOKEN }))
            }
            _ => RawResponse::new(401, json!({ "detail": "Given token not valid for any token type" }))
        };
        Ok(response)
    }
}

/// Memory store that counts how often the access token actually got removed.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    access_removals: AtomicUsize,
    writes: AtomicUsize
}

impl CountingStore {
    pub fn access_removals(&self) -> usize {
        self.access_removals.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CredentialStore for CountingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, Error> {
        let removed = self.inner.remove(key)?;
        if removed {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if key == ACCESS_TOKEN_KEY {
                self.access_removals.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(removed)
    }
}

/// Client whose store already holds an expired access token and a valid refresh token.
pub fn client_with(backend: Arc<FakeBackend>, store: Arc<CountingStore>) -> ApiClient {
    store.set(ACCESS_TOKEN_KEY, STALE_TOKEN).unwrap();
    store.set(REFRESH_TOKEN_KEY, REFRESH_TOKEN).unwrap();
    ApiClient::new(backend, store)
}

/// Yields to the runtime until `condition` holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(condition(), "condition was not reached");
}
