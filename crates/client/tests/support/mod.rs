// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process API double for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use disker_client::session::{CredentialPair, MemoryStorage};
use disker_client::token::epoch_secs;
use disker_client::{ApiClient, ClientConfig, Connectivity, ConnectivityFlag};

pub const REFRESH: &str = "/api/v1/talents/sessions/refresh";
pub const LOGIN: &str = "/api/v1/talents/sessions";
pub const CAMPAIGNS: &str = "/api/v1/talents/campaigns";
pub const USERS: &str = "/api/v1/talents/users";

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn authorization(&self) -> Option<String> {
        self.headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    pub fn content_type(&self) -> String {
        self.headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    }
}

#[derive(Default)]
struct Route {
    responses: Vec<(u16, String)>,
    served: usize,
    delay: Option<Duration>,
    /// When set, requests without this exact `Authorization` value get a 401.
    require: Option<String>,
}

#[derive(Default)]
struct MockState {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<(String, Recorded)>>,
}

/// Serves scripted `(status, body)` sequences per path. The last response of
/// a script repeats once the script is exhausted; unscripted paths get 404.
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("bind mock server: {e}"));
        let addr = listener.local_addr().unwrap_or_else(|e| panic!("local addr: {e}"));
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn script(&self, path: &str, responses: Vec<(u16, String)>) {
        self.state.routes.lock().entry(path.to_owned()).or_default().responses = responses;
    }

    pub fn delay(&self, path: &str, delay: Duration) {
        self.state.routes.lock().entry(path.to_owned()).or_default().delay = Some(delay);
    }

    /// Answer 401 unless the request carries `Bearer <token>`.
    pub fn require_bearer(&self, path: &str, token: &str) {
        self.state.routes.lock().entry(path.to_owned()).or_default().require =
            Some(format!("Bearer {token}"));
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.requests.lock().iter().filter(|(p, _)| p == path).count()
    }

    pub fn total_hits(&self) -> usize {
        self.state.requests.lock().len()
    }

    pub fn requests(&self, path: &str) -> Vec<Recorded> {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn authorizations(&self, path: &str) -> Vec<Option<String>> {
        self.requests(path).iter().map(Recorded::authorization).collect()
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let path = uri.path().to_owned();
    let recorded =
        Recorded { method, query: uri.query().map(str::to_owned), headers: headers.clone(), body };
    state.requests.lock().push((path.clone(), recorded));

    let (delay, response) = {
        let mut routes = state.routes.lock();
        match routes.get_mut(&path) {
            None => (None, (404, r#"{"meta":{"message":"Not found"}}"#.to_owned())),
            Some(route) => {
                let presented =
                    headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok());
                let authorized = match route.require {
                    Some(ref expected) => presented == Some(expected.as_str()),
                    None => true,
                };
                let response = if !authorized {
                    (401, r#"{"meta":{"message":"Token expired"}}"#.to_owned())
                } else {
                    let idx = route.served.min(route.responses.len().saturating_sub(1));
                    route.served += 1;
                    route.responses.get(idx).cloned().unwrap_or((500, "{}".to_owned()))
                };
                (route.delay, response)
            }
        }
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let (status, body) = response;
    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), body)
}

/// Unsigned token whose payload carries `exp`.
pub fn make_jwt(sub: &str, exp: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "sub": sub, "exp": exp }).to_string());
    format!("{header}.{payload}.sig")
}

/// Token expiring `secs` from now.
pub fn jwt_expiring_in(sub: &str, secs: u64) -> String {
    make_jwt(sub, epoch_secs() + secs)
}

pub fn token_body(access: Option<&str>, refresh: Option<&str>) -> String {
    serde_json::json!({
        "meta": { "message": "ok" },
        "data": {
            "access_token": access,
            "refresh_token": refresh,
            "user": { "id": 7, "email": "ana@example.com", "first_name": "Ana", "last_name": "Ruiz", "role": "talent" }
        }
    })
    .to_string()
}

pub fn campaigns_body() -> String {
    serde_json::json!({
        "meta": { "pagination": {
            "current_page": 1, "page_size": 20, "total_pages": 1,
            "total_count": 1, "has_next_page": false, "has_prev_page": false
        }},
        "data": { "campaigns": [{
            "id": 12, "title": "Summer drop", "status": "active",
            "created_at": "2026-06-01", "launch_date": "2026-07-01",
            "platforms": [{ "name": "Instagram", "short_name": "ig" }]
        }]}
    })
    .to_string()
}

/// Config with fast backoff so retry paths finish quickly.
pub fn fast_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(base_url);
    config.retry_base_ms = 10;
    config.retry_cap_ms = 40;
    config.timeout_ms = 2_000;
    config
}

pub struct Harness {
    pub client: ApiClient,
    pub storage: Arc<MemoryStorage>,
    pub connectivity: Arc<ConnectivityFlag>,
}

pub fn harness(config: ClientConfig) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let connectivity = Arc::new(ConnectivityFlag::new(true));
    let client = ApiClient::with_parts(
        config,
        Arc::clone(&storage) as Arc<dyn disker_client::session::SessionStorage>,
        Arc::clone(&connectivity) as Arc<dyn Connectivity>,
    )
    .expect("http client");
    Harness { client, storage, connectivity }
}

/// Harness whose store already holds the given tokens.
pub fn signed_in(config: ClientConfig, access: &str, refresh: Option<&str>) -> Harness {
    let h = harness(config);
    h.client.store().set_tokens(CredentialPair {
        access_token: Some(access.to_owned()),
        refresh_token: refresh.map(str::to_owned),
    });
    h
}
