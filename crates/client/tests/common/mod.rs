//! In-process fake of the login service and the backend RPC surface.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use gemrush_baas::BaasClient;
use gemrush_client::{LaunchCredentials, LoginClient, SessionStore};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

pub const ANON_KEY: &str = "anon-key";
pub const INIT_DATA: &str = "user=%7B%22id%22%3A42%7D&auth_date=1&hash=00";

/// A session token for identity 42 expiring `ttl_secs` from now.
pub fn session_token(ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    encode(
        &Header::default(),
        &json!({ "sub": "42", "role": "authenticated", "iat": now, "exp": now + ttl_secs }),
        &EncodingKey::from_secret(b"server-secret"),
    )
    .unwrap()
}

#[derive(Debug, Clone)]
pub struct RpcCall {
    pub name: String,
    pub args: Value,
    pub authorization: Option<String>,
}

#[derive(Default)]
pub struct FakeState {
    pub login_bodies: Mutex<Vec<Value>>,
    /// Response for `/login`; `None` issues a fresh seven-day token.
    pub login_response: Mutex<Option<(StatusCode, Value)>>,
    pub rpc_calls: Mutex<Vec<RpcCall>>,
    pub rpc_results: Mutex<HashMap<String, Value>>,
    pub rpc_failures: Mutex<HashMap<String, (StatusCode, Value)>>,
}

pub struct FakeServer {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeServer {
    pub fn set_rpc_result(&self, name: &str, value: Value) {
        self.state
            .rpc_results
            .lock()
            .unwrap()
            .insert(name.to_string(), value);
    }

    pub fn fail_rpc(&self, name: &str, status: StatusCode, body: Value) {
        self.state
            .rpc_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), (status, body));
    }

    pub fn set_login_response(&self, status: StatusCode, body: Value) {
        *self.state.login_response.lock().unwrap() = Some((status, body));
    }

    pub fn login_bodies(&self) -> Vec<Value> {
        self.state.login_bodies.lock().unwrap().clone()
    }

    pub fn rpc_calls(&self) -> Vec<RpcCall> {
        self.state.rpc_calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, name: &str) -> Vec<RpcCall> {
        self.rpc_calls()
            .into_iter()
            .filter(|c| c.name == name)
            .collect()
    }

    /// A session store pointed at this fake, not yet signed in.
    pub fn session_store(&self, referral_code: Option<&str>) -> Arc<SessionStore> {
        SessionStore::new(
            BaasClient::new(&self.base_url, ANON_KEY),
            LoginClient::new(&self.base_url),
            LaunchCredentials {
                init_data: INIT_DATA.to_string(),
                referral_code: referral_code.map(str::to_string),
            },
        )
    }
}

pub async fn spawn_fake_server() -> FakeServer {
    let state = Arc::new(FakeState::default());

    let app = Router::new()
        .route("/login", post(login))
        .route("/rest/v1/rpc/{name}", post(rpc))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.login_bodies.lock().unwrap().push(body);

    match state.login_response.lock().unwrap().clone() {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => Json(json!({ "token": session_token(7 * 24 * 60 * 60) })).into_response(),
    }
}

async fn rpc(
    State(state): State<Arc<FakeState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(args): Json<Value>,
) -> Response {
    state.rpc_calls.lock().unwrap().push(RpcCall {
        name: name.clone(),
        args,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    if let Some((status, body)) = state.rpc_failures.lock().unwrap().get(&name).cloned() {
        return (status, Json(body)).into_response();
    }

    let result = state
        .rpc_results
        .lock()
        .unwrap()
        .get(&name)
        .cloned()
        .unwrap_or(Value::Null);
    Json(result).into_response()
}
