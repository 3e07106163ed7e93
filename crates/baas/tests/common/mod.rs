//! Shared test helpers: an in-process fake of the backend's REST API.
//!
//! Serves just enough of the table and RPC surface for the client and the
//! user store, and records the auth headers of every request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Auth headers seen on one request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub apikey: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
pub struct FakeState {
    pub users: Mutex<Vec<Value>>,
    pub seen: Mutex<Vec<SeenRequest>>,
    /// Canned results keyed by RPC name. Missing names answer `null`.
    pub rpc_results: Mutex<HashMap<String, Value>>,
    /// When set, every RPC fails with this status and body.
    pub rpc_failure: Mutex<Option<(StatusCode, Value)>>,
    pub rpc_calls: Mutex<Vec<(String, Value)>>,
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeBackend {
    pub fn set_rpc_result(&self, name: &str, value: Value) {
        self.state
            .rpc_results
            .lock()
            .unwrap()
            .insert(name.to_string(), value);
    }

    pub fn fail_rpcs(&self, status: StatusCode, body: Value) {
        *self.state.rpc_failure.lock().unwrap() = Some((status, body));
    }

    pub fn rpc_calls(&self) -> Vec<(String, Value)> {
        self.state.rpc_calls.lock().unwrap().clone()
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.seen.lock().unwrap().clone()
    }

    pub fn users(&self) -> Vec<Value> {
        self.state.users.lock().unwrap().clone()
    }
}

/// Start the fake on an ephemeral port.
pub async fn spawn_fake_backend() -> FakeBackend {
    let state = Arc::new(FakeState::default());

    let app = Router::new()
        .route(
            "/rest/v1/user",
            get(select_users).post(insert_user).patch(update_users),
        )
        .route("/rest/v1/rpc/{name}", post(call_rpc))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeBackend {
        base_url: format!("http://{addr}"),
        state,
    }
}

fn record(state: &FakeState, path: &str, headers: &HeaderMap) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.seen.lock().unwrap().push(SeenRequest {
        path: path.to_string(),
        apikey: header("apikey"),
        authorization: header("authorization"),
    });
}

/// Apply `column=eq.value` filters the way PostgREST would.
fn matches_filters(row: &Value, query: &HashMap<String, String>) -> bool {
    query.iter().all(|(column, filter)| {
        if column == "select" || column == "limit" {
            return true;
        }
        let Some(expected) = filter.strip_prefix("eq.") else {
            return false;
        };
        match row.get(column) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Number(n)) => n.to_string() == expected,
            _ => false,
        }
    })
}

async fn select_users(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    record(&state, "/rest/v1/user", &headers);
    let users = state.users.lock().unwrap();
    Json(
        users
            .iter()
            .filter(|row| matches_filters(row, &query))
            .cloned()
            .collect(),
    )
}

fn unique_violation(constraint: &str) -> Response {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "code": "23505",
            "details": null,
            "hint": null,
            "message": format!("duplicate key value violates unique constraint \"{constraint}\""),
        })),
    )
        .into_response()
}

async fn insert_user(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    record(&state, "/rest/v1/user", &headers);
    let mut users = state.users.lock().unwrap();

    if users.iter().any(|u| u["id"] == body["id"]) {
        return unique_violation("user_pkey");
    }
    if users
        .iter()
        .any(|u| u["referral_code"] == body["referral_code"])
    {
        return unique_violation("uq_user_referral_code");
    }

    body["total_referrals"] = json!(0);
    body["created_at"] = json!("2026-01-01T00:00:00+00:00");
    users.push(body.clone());
    (StatusCode::CREATED, Json(json!([body]))).into_response()
}

async fn update_users(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Json<Vec<Value>> {
    record(&state, "/rest/v1/user", &headers);
    let mut users = state.users.lock().unwrap();
    let mut updated = Vec::new();
    for row in users.iter_mut().filter(|row| matches_filters(row, &query)) {
        if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (k, v) in fields {
                target.insert(k.clone(), v.clone());
            }
        }
        updated.push(row.clone());
    }
    Json(updated)
}

async fn call_rpc(
    State(state): State<Arc<FakeState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(args): Json<Value>,
) -> Response {
    record(&state, &format!("/rest/v1/rpc/{name}"), &headers);
    state.rpc_calls.lock().unwrap().push((name.clone(), args));

    if let Some((status, body)) = state.rpc_failure.lock().unwrap().clone() {
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
