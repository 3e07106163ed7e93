//! Shared helpers for the login service integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use gemrush_api::auth::jwt::JwtConfig;
use gemrush_api::config::{LaunchConfig, ServerConfig, UserStoreBackend};
use gemrush_api::router::build_app_router;
use gemrush_api::state::AppState;
use gemrush_core::launch::{sign_launch_data, DEFAULT_MAX_AGE_SECS};
use gemrush_core::store::memory::MemoryUserStore;
use gemrush_core::store::UserStore;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const BOT_TOKEN: &str = "7000000001:AAHtestbottoken";
pub const JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig`. `bot_token = None` puts the verifier in
/// insecure mode.
pub fn test_config(bot_token: Option<&str>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        jwt: JwtConfig::new(JWT_SECRET),
        launch: LaunchConfig {
            bot_token: bot_token.map(str::to_string),
            allow_insecure: bot_token.is_none(),
            max_age_secs: Some(DEFAULT_MAX_AGE_SECS),
        },
        user_store: UserStoreBackend::Memory,
    }
}

/// Full application router over the given store, with signatures enforced.
pub fn build_test_app(store: Arc<dyn UserStore>) -> Router {
    build_app_router(AppState::new(test_config(Some(BOT_TOKEN)), store))
}

/// Full application router in insecure (development) mode.
pub fn build_insecure_app(store: Arc<dyn UserStore>) -> Router {
    build_app_router(AppState::new(test_config(None), store))
}

pub fn memory_store() -> Arc<MemoryUserStore> {
    Arc::new(MemoryUserStore::new())
}

/// A freshly signed launch payload for `identity`, optionally carrying a
/// `start_param`.
pub fn signed_init_data(identity: i64, start_param: Option<&str>) -> String {
    signed_init_data_at(identity, start_param, chrono::Utc::now().timestamp())
}

/// Like [`signed_init_data`], issued at `auth_date` (Unix seconds).
pub fn signed_init_data_at(identity: i64, start_param: Option<&str>, auth_date: i64) -> String {
    let user = format!(r#"{{"id":{identity},"first_name":"Test","username":"tester"}}"#);
    let auth_date = auth_date.to_string();
    let mut pairs = vec![
        ("auth_date", auth_date.as_str()),
        ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
        ("user", user.as_str()),
    ];
    if let Some(param) = start_param {
        pairs.push(("start_param", param));
    }
    sign_launch_data(&pairs, BOT_TOKEN)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
