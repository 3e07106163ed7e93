pub mod auth;
pub mod health;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/login      login (public)
/// /auth/session    session claims (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/auth", auth::router())
}

/// Routes served at the root, outside `/api/v1`.
///
/// `POST /login` is the path the mini-app has always called.
pub fn root_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .route("/login", post(handlers::auth::login))
}
