use std::sync::Arc;

use gemrush_core::launch::Verifier;
use gemrush_core::store::UserStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// User persistence (REST, Postgres or in-memory).
    pub store: Arc<dyn UserStore>,
    /// Launch-data verifier built from [`crate::config::LaunchConfig`].
    pub verifier: Arc<Verifier>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<dyn UserStore>) -> Self {
        let verifier = Arc::new(config.launch.verifier());
        Self {
            config: Arc::new(config),
            store,
            verifier,
        }
    }
}
