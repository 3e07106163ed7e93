use std::net::SocketAddr;
use std::sync::Arc;

use gemrush_api::config::{ServerConfig, UserStoreBackend};
use gemrush_api::router::build_app_router;
use gemrush_api::state::AppState;
use gemrush_baas::{BaasClient, RestUserStore};
use gemrush_core::store::memory::MemoryUserStore;
use gemrush_core::store::UserStore;
use gemrush_db::PgUserStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemrush_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    if config.launch.bot_token.is_none() {
        tracing::warn!("TELEGRAM_BOT_TOKEN is not set; launch data signatures are NOT verified");
    }

    // --- User store ---
    let store = match connect_store(&config.user_store).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialise user store");
            std::process::exit(1);
        }
    };

    // --- Router ---
    let addr = match config.host.parse() {
        Ok(ip) => SocketAddr::new(ip, config.port),
        Err(e) => {
            tracing::error!(host = %config.host, error = %e, "Invalid HOST address");
            std::process::exit(1);
        }
    };
    let app = build_app_router(AppState::new(config, store));

    // --- Start server ---
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Build the configured [`UserStore`]. The Postgres backend is
/// health-checked and migrated before use.
async fn connect_store(backend: &UserStoreBackend) -> Result<Arc<dyn UserStore>, String> {
    match backend {
        UserStoreBackend::Rest {
            url,
            service_role_key,
        } => {
            tracing::info!(%url, "Using REST user store");
            let client = BaasClient::new(url.clone(), service_role_key.clone());
            Ok(Arc::new(RestUserStore::new(client)))
        }
        UserStoreBackend::Postgres { database_url } => {
            let pool = gemrush_db::create_pool(database_url)
                .await
                .map_err(|e| format!("Failed to connect to database: {e}"))?;
            tracing::info!("Database connection pool created");

            gemrush_db::health_check(&pool)
                .await
                .map_err(|e| format!("Database health check failed: {e}"))?;

            gemrush_db::run_migrations(&pool)
                .await
                .map_err(|e| format!("Failed to run database migrations: {e}"))?;
            tracing::info!("Database migrations applied");

            Ok(Arc::new(PgUserStore::new(pool)))
        }
        UserStoreBackend::Memory => {
            tracing::warn!("Using in-memory user store; users are lost on restart");
            Ok(Arc::new(MemoryUserStore::new()))
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
