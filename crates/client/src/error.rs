use gemrush_baas::BaasError;
use gemrush_core::error::CoreError;

/// Errors surfaced to the game UI.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The login service rejected the launch data or failed.
    #[error("Login failed ({status}): {detail}")]
    Login { status: u16, detail: String },

    /// The login service answered 2xx without a token.
    #[error("Login response carried no token")]
    MissingToken,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Backend(#[from] BaasError),

    /// `start_mining` was refused; the message is also kept for display.
    #[error("Failed to start mining: {0}")]
    MiningSession(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
