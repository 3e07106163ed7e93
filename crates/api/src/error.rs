use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gemrush_core::error::CoreError;
use gemrush_core::launch::LaunchError;
use gemrush_core::referral::ReferralError;
use serde_json::json;

/// Message for every rejected launch payload. One message for all causes.
pub const INVALID_INIT_DATA: &str = "Invalid init data";

const INTERNAL_SERVER_ERROR: &str = "Internal server error";

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{ "detail", "code" }` bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The launch payload was rejected by the verifier.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The user store failed while resolving the login.
    #[error(transparent)]
    Referral(#[from] ReferralError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            AppError::Launch(err) => {
                tracing::debug!(reason = %err, "Rejected launch data");
                (
                    StatusCode::BAD_REQUEST,
                    "INVALID_INIT_DATA",
                    INVALID_INIT_DATA.to_string(),
                )
            }

            AppError::Referral(err) => {
                tracing::error!(error = %err, "Login resolution failed");
                internal()
            }

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "detail": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_SERVER_ERROR.to_string(),
    )
}
