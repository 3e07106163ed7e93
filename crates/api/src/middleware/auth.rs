//! Session-token extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use gemrush_core::error::CoreError;
use gemrush_core::types::Identity;

use crate::auth::jwt::validate_session_token;
use crate::error::AppError;
use crate::state::AppState;

/// Session extracted from a Bearer token in the `Authorization` header.
///
/// ```ignore
/// async fn my_handler(session: AuthSession) -> AppResult<Json<()>> {
///     tracing::info!(identity = session.identity, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    pub role: String,
    /// `exp` claim (UTC Unix timestamp).
    pub expires_at: i64,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_session_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let identity = claims.identity().ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Token subject is not an identity".into()))
        })?;

        Ok(AuthSession {
            identity,
            role: claims.role,
            expires_at: claims.exp,
        })
    }
}
