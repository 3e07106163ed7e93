//! Handlers for login and session introspection.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use gemrush_core::error::CoreError;
use gemrush_core::launch::{LaunchError, UnsignedLaunchData};
use gemrush_core::referral::{ReferralResolver, Resolution};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::issue_session_token;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// The `initData` field: the raw signed query string, or (insecure mode
/// only) an already-decoded launch object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InitDataInput {
    Raw(String),
    Unsigned(UnsignedLaunchData),
}

/// Request body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "initData", default)]
    pub init_data: Option<InitDataInput>,
    /// Explicit referral code; takes precedence over the launch `start_param`.
    #[serde(rename = "referralCode", default)]
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub sub: String,
    pub role: String,
    pub exp: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /login (also /api/v1/auth/login)
///
/// Verify the launch payload, create the user on first sight and return a
/// session token. Every payload problem, including an unreadable body,
/// answers 400 with the same message.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(input) =
        body.map_err(|rejection| LaunchError::MalformedPayload(rejection.body_text()))?;

    // 1. Authenticate the launch payload.
    let launch = match input.init_data {
        Some(InitDataInput::Raw(raw)) if !raw.trim().is_empty() => {
            state.verifier.verify(&raw, Utc::now())?
        }
        Some(InitDataInput::Unsigned(data)) => state.verifier.accept_unsigned(data)?,
        _ => return Err(LaunchError::MalformedPayload("initData is missing".into()).into()),
    };
    let identity = launch.user.id;

    // 2. Create the user on first login, honouring the referral code.
    let inbound_code = input
        .referral_code
        .as_deref()
        .filter(|code| !code.trim().is_empty())
        .or(launch.start_param.as_deref());

    let resolution = ReferralResolver::new(state.store.as_ref())
        .resolve(identity, inbound_code)
        .await?;

    if let Resolution::Created { referrer, .. } = &resolution {
        tracing::info!(identity, referrer = ?referrer, "Registered new user");
    }

    // 3. Issue the session.
    let token = issue_session_token(identity, &state.config.jwt).map_err(|e| {
        AppError::Core(CoreError::Internal(format!(
            "Failed to issue session token: {e}"
        )))
    })?;

    tracing::info!(identity, "Session issued");
    Ok(Json(LoginResponse { token }))
}

/// GET /api/v1/auth/session
///
/// Echo the claims of the presented session token.
pub async fn session(session: AuthSession) -> Json<SessionInfo> {
    Json(SessionInfo {
        sub: session.identity.to_string(),
        role: session.role,
        exp: session.expires_at,
    })
}
