//! Session token issuance and validation.
//!
//! Sessions are HS256-signed JWTs carrying a [`SessionClaims`] payload. The
//! managed backend trusts the same secret, so the token doubles as the bearer
//! for its REST API. Tokens are stateless and cannot be revoked short of
//! rotating the secret.

use gemrush_core::types::Identity;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{parse_var, require_var, ConfigError, Lookup};

/// Role claim understood by the backend's row-level policies.
pub const ROLE_AUTHENTICATED: &str = "authenticated";

/// Default session lifetime in days.
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Claims embedded in every session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject: the Telegram identity as a decimal string.
    pub sub: String,
    pub role: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

impl SessionClaims {
    /// The identity in `sub`, if it is numeric.
    pub fn identity(&self) -> Option<Identity> {
        self.sub.parse().ok()
    }
}

/// Configuration for session signing.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret shared with the backend.
    pub secret: String,
    /// Session lifetime in days (default: 7).
    pub session_ttl_days: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
        }
    }

    /// Load session configuration.
    ///
    /// | Env Var              | Required | Default |
    /// |----------------------|----------|---------|
    /// | `SESSION_JWT_SECRET` | **yes**  | --      |
    /// | `SESSION_TTL_DAYS`   | no       | `7`     |
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let secret = require_var(lookup, "SESSION_JWT_SECRET")?;
        let session_ttl_days =
            parse_var(lookup, "SESSION_TTL_DAYS")?.unwrap_or(DEFAULT_SESSION_TTL_DAYS);

        if session_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                name: "SESSION_TTL_DAYS",
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            secret,
            session_ttl_days,
        })
    }

    pub fn session_ttl_secs(&self) -> i64 {
        self.session_ttl_days.saturating_mul(24 * 60 * 60)
    }
}

/// Issue a session token for `identity`, valid from now for the configured
/// number of days.
pub fn issue_session_token(
    identity: Identity,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = SessionClaims {
        sub: identity.to_string(),
        role: ROLE_AUTHENTICATED.to_string(),
        iat: now,
        exp: now + config.session_ttl_secs(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode a session token.
///
/// Checks the signature and `exp`.
pub fn validate_session_token(
    token: &str,
    config: &JwtConfig,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}
