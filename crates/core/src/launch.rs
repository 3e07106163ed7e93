//! Telegram Mini-App launch data: parsing and signature verification.
//!
//! Telegram hands the web app a URL-encoded `initData` string. Its `hash`
//! field is an HMAC-SHA256 over every other field, keyed with a secret
//! derived from the bot token:
//!
//! ```text
//! signing_key = HMAC_SHA256(key = "WebAppData", msg = bot_token)
//! check       = sorted "key=value" lines joined with '\n'
//! hash        = hex(HMAC_SHA256(key = signing_key, msg = check))
//! ```

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::types::{Identity, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed key used to derive the signing key from the bot token.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Identity assumed when an unverified payload carries no user.
///
/// Only ever used under [`VerificationPolicy::Insecure`].
pub const DEV_FALLBACK_IDENTITY: Identity = 1;

/// Default replay window for `auth_date` (7 days).
///
/// Session refreshes resend the launch data of the current launch, so the
/// window must cover a whole session token lifetime.
pub const DEFAULT_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Why a launch payload was rejected.
///
/// The login endpoint reports every variant with the same message so the
/// response cannot be used as an oracle against the verifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LaunchError {
    #[error("Malformed launch data: {0}")]
    MalformedPayload(String),

    #[error("Launch data is not signed")]
    MissingSignature,

    #[error("Launch data signature does not match")]
    InvalidSignature,

    #[error("Launch data is stale ({age_secs}s old)")]
    Expired { age_secs: i64 },
}

/// The Telegram user embedded in the `user` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchUser {
    pub id: Identity,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: Option<bool>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub allows_write_to_pm: Option<bool>,
}

impl LaunchUser {
    fn bare(id: Identity) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            username: None,
            language_code: None,
            is_premium: None,
            photo_url: None,
            allows_write_to_pm: None,
        }
    }
}

/// Launch data that passed the configured verification policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchData {
    pub user: LaunchUser,
    pub auth_date: Option<Timestamp>,
    /// Deep-link start parameter; may carry an inviter's referral code.
    pub start_param: Option<String>,
    pub query_id: Option<String>,
}

/// Already-decoded launch object (the client-side `initDataUnsafe` shape).
///
/// Carries no signature, so it is only accepted in insecure mode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnsignedLaunchData {
    pub user: Option<LaunchUser>,
    pub auth_date: Option<i64>,
    pub start_param: Option<String>,
    pub query_id: Option<String>,
}

/// How strictly incoming launch data is checked.
#[derive(Debug, Clone)]
pub enum VerificationPolicy {
    /// Signature required; `auth_date` checked against `max_age_secs` when set.
    Enforced {
        bot_token: String,
        max_age_secs: Option<i64>,
    },
    /// Local development: no signature, no freshness, fallback identity.
    Insecure { fallback_identity: Identity },
}

/// Validates launch payloads according to a [`VerificationPolicy`].
#[derive(Debug, Clone)]
pub struct Verifier {
    policy: VerificationPolicy,
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

impl Verifier {
    pub fn new(policy: VerificationPolicy) -> Self {
        Self { policy }
    }

    /// Signature-checking verifier. `max_age_secs = None` disables the
    /// freshness check.
    pub fn enforced(bot_token: impl Into<String>, max_age_secs: Option<i64>) -> Self {
        Self::new(VerificationPolicy::Enforced {
            bot_token: bot_token.into(),
            max_age_secs,
        })
    }

    /// Development verifier that skips every cryptographic check.
    pub fn insecure() -> Self {
        Self::new(VerificationPolicy::Insecure {
            fallback_identity: DEV_FALLBACK_IDENTITY,
        })
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self.policy, VerificationPolicy::Insecure { .. })
    }

    /// Verify a raw URL-encoded launch payload.
    pub fn verify(&self, raw: &str, now: Timestamp) -> Result<LaunchData, LaunchError> {
        let mut pairs = parse_pairs(raw);
        let hash = take_field(&mut pairs, "hash");

        let user_json = field(&pairs, "user").map(str::to_owned);

        let user = match (&self.policy, user_json) {
            (VerificationPolicy::Enforced { .. }, None) => {
                return Err(LaunchError::MalformedPayload("user field is missing".into()));
            }
            (VerificationPolicy::Insecure { fallback_identity }, None) => {
                tracing::warn!(
                    identity = fallback_identity,
                    "Launch data has no user, using development fallback identity"
                );
                LaunchUser::bare(*fallback_identity)
            }
            (VerificationPolicy::Enforced { bot_token, max_age_secs }, Some(json)) => {
                let hash = hash.ok_or(LaunchError::MissingSignature)?;
                verify_signature(&pairs, bot_token, &hash)?;
                if let Some(max_age) = max_age_secs {
                    check_freshness(field(&pairs, "auth_date"), *max_age, now)?;
                }
                parse_user(&json)?
            }
            (VerificationPolicy::Insecure { .. }, Some(json)) => parse_user(&json)?,
        };

        let auth_date = field(&pairs, "auth_date")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0));

        Ok(LaunchData {
            user,
            auth_date,
            start_param: non_empty(field(&pairs, "start_param")),
            query_id: non_empty(field(&pairs, "query_id")),
        })
    }

    /// Accept an already-decoded launch object.
    ///
    /// Fails with [`LaunchError::MissingSignature`] unless the verifier is
    /// insecure, since such an object cannot be authenticated.
    pub fn accept_unsigned(&self, data: UnsignedLaunchData) -> Result<LaunchData, LaunchError> {
        let VerificationPolicy::Insecure { fallback_identity } = &self.policy else {
            return Err(LaunchError::MissingSignature);
        };

        let user = data.user.unwrap_or_else(|| {
            tracing::warn!(
                identity = fallback_identity,
                "Unsigned launch data has no user, using development fallback identity"
            );
            LaunchUser::bare(*fallback_identity)
        });

        Ok(LaunchData {
            user,
            auth_date: data
                .auth_date
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0)),
            start_param: non_empty(data.start_param.as_deref()),
            query_id: non_empty(data.query_id.as_deref()),
        })
    }
}

// ---------------------------------------------------------------------------
// Signing primitives
// ---------------------------------------------------------------------------

/// Derive the per-bot signing key: `HMAC_SHA256("WebAppData", bot_token)`.
pub fn signing_key(bot_token: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(WEB_APP_DATA_KEY).expect("HMAC accepts any key length");
    mac.update(bot_token.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Build the data-check string: every pair except `hash`, sorted by key,
/// rendered as `key=value` and joined with `\n`.
pub fn data_check_string<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut lines: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .filter(|(k, _)| *k != "hash")
        .collect();
    lines.sort_by(|a, b| a.0.cmp(b.0));
    lines
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hex-encoded signature of a data-check string.
pub fn sign_data_check_string(check: &str, bot_token: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(&signing_key(bot_token))
        .expect("HMAC accepts any key length");
    mac.update(check.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Produce a complete signed launch payload (URL-encoded, `hash` last).
///
/// This is what Telegram does on its side; it is exposed for local tooling
/// and tests that need payloads the verifier accepts.
pub fn sign_launch_data(pairs: &[(&str, &str)], bot_token: &str) -> String {
    let hash = sign_data_check_string(&data_check_string(pairs), bot_token);
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k, v);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}

fn verify_signature(
    pairs: &[(String, String)],
    bot_token: &str,
    hash: &str,
) -> Result<(), LaunchError> {
    let expected = hex::decode(hash).map_err(|_| LaunchError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(&signing_key(bot_token))
        .expect("HMAC accepts any key length");
    mac.update(data_check_string(pairs).as_bytes());
    // Constant-time comparison.
    mac.verify_slice(&expected)
        .map_err(|_| LaunchError::InvalidSignature)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(raw.trim().as_bytes())
        .into_owned()
        .collect()
}

fn field<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn take_field(pairs: &mut Vec<(String, String)>, key: &str) -> Option<String> {
    let idx = pairs.iter().position(|(k, _)| k == key)?;
    Some(pairs.remove(idx).1)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn parse_user(json: &str) -> Result<LaunchUser, LaunchError> {
    serde_json::from_str(json)
        .map_err(|e| LaunchError::MalformedPayload(format!("user field is not valid: {e}")))
}

fn check_freshness(auth_date: Option<&str>, max_age_secs: i64, now: Timestamp) -> Result<(), LaunchError> {
    let issued: i64 = auth_date
        .ok_or_else(|| LaunchError::MalformedPayload("auth_date is missing".into()))?
        .parse()
        .map_err(|_| LaunchError::MalformedPayload("auth_date is not a timestamp".into()))?;

    let age_secs = now.timestamp() - issued;
    if age_secs >= max_age_secs {
        return Err(LaunchError::Expired { age_secs });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
