//! Session token cache and the authenticated backend client built from it.
//!
//! The authenticated [`BaasClient`] is built lazily on first use and thrown
//! away whenever the token changes. When the cached token is close to expiry
//! a refresh is started in the background; the caller keeps using the current
//! token, which is stale but still valid.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gemrush_baas::BaasClient;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::ClientError;
use crate::login::LoginClient;

/// Refresh once the token has less than this left (10 minutes).
pub const REFRESH_THRESHOLD_SECS: i64 = 10 * 60;

/// What the player launched the mini-app with.
#[derive(Debug, Clone)]
pub struct LaunchCredentials {
    /// Raw signed launch data.
    pub init_data: String,
    /// Referral code to present at first login, if any.
    pub referral_code: Option<String>,
}

#[derive(Default)]
struct Session {
    token: Option<String>,
    client: Option<Arc<BaasClient>>,
}

/// Owns the session token and the client authenticated with it.
pub struct SessionStore {
    anon: BaasClient,
    login: LoginClient,
    credentials: LaunchCredentials,
    session: RwLock<Session>,
    refreshing: AtomicBool,
}

impl SessionStore {
    /// * `anon` - Backend client authenticated with the public API key only.
    pub fn new(anon: BaasClient, login: LoginClient, credentials: LaunchCredentials) -> Arc<Self> {
        Arc::new(Self {
            anon,
            login,
            credentials,
            session: RwLock::new(Session::default()),
            refreshing: AtomicBool::new(false),
        })
    }

    pub async fn token(&self) -> Option<String> {
        self.session.read().await.token.clone()
    }

    /// Replace the cached token. The authenticated client is rebuilt on next
    /// use. Concurrent writers: the last one wins.
    pub async fn set_token(&self, token: String) {
        let mut session = self.session.write().await;
        session.token = Some(token);
        session.client = None;
    }

    /// Log in with the launch credentials and cache the resulting token.
    pub async fn sign_in(&self) -> Result<(), ClientError> {
        let token = self
            .login
            .login(
                &self.credentials.init_data,
                self.credentials.referral_code.as_deref(),
            )
            .await?;
        self.set_token(token).await;
        tracing::debug!("Signed in");
        Ok(())
    }

    /// `true` while a background refresh is running.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// The client to use for the next backend call.
    ///
    /// Without a token this is the anonymous client. With one, the cached
    /// authenticated client is returned (built on first use) and, if the
    /// token expires within [`REFRESH_THRESHOLD_SECS`] or cannot be decoded,
    /// a background refresh is started.
    pub async fn client(self: &Arc<Self>) -> Arc<BaasClient> {
        {
            let session = self.session.read().await;
            let Some(token) = &session.token else {
                return Arc::new(self.anon.clone());
            };

            let now = chrono::Utc::now().timestamp();
            if expires_within(token, REFRESH_THRESHOLD_SECS, now) {
                self.spawn_refresh();
            }

            if let Some(client) = &session.client {
                return Arc::clone(client);
            }
        }

        let mut session = self.session.write().await;
        if let Some(client) = &session.client {
            return Arc::clone(client);
        }
        let Some(token) = session.token.clone() else {
            return Arc::new(self.anon.clone());
        };

        let client = Arc::new(self.anon.with_bearer(token));
        session.client = Some(Arc::clone(&client));
        client
    }

    /// Start a detached refresh unless one is already in flight. Nothing
    /// awaits or cancels it; failures are only logged.
    fn spawn_refresh(self: &Arc<Self>) {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            return;
        }

        let store = Arc::clone(self);
        tokio::spawn(async move {
            match store.login.login(&store.credentials.init_data, None).await {
                Ok(token) => {
                    store.set_token(token).await;
                    tracing::debug!("Session token refreshed");
                }
                Err(e) => tracing::warn!(error = %e, "Session token refresh failed"),
            }
            store.refreshing.store(false, Ordering::Release);
        });
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Read `exp` from a session token without checking its signature.
pub fn token_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .and_then(|data| data.claims.exp)
}

/// `true` if `token` expires less than `threshold_secs` after `now`, or its
/// expiry cannot be read.
pub fn expires_within(token: &str, threshold_secs: i64, now: i64) -> bool {
    match token_expiry(token) {
        Some(exp) => exp - now < threshold_secs,
        None => true,
    }
}
