//! User store abstraction.
//!
//! The login flow only needs four operations from whatever holds user rows.
//! Implementations live next to their transport: Postgres in `gemrush-db`,
//! the managed backend's REST API in `gemrush-baas`, and [`memory`] here.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::referral::ReferralCode;
use crate::types::{Identity, Timestamp};

/// A stored user row, as far as authentication and referrals care.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Identity,
    pub referral_code: String,
    pub referred_by: Option<Identity>,
    pub total_referrals: i64,
    pub created_at: Option<Timestamp>,
}

/// Insert payload for a first-time user.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub id: Identity,
    pub referral_code: ReferralCode,
    pub referred_by: Option<Identity>,
}

/// Errors a store backend can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row with this identity already exists (e.g. a concurrent first login).
    #[error("User {0} already exists")]
    IdentityTaken(Identity),

    /// The generated referral code collided with an existing one.
    #[error("Referral code is already taken")]
    ReferralCodeTaken,

    #[error("User {0} not found")]
    NotFound(Identity),

    /// Transport or backend failure.
    #[error("User store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence operations used by the login flow.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by identity.
    async fn find_user(&self, id: Identity) -> Result<Option<UserRecord>, StoreError>;

    /// Look up the owner of a referral code.
    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a new user with `total_referrals = 0`.
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StoreError>;

    /// Add one to a user's referral counter.
    async fn increment_referrals(&self, id: Identity) -> Result<(), StoreError>;
}
