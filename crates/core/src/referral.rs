//! Referral codes and first-login referral linking.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::store::{NewUser, StoreError, UserRecord, UserStore};
use crate::types::Identity;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Code alphabet. Leaves out `I J L O Z 0 1 2`, which are easy to misread.
pub const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHKMNPQRSTUVWXY3456789";

/// Length of every referral code.
pub const REFERRAL_CODE_LENGTH: usize = 8;

/// How many fresh codes to try before giving up on a collision streak.
const MAX_CODE_ATTEMPTS: usize = 5;

// ---------------------------------------------------------------------------
// ReferralCode
// ---------------------------------------------------------------------------

/// A well-formed referral code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Draw a random code from [`REFERRAL_CODE_ALPHABET`].
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..REFERRAL_CODE_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..REFERRAL_CODE_ALPHABET.len());
                REFERRAL_CODE_ALPHABET[idx] as char
            })
            .collect();
        Self(code)
    }

    /// Parse user-supplied input. Surrounding whitespace is ignored; anything
    /// that is not exactly [`REFERRAL_CODE_LENGTH`] alphabet characters is
    /// `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let valid = trimmed.len() == REFERRAL_CODE_LENGTH
            && trimmed.bytes().all(|b| REFERRAL_CODE_ALPHABET.contains(&b));
        valid.then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Outcome of [`ReferralResolver::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The identity was already known; nothing changed.
    Existing(UserRecord),
    /// A new user row was created, optionally linked to a referrer.
    Created {
        user: UserRecord,
        referrer: Option<Identity>,
    },
}

impl Resolution {
    pub fn user(&self) -> &UserRecord {
        match self {
            Resolution::Existing(user) => user,
            Resolution::Created { user, .. } => user,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("User store unavailable: {0}")]
    BackendUnavailable(#[from] StoreError),

    #[error("Could not allocate a unique referral code after {attempts} attempts")]
    CodeExhausted { attempts: usize },
}

/// Creates users on first login and records who invited them.
///
/// Not transactional: user creation and the referrer's counter increment
/// are separate store calls, and a failed increment is only logged.
pub struct ReferralResolver<'a> {
    store: &'a dyn UserStore,
}

impl<'a> ReferralResolver<'a> {
    pub fn new(store: &'a dyn UserStore) -> Self {
        Self { store }
    }

    /// Ensure `identity` exists, linking it to the owner of `inbound_code`
    /// if this is its first login.
    pub async fn resolve(
        &self,
        identity: Identity,
        inbound_code: Option<&str>,
    ) -> Result<Resolution, ReferralError> {
        if let Some(existing) = self.store.find_user(identity).await? {
            tracing::debug!(identity, "Known user, skipping referral processing");
            return Ok(Resolution::Existing(existing));
        }

        let referrer = self.find_referrer(identity, inbound_code).await?;

        let user = match self.create_with_fresh_code(identity, referrer).await {
            Ok(user) => user,
            Err(ReferralError::BackendUnavailable(StoreError::IdentityTaken(_))) => {
                // Lost a race with a concurrent first login for the same identity.
                tracing::info!(identity, "User was created concurrently");
                let existing = self
                    .store
                    .find_user(identity)
                    .await?
                    .ok_or(StoreError::NotFound(identity))?;
                return Ok(Resolution::Existing(existing));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            identity,
            referral_code = %user.referral_code,
            referred_by = ?referrer,
            "Created user"
        );

        if let Some(referrer_id) = referrer {
            if let Err(e) = self.store.increment_referrals(referrer_id).await {
                tracing::warn!(
                    referrer = referrer_id,
                    referred = identity,
                    error = %e,
                    "Failed to increment referral counter"
                );
            }
        }

        Ok(Resolution::Created { user, referrer })
    }

    async fn find_referrer(
        &self,
        identity: Identity,
        inbound_code: Option<&str>,
    ) -> Result<Option<Identity>, ReferralError> {
        let Some(raw) = inbound_code else {
            return Ok(None);
        };
        let Some(code) = ReferralCode::parse(raw) else {
            tracing::debug!(identity, code = raw, "Ignoring malformed referral code");
            return Ok(None);
        };

        match self.store.find_by_referral_code(&code).await? {
            Some(owner) if owner.id == identity => {
                tracing::debug!(identity, "Ignoring self-referral");
                Ok(None)
            }
            Some(owner) => Ok(Some(owner.id)),
            None => {
                tracing::debug!(identity, %code, "Referral code does not belong to any user");
                Ok(None)
            }
        }
    }

    async fn create_with_fresh_code(
        &self,
        identity: Identity,
        referred_by: Option<Identity>,
    ) -> Result<UserRecord, ReferralError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let new_user = NewUser {
                id: identity,
                referral_code: ReferralCode::generate(),
                referred_by,
            };
            match self.store.create_user(&new_user).await {
                Ok(user) => return Ok(user),
                Err(StoreError::ReferralCodeTaken) => {
                    tracing::debug!(identity, attempt, "Referral code collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ReferralError::CodeExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
