//! [`UserStore`] backed by the managed backend's `user` table.

use async_trait::async_trait;
use gemrush_core::referral::ReferralCode;
use gemrush_core::store::{NewUser, StoreError, UserRecord, UserStore};
use gemrush_core::types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::client::{BaasClient, BaasError};

const USER_TABLE: &str = "user";
const USER_COLUMNS: &str = "id,referral_code,referred_by,total_referrals,created_at";

/// Row shape returned by the REST layer. Columns with database defaults may
/// be absent or null depending on the select.
#[derive(Debug, Deserialize)]
struct UserRow {
    id: Identity,
    referral_code: String,
    #[serde(default)]
    referred_by: Option<Identity>,
    #[serde(default)]
    total_referrals: Option<i64>,
    #[serde(default)]
    created_at: Option<Timestamp>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            referral_code: row.referral_code,
            referred_by: row.referred_by,
            total_referrals: row.total_referrals.unwrap_or(0),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReferralCount {
    #[serde(default)]
    total_referrals: Option<i64>,
}

#[derive(Serialize)]
struct ReferralCountPatch {
    total_referrals: i64,
}

/// User store speaking to the backend with the service-role key.
#[derive(Debug, Clone)]
pub struct RestUserStore {
    client: BaasClient,
}

impl RestUserStore {
    pub fn new(client: BaasClient) -> Self {
        Self { client }
    }

    async fn find_one(&self, column: &str, value: String) -> Result<Option<UserRecord>, StoreError> {
        let rows: Vec<UserRow> = self
            .client
            .select(
                USER_TABLE,
                USER_COLUMNS,
                &[(column, format!("eq.{value}")), ("limit", "1".to_string())],
            )
            .await
            .map_err(unavailable)?;

        Ok(rows.into_iter().next().map(UserRecord::from))
    }
}

fn unavailable(err: BaasError) -> StoreError {
    tracing::error!(error = %err, "User store request failed");
    StoreError::Unavailable(err.to_string())
}

/// Map a unique violation on insert to the conflict it represents.
fn classify_insert_error(err: BaasError, id: Identity) -> StoreError {
    if let BaasError::Api { message, .. } = &err {
        if err.is_unique_violation() {
            return if message.contains("referral_code") {
                StoreError::ReferralCodeTaken
            } else {
                StoreError::IdentityTaken(id)
            };
        }
    }
    unavailable(err)
}

#[async_trait]
impl UserStore for RestUserStore {
    async fn find_user(&self, id: Identity) -> Result<Option<UserRecord>, StoreError> {
        self.find_one("id", id.to_string()).await
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.find_one("referral_code", code.as_str().to_string())
            .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StoreError> {
        let rows: Vec<UserRow> = self
            .client
            .insert(USER_TABLE, user)
            .await
            .map_err(|e| classify_insert_error(e, user.id))?;

        rows.into_iter()
            .next()
            .map(UserRecord::from)
            .ok_or_else(|| StoreError::Unavailable("insert returned no rows".into()))
    }

    /// Read-then-write. Two referrals landing in the same instant for one
    /// referrer can lose an increment.
    async fn increment_referrals(&self, id: Identity) -> Result<(), StoreError> {
        let filter = [("id", format!("eq.{id}"))];

        let current: Vec<ReferralCount> = self
            .client
            .select(USER_TABLE, "total_referrals", &filter)
            .await
            .map_err(unavailable)?;
        let count = current
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound(id))?
            .total_referrals
            .unwrap_or(0);

        let updated: Vec<ReferralCount> = self
            .client
            .update(
                USER_TABLE,
                &filter,
                &ReferralCountPatch {
                    total_referrals: count + 1,
                },
            )
            .await
            .map_err(unavailable)?;

        if updated.is_empty() {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
