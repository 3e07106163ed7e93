//! User entity model and DTOs.

use gemrush_core::store::UserRecord;
use gemrush_core::types::{Identity, Timestamp};
use sqlx::FromRow;

/// Full row from the `"user"` table.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Identity,
    pub referral_code: String,
    pub referred_by: Option<Identity>,
    pub total_referrals: i32,
    pub created_at: Timestamp,
}

impl From<User> for UserRecord {
    fn from(row: User) -> Self {
        UserRecord {
            id: row.id,
            referral_code: row.referral_code,
            referred_by: row.referred_by,
            total_referrals: i64::from(row.total_referrals),
            created_at: Some(row.created_at),
        }
    }
}

/// DTO for inserting a first-time user.
#[derive(Debug)]
pub struct CreateUser {
    pub id: Identity,
    pub referral_code: String,
    pub referred_by: Option<Identity>,
}
