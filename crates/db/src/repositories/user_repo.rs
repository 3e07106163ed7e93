//! Repository for the `"user"` table.

use gemrush_core::types::Identity;
use sqlx::PgPool;

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, referral_code, referred_by, total_referrals, created_at";

/// Unique constraint on `referral_code`.
pub const REFERRAL_CODE_CONSTRAINT: &str = "uq_user_referral_code";

/// Primary key constraint on `id`.
pub const PRIMARY_KEY_CONSTRAINT: &str = "user_pkey";

/// Provides the queries the login flow needs.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO \"user\" (id, referral_code, referred_by)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(input.id)
            .bind(&input.referral_code)
            .bind(input.referred_by)
            .fetch_one(pool)
            .await
    }

    /// Find a user by Telegram id.
    pub async fn find_by_id(pool: &PgPool, id: Identity) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM \"user\" WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the owner of a referral code (case-sensitive).
    pub async fn find_by_referral_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM \"user\" WHERE referral_code = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Atomically add one to `total_referrals`.
    ///
    /// Returns `true` if the row exists.
    pub async fn increment_referrals(pool: &PgPool, id: Identity) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE \"user\" SET total_referrals = total_referrals + 1 WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
