//! [`UserStore`] backed directly by Postgres.

use async_trait::async_trait;
use gemrush_core::referral::ReferralCode;
use gemrush_core::store::{NewUser, StoreError, UserRecord, UserStore};
use gemrush_core::types::Identity;

use crate::models::user::CreateUser;
use crate::repositories::user_repo::{PRIMARY_KEY_CONSTRAINT, REFERRAL_CODE_CONSTRAINT};
use crate::repositories::UserRepo;
use crate::DbPool;

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// User store over a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_user(&self, id: Identity) -> Result<Option<UserRecord>, StoreError> {
        let row = UserRepo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<UserRecord>, StoreError> {
        let row = UserRepo::find_by_referral_code(&self.pool, code.as_str())
            .await
            .map_err(unavailable)?;
        Ok(row.map(Into::into))
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StoreError> {
        let input = CreateUser {
            id: user.id,
            referral_code: user.referral_code.to_string(),
            referred_by: user.referred_by,
        };
        UserRepo::create(&self.pool, &input)
            .await
            .map(Into::into)
            .map_err(|e| classify_insert_error(e, user.id))
    }

    async fn increment_referrals(&self, id: Identity) -> Result<(), StoreError> {
        let found = UserRepo::increment_referrals(&self.pool, id)
            .await
            .map_err(unavailable)?;
        if found {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "User store query failed");
    StoreError::Unavailable(err.to_string())
}

/// Map unique violations on insert to the store's conflict variants.
fn classify_insert_error(err: sqlx::Error, id: Identity) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            match db_err.constraint() {
                Some(REFERRAL_CODE_CONSTRAINT) => return StoreError::ReferralCodeTaken,
                Some(PRIMARY_KEY_CONSTRAINT) => return StoreError::IdentityTaken(id),
                _ => {}
            }
        }
    }
    unavailable(err)
}
