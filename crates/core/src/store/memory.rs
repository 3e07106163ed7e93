//! In-process [`UserStore`] for local development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{NewUser, StoreError, UserRecord, UserStore};
use crate::referral::ReferralCode;
use crate::types::Identity;

/// Keeps users in a `HashMap`; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Identity, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user(&self, id: Identity) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|u| u.referral_code == code.as_str())
            .cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::IdentityTaken(user.id));
        }
        if users
            .values()
            .any(|u| u.referral_code == user.referral_code.as_str())
        {
            return Err(StoreError::ReferralCodeTaken);
        }

        let record = UserRecord {
            id: user.id,
            referral_code: user.referral_code.to_string(),
            referred_by: user.referred_by,
            total_referrals: 0,
            created_at: Some(chrono::Utc::now()),
        };
        users.insert(user.id, record.clone());
        Ok(record)
    }

    async fn increment_referrals(&self, id: Identity) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        user.total_referrals += 1;
        Ok(())
    }
}
