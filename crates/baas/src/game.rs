//! Typed calls to the game's stored procedures.
//!
//! Their behavior lives in the backend; the client treats every result as
//! authoritative.

use gemrush_core::boost::BoostKind;
use gemrush_core::mining::MiningStatus;
use serde::Deserialize;
use serde_json::json;

use crate::client::{BaasClient, BaasError};

/// A set-returning function may come back as a single object or an array.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl BaasClient {
    /// Begin a 24-hour mining session for the calling user.
    pub async fn start_mining(&self) -> Result<(), BaasError> {
        self.rpc_unit("start_mining", &json!({})).await
    }

    /// Current mining session, balance and referral count.
    ///
    /// Returns `None` when the backend has no row for the caller.
    pub async fn get_mining_status(&self) -> Result<Option<MiningStatus>, BaasError> {
        let result: Option<OneOrMany<MiningStatus>> =
            self.rpc("get_mining_status", &json!({})).await?;
        Ok(match result {
            Some(OneOrMany::Many(rows)) => rows.into_iter().next(),
            Some(OneOrMany::One(row)) => Some(row),
            None => None,
        })
    }

    /// Purchase a boost of the given tier.
    pub async fn add_boost(&self, kind: BoostKind) -> Result<(), BaasError> {
        self.rpc_unit("add_boost", &json!({ "boost_type": kind })).await
    }

    /// Wheel spins left today. Unparseable results count as zero.
    pub async fn get_remaining_spins(&self) -> Result<u32, BaasError> {
        let value: serde_json::Value = self.rpc("get_remaining_spins", &json!({})).await?;
        Ok(match value {
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .unwrap_or(0))
    }
}
