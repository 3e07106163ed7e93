//! Mining session, wheel spins and boosts as the game UI sees them.
//!
//! All balances and session times come from the backend. Local state only
//! bridges the gap between refreshes: the countdown ticks every second and
//! the boost ledger estimates the current rate.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gemrush_core::boost::{Boost, BoostKind, BoostLedger, MAX_ACTIVE_BOOSTS};
use gemrush_core::error::CoreError;
use gemrush_core::mining::{MiningState, BASE_MINING_RATE};
use tokio::sync::RwLock;

use crate::error::ClientError;
use crate::session::SessionStore;

/// Wait between a successful `start_mining` and the follow-up status fetch.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Point-in-time view for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct MiningSnapshot {
    pub mining: MiningState,
    pub remaining_spins: u32,
    /// Last error worth showing inline, cleared on the next attempt.
    pub error: Option<String>,
    pub active_boosts: usize,
    /// Base rate plus decayed boosts, GEM/hour.
    pub estimated_rate: f64,
}

#[derive(Debug, Default)]
struct LocalState {
    mining: MiningState,
    remaining_spins: u32,
    error: Option<String>,
}

/// Drives mining RPCs and keeps local state reconciled with the backend.
pub struct MiningService {
    session: Arc<SessionStore>,
    state: RwLock<LocalState>,
    boosts: RwLock<BoostLedger>,
    settle_delay: Duration,
}

impl MiningService {
    pub fn new(session: Arc<SessionStore>) -> Arc<Self> {
        Self::with_settle_delay(session, DEFAULT_SETTLE_DELAY)
    }

    pub fn with_settle_delay(session: Arc<SessionStore>, settle_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            session,
            state: RwLock::new(LocalState::default()),
            boosts: RwLock::new(BoostLedger::new()),
            settle_delay,
        })
    }

    /// Fetch the mining status and spin count and overwrite local state.
    ///
    /// A failed fetch is recorded in the snapshot's `error` as well as
    /// returned.
    pub async fn refresh_status(&self) -> Result<(), ClientError> {
        match self.fetch_status().await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch mining status");
                self.state.write().await.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_status(&self) -> Result<(), ClientError> {
        let client = self.session.client().await;

        let Some(status) = client.get_mining_status().await? else {
            tracing::warn!("No mining status data returned");
            return Ok(());
        };
        let spins = client.get_remaining_spins().await?;

        let mut state = self.state.write().await;
        state.mining.reconcile(&status);
        state.remaining_spins = spins;
        tracing::debug!(
            is_mining = status.is_mining,
            remaining_secs = state.mining.remaining_secs,
            balance = state.mining.balance,
            "Mining status reconciled"
        );
        Ok(())
    }

    /// Start a 24-hour session. Does nothing while one is already running.
    ///
    /// A refusal is kept as the inline error, leaves mining inactive and is
    /// returned as [`ClientError::MiningSession`]. It is never retried.
    pub async fn start_mining(&self) -> Result<(), ClientError> {
        {
            let mut state = self.state.write().await;
            state.error = None;
            if state.mining.is_running() {
                return Ok(());
            }
        }

        let client = self.session.client().await;
        if let Err(e) = client.start_mining().await {
            let message = match &e {
                gemrush_baas::BaasError::Api { message, .. } => message.clone(),
                other => other.to_string(),
            };
            tracing::warn!(error = %e, "start_mining refused");

            let mut state = self.state.write().await;
            state.error = Some(message.clone());
            state.mining.active = false;
            return Err(ClientError::MiningSession(message));
        }

        tokio::time::sleep(self.settle_delay).await;
        self.refresh_status().await
    }

    /// Buy a boost, record it locally and refresh.
    ///
    /// The ledger stays locked from the capacity check until the purchase is
    /// recorded, so concurrent purchases never exceed [`MAX_ACTIVE_BOOSTS`]
    /// and a rejected purchase never reaches the backend.
    pub async fn add_boost(&self, kind: BoostKind) -> Result<(), ClientError> {
        {
            let mut boosts = self.boosts.write().await;
            if boosts.active_count(Utc::now()) >= MAX_ACTIVE_BOOSTS {
                return Err(CoreError::Validation(format!(
                    "At most {MAX_ACTIVE_BOOSTS} boosts can be active at once"
                ))
                .into());
            }

            self.session.client().await.add_boost(kind).await?;
            boosts.add(Boost::purchase(kind, Utc::now()))?;
        }
        tracing::info!(kind = kind.as_str(), "Boost purchased");

        self.refresh_status().await
    }

    /// Remaining wheel spins for today, straight from the backend.
    pub async fn remaining_spins(&self) -> Result<u32, ClientError> {
        let spins = self.session.client().await.get_remaining_spins().await?;
        self.state.write().await.remaining_spins = spins;
        Ok(spins)
    }

    /// Advance the local countdown by one second.
    pub async fn tick(&self) -> bool {
        self.state.write().await.mining.tick()
    }

    /// Drop expired boosts, returning how many went.
    pub async fn sweep_boosts(&self) -> usize {
        self.boosts.write().await.prune_expired(Utc::now())
    }

    pub async fn snapshot(&self) -> MiningSnapshot {
        let now = Utc::now();
        let state = self.state.read().await;
        let boosts = self.boosts.read().await;

        MiningSnapshot {
            mining: state.mining.clone(),
            remaining_spins: state.remaining_spins,
            error: state.error.clone(),
            active_boosts: boosts.active_count(now),
            estimated_rate: BASE_MINING_RATE + boosts.total_effective_boost(now),
        }
    }
}
