//! Mining boosts and the diminishing-returns stacking rule.
//!
//! Boosts of the same kind stack, but each additional one is worth less:
//! the n-th boost of a kind (in acquisition order) contributes
//! `max(50%, 100% - 10% * (n - 1))` of its magnitude. Kinds are independent.
//! Expired boosts are dropped before positions are assigned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// GEM/hour added by a single boost before decay.
pub const BASE_BOOST_RATE: f64 = 0.1;

/// Upper bound on boosts a player may hold at once.
pub const MAX_ACTIVE_BOOSTS: usize = 10;

/// Effectiveness of the first boost of a kind, in tenths.
const FULL_EFFECT_TENTHS: usize = 10;

/// Decay floor, in tenths.
const MIN_EFFECT_TENTHS: usize = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Boost tier. Serialized with the backend's `boost_type` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoostKind {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "7d")]
    Week,
}

impl BoostKind {
    pub const ALL: [BoostKind; 3] = [BoostKind::Day, BoostKind::ThreeDays, BoostKind::Week];

    pub fn as_str(self) -> &'static str {
        match self {
            BoostKind::Day => "24h",
            BoostKind::ThreeDays => "3d",
            BoostKind::Week => "7d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn duration(self) -> chrono::Duration {
        match self {
            BoostKind::Day => chrono::Duration::hours(24),
            BoostKind::ThreeDays => chrono::Duration::hours(72),
            BoostKind::Week => chrono::Duration::hours(168),
        }
    }

    /// Shop price in GEM.
    pub fn price(self) -> f64 {
        match self {
            BoostKind::Day => 2.0,
            BoostKind::ThreeDays => 5.0,
            BoostKind::Week => 10.0,
        }
    }
}

/// A purchased, time-bounded rate modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boost {
    pub id: String,
    pub kind: BoostKind,
    /// GEM/hour added at full effectiveness.
    pub magnitude: f64,
    pub acquired_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Boost {
    /// A boost bought at `now` with the standard magnitude.
    pub fn purchase(kind: BoostKind, now: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            magnitude: BASE_BOOST_RATE,
            acquired_at: now,
            expires_at: now + kind.duration(),
        }
    }

    pub fn is_active(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

// ---------------------------------------------------------------------------
// Accrual math
// ---------------------------------------------------------------------------

/// Share of its magnitude the boost at 1-based `position` within its kind
/// contributes.
pub fn effectiveness(position: usize) -> f64 {
    let steps = position.saturating_sub(1);
    let tenths = FULL_EFFECT_TENTHS
        .saturating_sub(steps)
        .max(MIN_EFFECT_TENTHS);
    tenths as f64 / 10.0
}

/// Sum of decayed contributions of every boost still active at `now`.
pub fn total_effective_boost(boosts: &[Boost], now: Timestamp) -> f64 {
    let mut by_kind: BTreeMap<BoostKind, Vec<&Boost>> = BTreeMap::new();
    for boost in boosts.iter().filter(|b| b.is_active(now)) {
        by_kind.entry(boost.kind).or_default().push(boost);
    }

    by_kind
        .into_values()
        .map(|mut group| {
            group.sort_by_key(|b| b.acquired_at);
            group
                .iter()
                .enumerate()
                .map(|(i, b)| b.magnitude * effectiveness(i + 1))
                .sum::<f64>()
        })
        .sum()
}

/// `base_rate` plus the decayed boost total, in GEM/hour.
pub fn effective_rate(base_rate: f64, boosts: &[Boost], now: Timestamp) -> f64 {
    base_rate + total_effective_boost(boosts, now)
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Client-side set of purchased boosts.
///
/// Expired entries stay until [`BoostLedger::prune_expired`] runs; they are
/// already ignored by the accrual math.
#[derive(Debug, Clone, Default)]
pub struct BoostLedger {
    boosts: Vec<Boost>,
}

impl BoostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a purchase. Fails once [`MAX_ACTIVE_BOOSTS`] are active.
    pub fn add(&mut self, boost: Boost) -> Result<(), CoreError> {
        let active = self.active_count(boost.acquired_at);
        if active >= MAX_ACTIVE_BOOSTS {
            return Err(CoreError::Validation(format!(
                "At most {MAX_ACTIVE_BOOSTS} boosts can be active at once"
            )));
        }
        self.boosts.push(boost);
        Ok(())
    }

    /// Drop every boost expired at `now`, returning how many were removed.
    pub fn prune_expired(&mut self, now: Timestamp) -> usize {
        let before = self.boosts.len();
        self.boosts.retain(|b| b.is_active(now));
        before - self.boosts.len()
    }

    pub fn active_count(&self, now: Timestamp) -> usize {
        self.boosts.iter().filter(|b| b.is_active(now)).count()
    }

    pub fn total_effective_boost(&self, now: Timestamp) -> f64 {
        total_effective_boost(&self.boosts, now)
    }

    pub fn boosts(&self) -> &[Boost] {
        &self.boosts
    }

    pub fn len(&self) -> usize {
        self.boosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boosts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
