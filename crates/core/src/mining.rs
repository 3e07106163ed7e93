//! Mining session state as seen by the client.
//!
//! The backend owns mining sessions and balances. The client keeps a local
//! countdown so the UI can tick every second, and overwrites it whenever a
//! fresh [`MiningStatus`] arrives.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// GEM/hour earned without boosts.
pub const BASE_MINING_RATE: f64 = 0.1;

/// Length of one mining session (24 hours).
pub const MINING_SESSION_SECS: u64 = 24 * 60 * 60;

/// Matches Postgres interval output such as `05:03:09`, `1 day 02:00:00`
/// or `-1 days +23:59:55`.
static INTERVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:([+-]?\d+) days? )?([+-])?(\d+):(\d+):(\d+)").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Backend status
// ---------------------------------------------------------------------------

/// One row of the `get_mining_status` RPC result.
///
/// Numeric columns come back either as JSON numbers or as numeric strings
/// depending on the column type, so they are decoded leniently.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MiningStatus {
    pub is_mining: bool,
    /// Remaining session time in seconds, if the backend reported one.
    #[serde(default, deserialize_with = "de_interval")]
    pub time_remaining: Option<u64>,
    #[serde(default, deserialize_with = "de_lenient_opt_f64")]
    pub current_rate: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub balance: f64,
    #[serde(default, deserialize_with = "de_lenient_i64")]
    pub total_referrals: i64,
}

/// Parse a Postgres interval string into whole seconds. Negative intervals
/// (an overdue session) count as zero.
pub fn parse_interval(text: &str) -> Option<u64> {
    let caps = INTERVAL_RE.captures(text)?;
    let num = |i: usize| -> i64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    let sign = match caps.get(2).map(|m| m.as_str()) {
        Some("-") => -1,
        _ => 1,
    };
    let total = num(1) * 86_400 + sign * (num(3) * 3_600 + num(4) * 60 + num(5));
    Some(total.max(0) as u64)
}

fn lenient_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn de_lenient_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(lenient_number(&value))
}

fn de_lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(de_lenient_opt_f64(d)?.unwrap_or(0.0))
}

fn de_lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(de_lenient_opt_f64(d)?.map(|v| v.trunc() as i64).unwrap_or(0))
}

fn de_interval<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<String>::deserialize(d)?;
    Ok(value.as_deref().and_then(parse_interval))
}

// ---------------------------------------------------------------------------
// Local state
// ---------------------------------------------------------------------------

/// Client-side approximation of the mining session.
///
/// Never used to compute balances; [`MiningState::reconcile`] replaces it
/// with the backend's numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct MiningState {
    pub active: bool,
    pub remaining_secs: u64,
    pub rate: f64,
    pub balance: f64,
    pub total_referrals: i64,
}

impl Default for MiningState {
    fn default() -> Self {
        Self {
            active: false,
            remaining_secs: MINING_SESSION_SECS,
            rate: BASE_MINING_RATE,
            balance: 0.0,
            total_referrals: 0,
        }
    }
}

impl MiningState {
    /// `true` while a session is running and has time left.
    pub fn is_running(&self) -> bool {
        self.active && self.remaining_secs > 0
    }

    /// Advance the countdown by one second. Returns whether the session is
    /// still running afterwards.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.remaining_secs -= 1;
        if self.remaining_secs == 0 {
            self.active = false;
        }
        self.is_running()
    }

    /// Overwrite local state with the authoritative backend status.
    pub fn reconcile(&mut self, status: &MiningStatus) {
        self.active = status.is_mining;
        self.balance = status.balance;
        self.total_referrals = status.total_referrals;

        if status.is_mining {
            if let Some(remaining) = status.time_remaining {
                self.remaining_secs = remaining;
            }
        }
        if let Some(rate) = status.current_rate.filter(|r| *r > 0.0) {
            self.rate = rate;
        }
    }

    /// Balance plus what the current rate would have earned over `elapsed`.
    /// Display estimate only.
    pub fn projected_balance(&self, elapsed: Duration) -> f64 {
        if !self.is_running() {
            return self.balance;
        }
        let capped = elapsed.min(Duration::from_secs(self.remaining_secs));
        self.balance + accrued_gems(self.rate, capped)
    }
}

/// GEM earned at `rate_per_hour` over `elapsed`, at full precision.
pub fn accrued_gems(rate_per_hour: f64, elapsed: Duration) -> f64 {
    rate_per_hour * elapsed.as_secs_f64() / 3_600.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_day_intervals() {
        assert_eq!(parse_interval("05:03:09"), Some(5 * 3600 + 3 * 60 + 9));
        assert_eq!(parse_interval("23:59:59.123456"), Some(86_399));
        assert_eq!(parse_interval("1 day 02:00:00"), Some(86_400 + 7_200));
        assert_eq!(parse_interval("2 days 00:00:01"), Some(2 * 86_400 + 1));
        assert_eq!(parse_interval("soon"), None);
    }

    #[test]
    fn negative_intervals_clamp_to_zero() {
        assert_eq!(parse_interval("-00:00:05"), Some(0));
        assert_eq!(parse_interval("-1 days +23:59:55"), Some(0));
        assert_eq!(parse_interval("-1 days -00:00:05"), Some(0));
        assert_eq!(parse_interval("1 day -01:00:00"), Some(82_800));
    }

    #[test]
    fn status_decodes_numbers_and_strings() {
        let json = serde_json::json!({
            "is_mining": true,
            "time_remaining": "10:00:00",
            "current_rate": "0.25",
            "balance": "61.77871",
            "total_referrals": 3
        });
        let status: MiningStatus = serde_json::from_value(json).unwrap();

        assert!(status.is_mining);
        assert_eq!(status.time_remaining, Some(36_000));
        assert_eq!(status.current_rate, Some(0.25));
        assert!((status.balance - 61.77871).abs() < 1e-12);
        assert_eq!(status.total_referrals, 3);
    }

    #[test]
    fn status_tolerates_nulls_and_garbage() {
        let json = serde_json::json!({
            "is_mining": false,
            "time_remaining": null,
            "current_rate": null,
            "balance": "n/a",
            "total_referrals": null
        });
        let status: MiningStatus = serde_json::from_value(json).unwrap();

        assert_eq!(status.time_remaining, None);
        assert_eq!(status.current_rate, None);
        assert_eq!(status.balance, 0.0);
        assert_eq!(status.total_referrals, 0);
    }

    #[test]
    fn tick_counts_down_and_stops_at_zero() {
        let mut state = MiningState {
            active: true,
            remaining_secs: 2,
            ..Default::default()
        };

        assert!(state.tick());
        assert_eq!(state.remaining_secs, 1);
        assert!(!state.tick());
        assert_eq!(state.remaining_secs, 0);
        assert!(!state.active);
        assert!(!state.tick());
        assert_eq!(state.remaining_secs, 0);
    }

    #[test]
    fn tick_is_noop_when_inactive() {
        let mut state = MiningState::default();
        assert!(!state.tick());
        assert_eq!(state.remaining_secs, MINING_SESSION_SECS);
    }

    #[test]
    fn reconcile_overwrites_local_state() {
        let mut state = MiningState {
            active: true,
            remaining_secs: 100,
            rate: 9.0,
            balance: 999.0,
            total_referrals: 0,
        };
        let status = MiningStatus {
            is_mining: true,
            time_remaining: Some(3_600),
            current_rate: Some(0.2),
            balance: 12.5,
            total_referrals: 4,
        };

        state.reconcile(&status);

        assert_eq!(
            state,
            MiningState {
                active: true,
                remaining_secs: 3_600,
                rate: 0.2,
                balance: 12.5,
                total_referrals: 4,
            }
        );
    }

    #[test]
    fn reconcile_keeps_rate_when_backend_omits_it() {
        let mut state = MiningState {
            rate: 0.3,
            ..Default::default()
        };
        let status = MiningStatus {
            is_mining: false,
            time_remaining: None,
            current_rate: Some(0.0),
            balance: 1.0,
            total_referrals: 0,
        };
        state.reconcile(&status);
        assert_eq!(state.rate, 0.3);
        assert!(!state.active);
    }

    #[test]
    fn accrual_uses_full_precision() {
        let gems = accrued_gems(0.1, Duration::from_secs(90 * 60));
        assert!((gems - 0.15).abs() < 1e-12);
    }

    #[test]
    fn projection_is_capped_by_remaining_time() {
        let state = MiningState {
            active: true,
            remaining_secs: 3_600,
            rate: 1.0,
            balance: 10.0,
            total_referrals: 0,
        };
        let projected = state.projected_balance(Duration::from_secs(7_200));
        assert!((projected - 11.0).abs() < 1e-12);
    }
}
