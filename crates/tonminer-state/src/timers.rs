//! Session and cooldown timers.
//!
//! Nothing here is stored: every value is recomputed from the timestamps in
//! `MiningStats` and the caller's `now`, so a missed or late tick never skews
//! what the user sees.

use serde::Serialize;

use tonminer_core::constants::MS_PER_HOUR;
use tonminer_core::state::{AppConfig, AppState, MiningStats};
use tonminer_core::types::{elapsed_ms, Amount, DurationMs, Timestamp};

/// Time left on the running session; zero when idle or already expired.
pub fn session_remaining(stats: &MiningStats, config: &AppConfig, now: Timestamp) -> DurationMs {
    match stats.session_start_time {
        Some(start) => config.session_duration.saturating_sub(elapsed_ms(start, now)),
        None => 0,
    }
}

/// A session is running and has not reached its end yet.
pub fn is_mining(stats: &MiningStats, config: &AppConfig, now: Timestamp) -> bool {
    stats.session_start_time.is_some() && session_remaining(stats, config, now) > 0
}

/// A session has reached its end but has not been credited yet.
pub fn session_expired(stats: &MiningStats, config: &AppConfig, now: Timestamp) -> bool {
    match stats.session_start_time {
        Some(start) => elapsed_ms(start, now) >= config.session_duration,
        None => false,
    }
}

/// Fraction of the session elapsed, in `[0, 1]`.
pub fn session_progress(stats: &MiningStats, config: &AppConfig, now: Timestamp) -> f64 {
    let Some(start) = stats.session_start_time else {
        return 0.0;
    };
    if config.session_duration == 0 {
        return 1.0;
    }
    let fraction = elapsed_ms(start, now) as f64 / config.session_duration as f64;
    fraction.clamp(0.0, 1.0)
}

/// Reward accrued so far this session, for display only:
/// `min(miningRate, elapsed * miningRate / 1h)`.
pub fn projected_reward(stats: &MiningStats, config: &AppConfig, now: Timestamp) -> Amount {
    let Some(start) = stats.session_start_time else {
        return Amount::ZERO;
    };
    let accrued = config.mining_rate.mul_div(elapsed_ms(start, now), MS_PER_HOUR);
    accrued.min(config.mining_rate)
}

/// `max(0, cooldown - (now - last))`; zero when never claimed.
pub fn cooldown_remaining(last: Option<Timestamp>, cooldown: DurationMs, now: Timestamp) -> DurationMs {
    match last {
        Some(last) => cooldown.saturating_sub(elapsed_ms(last, now)),
        None => 0,
    }
}

/// `READY`, `m:ss`, or `h:mm:ss` once an hour or more is left.
pub fn format_cooldown(ms: DurationMs) -> String {
    if ms == 0 {
        return "READY".to_string();
    }
    let total = ms / 1000;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Everything the mining screen needs, computed at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    pub now: Timestamp,
    pub balance: Amount,
    pub is_mining: bool,
    pub session_remaining_ms: DurationMs,
    pub session_progress: f64,
    pub mined_this_session: Amount,
    pub daily_gift_ready: bool,
    pub daily_gift_remaining_ms: DurationMs,
    pub faucet_ready: bool,
    pub faucet_remaining_ms: DurationMs,
    pub pending_withdrawals: usize,
}

impl Readiness {
    pub fn compute(state: &AppState, now: Timestamp) -> Self {
        let stats = &state.stats;
        let config = &state.config;
        let daily = cooldown_remaining(stats.last_daily_gift_claimed, config.daily_gift_cooldown, now);
        let faucet = cooldown_remaining(stats.last_faucet_claimed, config.faucet_cooldown, now);
        Self {
            now,
            balance: stats.balance,
            is_mining: is_mining(stats, config, now),
            session_remaining_ms: session_remaining(stats, config, now),
            session_progress: session_progress(stats, config, now),
            mined_this_session: projected_reward(stats, config, now),
            daily_gift_ready: daily == 0,
            daily_gift_remaining_ms: daily,
            faucet_ready: faucet == 0,
            faucet_remaining_ms: faucet,
            pending_withdrawals: state.pending_withdrawals(),
        }
    }
}
