use serde::{Deserialize, Serialize};

use tonminer_core::state::{AppState, Task, WithdrawalRequest};
use tonminer_core::types::{Amount, DurationMs, Timestamp};
use tonminer_state::timers::format_cooldown;
use tonminer_state::Readiness;

/// Mining-screen summary returned by `miner_getDashboard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcDashboard {
    pub now: Timestamp,
    pub balance: Amount,
    pub referral_code: String,
    /// Cosmetic "active miners" figure from the config.
    pub active_miners: u64,
    pub mining_rate: Amount,
    pub is_mining: bool,
    pub session_remaining_ms: DurationMs,
    /// 0.0 ..= 1.0
    pub session_progress: f64,
    pub mined_this_session: Amount,
    pub daily_gift_ready: bool,
    pub daily_gift_remaining_ms: DurationMs,
    /// "READY", "m:ss" or "h:mm:ss".
    pub daily_gift_label: String,
    pub faucet_ready: bool,
    pub faucet_remaining_ms: DurationMs,
    pub faucet_label: String,
    pub tasks: Vec<Task>,
    pub pending_withdrawals: usize,
    /// Newest first.
    pub withdrawals: Vec<WithdrawalRequest>,
}

impl RpcDashboard {
    pub fn build(state: &AppState, readiness: Readiness) -> Self {
        Self {
            now: readiness.now,
            balance: readiness.balance,
            referral_code: state.referral_code.clone(),
            active_miners: state.config.active_miners_display,
            mining_rate: state.config.mining_rate,
            is_mining: readiness.is_mining,
            session_remaining_ms: readiness.session_remaining_ms,
            session_progress: readiness.session_progress,
            mined_this_session: readiness.mined_this_session,
            daily_gift_ready: readiness.daily_gift_ready,
            daily_gift_remaining_ms: readiness.daily_gift_remaining_ms,
            daily_gift_label: format_cooldown(readiness.daily_gift_remaining_ms),
            faucet_ready: readiness.faucet_ready,
            faucet_remaining_ms: readiness.faucet_remaining_ms,
            faucet_label: format_cooldown(readiness.faucet_remaining_ms),
            tasks: state.tasks.clone(),
            pending_withdrawals: readiness.pending_withdrawals,
            withdrawals: state.withdrawals_newest_first().cloned().collect(),
        }
    }
}

/// Result of any crediting call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcClaim {
    pub reward: Amount,
    pub balance: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcSessionStart {
    pub started_at: Timestamp,
    pub ends_at: Timestamp,
    /// Reward of an expired session that was credited before this one began.
    pub settled_reward: Option<Amount>,
    pub balance: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTap {
    pub prompt_open: bool,
    /// Taps inside the current window; reset to 0 when the prompt opens.
    pub taps: usize,
}
