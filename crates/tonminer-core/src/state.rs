use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::constants::*;
use crate::error::MinerError;
use crate::types::{Amount, DurationMs, Timestamp};

// ── MiningStats ──────────────────────────────────────────────────────────────

/// Balance plus the three timestamps every timer is derived from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningStats {
    pub balance: Amount,
    /// Start of the running session; `None` while idle.
    pub session_start_time: Option<Timestamp>,
    pub last_daily_gift_claimed: Option<Timestamp>,
    pub last_faucet_claimed: Option<Timestamp>,
}

// ── AppConfig ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub session_duration: DurationMs,
    pub mining_rate: Amount,
    /// Fraction of referee earnings paid to the referrer (0.10 = 10%).
    pub referral_commission_percent: f64,
    pub referral_join_bonus: Amount,
    pub daily_gift_reward: Amount,
    pub daily_gift_cooldown: DurationMs,
    pub faucet_reward: Amount,
    pub faucet_cooldown: DurationMs,
    pub active_miners_display: u64,
    pub min_withdrawal: Amount,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_duration: DEFAULT_SESSION_DURATION_MS,
            mining_rate: Amount::from_nano(DEFAULT_MINING_RATE_NANO),
            referral_commission_percent: DEFAULT_REFERRAL_COMMISSION,
            referral_join_bonus: Amount::from_nano(DEFAULT_REFERRAL_JOIN_BONUS_NANO),
            daily_gift_reward: Amount::from_nano(DEFAULT_DAILY_GIFT_NANO),
            daily_gift_cooldown: DEFAULT_DAILY_GIFT_COOLDOWN_MS,
            faucet_reward: Amount::from_nano(DEFAULT_FAUCET_NANO),
            faucet_cooldown: DEFAULT_FAUCET_COOLDOWN_MS,
            active_miners_display: DEFAULT_ACTIVE_MINERS_DISPLAY,
            min_withdrawal: Amount::from_nano(DEFAULT_MIN_WITHDRAWAL_NANO),
        }
    }
}

impl AppConfig {
    /// Amounts and durations are unsigned already; the one float field is
    /// forced to a finite non-negative value.
    pub fn sanitized(mut self) -> Self {
        if !self.referral_commission_percent.is_finite() || self.referral_commission_percent < 0.0 {
            self.referral_commission_percent = 0.0;
        }
        self
    }
}

// ── Tasks ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub reward: Amount,
    pub url: String,
    pub completed: bool,
    #[serde(default = "default_task_icon")]
    pub icon: String,
}

fn default_task_icon() -> String {
    DEFAULT_TASK_ICON.to_string()
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, reward: Amount, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            reward,
            url: url.into(),
            completed: false,
            icon: default_task_icon(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }
}

/// Task list a fresh install starts with.
pub fn default_tasks() -> Vec<Task> {
    vec![
        Task::new("1", "Join TON Miner Channel", Amount::from_nano(500_000), "https://t.me/tonminer")
            .with_icon("send"),
        Task::new("2", "Follow us on X", Amount::from_nano(300_000), "https://x.com/tonminer")
            .with_icon("twitter"),
        Task::new("3", "Watch a sponsored video", Amount::from_nano(200_000), "#").with_icon("play"),
    ]
}

/// First id that repeats in `ids`, if any.
pub fn first_duplicate_id<'a>(ids: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}

// ── Referrals ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Referral {
    pub id: String,
    pub username: String,
    pub joined_at: String,
    pub earned: Amount,
}

// ── Withdrawals ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    Pending,
    Paid,
    Rejected,
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WithdrawalStatus::Pending => "Pending",
            WithdrawalStatus::Paid => "Paid",
            WithdrawalStatus::Rejected => "Rejected",
        };
        f.write_str(s)
    }
}

impl FromStr for WithdrawalStatus {
    type Err = MinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(WithdrawalStatus::Pending),
            "paid" => Ok(WithdrawalStatus::Paid),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            _ => Err(MinerError::InvalidWithdrawalStatus),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub id: String,
    pub username: String,
    pub wallet_address: String,
    pub amount: Amount,
    pub status: WithdrawalStatus,
    pub requested_at: String,
}

// ── Monetization ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monetization {
    pub monetag_tag_id: String,
    pub sponsored_link: String,
    pub ad_bonus: Amount,
}

impl Default for Monetization {
    fn default() -> Self {
        Self {
            monetag_tag_id: DEFAULT_MONETAG_TAG_ID.to_string(),
            sponsored_link: DEFAULT_SPONSORED_LINK.to_string(),
            ad_bonus: Amount::from_nano(DEFAULT_AD_BONUS_NANO),
        }
    }
}

// ── AppState ─────────────────────────────────────────────────────────────────

/// The whole persisted aggregate. One per device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub stats: MiningStats,
    pub config: AppConfig,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub referrals: Vec<Referral>,
    #[serde(default)]
    pub withdrawals: Vec<WithdrawalRequest>,
    pub referral_code: String,
    #[serde(default)]
    pub monetization: Monetization,
}

impl AppState {
    /// Fresh state with a newly generated referral code.
    pub fn new_default() -> Self {
        Self::with_referral_code(generate_referral_code())
    }

    pub fn with_referral_code(code: impl Into<String>) -> Self {
        Self {
            stats: MiningStats::default(),
            config: AppConfig::default(),
            tasks: default_tasks(),
            referrals: Vec::new(),
            withdrawals: Vec::new(),
            referral_code: code.into(),
            monetization: Monetization::default(),
        }
    }

    /// Check the invariants serde cannot express. A document failing this is
    /// treated as malformed.
    pub fn validate(&self) -> Result<(), MinerError> {
        if let Some(id) = first_duplicate_id(self.tasks.iter().map(|t| t.id.as_str())) {
            return Err(MinerError::MalformedState(format!("duplicate task id {id}")));
        }
        if let Some(id) = first_duplicate_id(self.withdrawals.iter().map(|w| w.id.as_str())) {
            return Err(MinerError::MalformedState(format!("duplicate withdrawal id {id}")));
        }
        let pct = self.config.referral_commission_percent;
        if !pct.is_finite() || pct < 0.0 {
            return Err(MinerError::MalformedState(format!("referral commission {pct}")));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, MinerError> {
        serde_json::to_vec(self).map_err(|e| MinerError::Serialization(e.to_string()))
    }

    /// Decode and validate a persisted document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, MinerError> {
        let state: AppState =
            serde_json::from_slice(bytes).map_err(|e| MinerError::MalformedState(e.to_string()))?;
        state.validate()?;
        Ok(state)
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_withdrawal(&self, id: &str) -> Option<&WithdrawalRequest> {
        self.withdrawals.iter().find(|w| w.id == id)
    }

    pub fn pending_withdrawals(&self) -> usize {
        self.withdrawals
            .iter()
            .filter(|w| w.status == WithdrawalStatus::Pending)
            .count()
    }

    /// Withdrawals newest first, the order the admin console lists them in.
    pub fn withdrawals_newest_first(&self) -> impl Iterator<Item = &WithdrawalRequest> {
        self.withdrawals.iter().rev()
    }
}

/// `TON-` followed by six upper-case base-36 characters.
pub fn generate_referral_code() -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERRAL_CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{REFERRAL_CODE_PREFIX}{suffix}")
}
