use thiserror::Error;

use crate::types::{Amount, DurationMs};

#[derive(Debug, Error)]
pub enum MinerError {
    // ── Mining session ───────────────────────────────────────────────────────
    #[error("a mining session is already running ({remaining_ms} ms left)")]
    SessionActive { remaining_ms: DurationMs },

    // ── Cooldown claims ──────────────────────────────────────────────────────
    #[error("daily gift is cooling down ({remaining_ms} ms left)")]
    DailyGiftCoolingDown { remaining_ms: DurationMs },

    #[error("faucet is cooling down ({remaining_ms} ms left)")]
    FaucetCoolingDown { remaining_ms: DurationMs },

    // ── Tasks ────────────────────────────────────────────────────────────────
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task already completed: {0}")]
    TaskAlreadyCompleted(String),

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    // ── Withdrawals ──────────────────────────────────────────────────────────
    #[error("wallet address must not be empty")]
    EmptyWalletAddress,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("withdrawal below minimum ({min} TON required)")]
    BelowMinimumWithdrawal { min: Amount },

    #[error("insufficient balance: need {need} TON, have {have}")]
    InsufficientBalance { need: Amount, have: Amount },

    #[error("withdrawal not found: {0}")]
    WithdrawalNotFound(String),

    #[error("withdrawal {0} is no longer pending")]
    WithdrawalNotPending(String),

    #[error("a withdrawal can only be marked Paid or Rejected")]
    InvalidWithdrawalStatus,

    // ── Admin gate ───────────────────────────────────────────────────────────
    #[error("admin mode is locked")]
    AdminLocked,

    #[error("passcode prompt is not open")]
    PasscodePromptClosed,

    #[error("invalid passcode")]
    InvalidPasscode,

    // ── Input ────────────────────────────────────────────────────────────────
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("malformed state: {0}")]
    MalformedState(String),

    // ── Service ──────────────────────────────────────────────────────────────
    #[error("engine service has shut down")]
    ServiceStopped,
}

impl MinerError {
    /// True for the validation rejections an operation answers with instead of
    /// applying a change.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            MinerError::Serialization(_)
                | MinerError::Storage(_)
                | MinerError::MalformedState(_)
                | MinerError::ServiceStopped
                | MinerError::AdminLocked
        )
    }
}
