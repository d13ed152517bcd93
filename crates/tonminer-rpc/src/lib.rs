//! tonminer-rpc
//!
//! JSON-RPC 2.0 front end for a running `EngineService`.
//!
//! Namespace: "miner"
//! Methods:
//!   miner_getState              — full persisted document
//!   miner_getDashboard          — balance, timers and cooldown labels
//!   miner_startMining           — begin a mining session
//!   miner_claimDailyGift        — daily gift
//!   miner_claimFaucet           — faucet
//!   miner_claimAdBonus          — ad-watch bonus
//!   miner_completeTask          — one-shot task reward
//!   miner_requestWithdrawal     — queue a manual payout
//!   miner_adminTap              — secret tap gesture
//!   miner_verifyPasscode        — unlock admin mode
//!   miner_isAdmin               — admin mode flag
//!   miner_setWithdrawalStatus   — admin: mark Paid / Rejected
//!   miner_saveAdmin             — admin: config text + task list
//!   miner_updateMonetization    — admin: ad settings
//!   miner_addBalance            — admin: manual credit
//!   miner_resetAll              — admin: wipe to defaults

pub mod api;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerState};
pub use types::{RpcClaim, RpcDashboard, RpcSessionStart, RpcTap};
