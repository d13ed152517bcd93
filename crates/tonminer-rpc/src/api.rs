use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use tonminer_core::input::ConfigInput;
use tonminer_core::state::{AppConfig, AppState, Monetization, Task, WithdrawalRequest};
use tonminer_core::types::Amount;

use crate::types::{RpcClaim, RpcDashboard, RpcSessionStart, RpcTap};

/// TON Miner JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "miner_" via `namespace = "miner"`.
/// Amounts travel as TON numbers in results and as decimal strings in params.
#[rpc(server, client, namespace = "miner")]
pub trait MinerApi {
    /// The whole persisted document.
    #[method(name = "getState")]
    async fn get_state(&self) -> RpcResult<AppState>;

    /// Everything the mining screen shows, computed now.
    #[method(name = "getDashboard")]
    async fn get_dashboard(&self) -> RpcResult<RpcDashboard>;

    #[method(name = "startMining")]
    async fn start_mining(&self) -> RpcResult<RpcSessionStart>;

    #[method(name = "claimDailyGift")]
    async fn claim_daily_gift(&self) -> RpcResult<RpcClaim>;

    #[method(name = "claimFaucet")]
    async fn claim_faucet(&self) -> RpcResult<RpcClaim>;

    #[method(name = "claimAdBonus")]
    async fn claim_ad_bonus(&self) -> RpcResult<RpcClaim>;

    #[method(name = "completeTask")]
    async fn complete_task(&self, task_id: String) -> RpcResult<RpcClaim>;

    /// `amount` is a decimal TON string, e.g. "0.005".
    #[method(name = "requestWithdrawal")]
    async fn request_withdrawal(&self, wallet: String, amount: String) -> RpcResult<WithdrawalRequest>;

    // ── Admin gate ────────────────────────────────────────────────────────────

    #[method(name = "adminTap")]
    async fn admin_tap(&self) -> RpcResult<RpcTap>;

    #[method(name = "verifyPasscode")]
    async fn verify_passcode(&self, passcode: String) -> RpcResult<bool>;

    #[method(name = "isAdmin")]
    async fn is_admin(&self) -> RpcResult<bool>;

    // ── Admin only ────────────────────────────────────────────────────────────

    /// `status` is "paid" or "rejected".
    #[method(name = "setWithdrawalStatus")]
    async fn set_withdrawal_status(&self, id: String, status: String) -> RpcResult<WithdrawalRequest>;

    /// Apply the console's text fields and task list in one step.
    #[method(name = "saveAdmin")]
    async fn save_admin(&self, config_input: ConfigInput, tasks: Vec<Task>) -> RpcResult<AppConfig>;

    #[method(name = "updateMonetization")]
    async fn update_monetization(&self, monetization: Monetization) -> RpcResult<Monetization>;

    /// Free-text amount; anything unreadable or negative credits nothing.
    /// Returns the new balance.
    #[method(name = "addBalance")]
    async fn add_balance(&self, amount: String) -> RpcResult<Amount>;

    #[method(name = "resetAll")]
    async fn reset_all(&self) -> RpcResult<AppState>;
}
