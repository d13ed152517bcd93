use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use tonminer_core::error::MinerError;
use tonminer_core::input::{coerce_amount, ConfigInput};
use tonminer_core::state::{AppConfig, AppState, Monetization, Task, WithdrawalRequest, WithdrawalStatus};
use tonminer_core::types::Amount;
use tonminer_state::{EngineHandle, TapOutcome};

use crate::api::MinerApiServer;
use crate::types::{RpcClaim, RpcDashboard, RpcSessionStart, RpcTap};

pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const REJECTED: i32 = -32001;
pub const ADMIN_LOCKED: i32 = -32002;

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

fn engine_err(method: &str, e: MinerError) -> ErrorObject<'static> {
    let code = match &e {
        MinerError::AdminLocked => ADMIN_LOCKED,
        MinerError::InvalidAmount(_) => INVALID_PARAMS,
        e if e.is_rejection() => REJECTED,
        _ => INTERNAL_ERROR,
    };
    warn!(method, code, error = %e, "rpc call refused");
    rpc_err(code, e.to_string())
}

/// Shared state passed to the RPC server.
pub struct RpcServerState {
    pub engine: EngineHandle,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr` with permissive CORS, since the
    /// Mini App front end is served from another origin. Returns the bound
    /// address and a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<(SocketAddr, ServerHandle)> {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);
        let middleware = tower::ServiceBuilder::new().layer(cors);

        let server = Server::builder().set_http_middleware(middleware).build(addr).await?;
        let bound = server.local_addr()?;
        let module = self.into_rpc();
        let handle = server.start(module);
        info!(addr = %bound, "RPC server started");
        Ok((bound, handle))
    }

    fn engine(&self) -> &EngineHandle {
        &self.state.engine
    }
}

#[async_trait]
impl MinerApiServer for RpcServer {
    async fn get_state(&self) -> RpcResult<AppState> {
        self.engine().state().await.map_err(|e| engine_err("getState", e))
    }

    async fn get_dashboard(&self) -> RpcResult<RpcDashboard> {
        self.engine()
            .call(|e, now| RpcDashboard::build(e.state(), e.readiness(now)))
            .await
            .map_err(|e| engine_err("getDashboard", e))
    }

    async fn start_mining(&self) -> RpcResult<RpcSessionStart> {
        self.engine()
            .call(|e, now| -> Result<RpcSessionStart, MinerError> {
                let settled = e.start_mining_session(now)?;
                let duration = e.state().config.session_duration;
                Ok(RpcSessionStart {
                    started_at: now,
                    ends_at: now.saturating_add(i64::try_from(duration).unwrap_or(i64::MAX)),
                    settled_reward: settled.map(|s| s.reward),
                    balance: e.balance(),
                })
            })
            .await
            .and_then(|r| r)
            .map_err(|e| engine_err("startMining", e))
    }

    async fn claim_daily_gift(&self) -> RpcResult<RpcClaim> {
        self.engine()
            .call(|e, now| e.claim_daily_gift(now).map(|reward| RpcClaim { reward, balance: e.balance() }))
            .await
            .and_then(|r| r)
            .map_err(|e| engine_err("claimDailyGift", e))
    }

    async fn claim_faucet(&self) -> RpcResult<RpcClaim> {
        self.engine()
            .call(|e, now| e.claim_faucet(now).map(|reward| RpcClaim { reward, balance: e.balance() }))
            .await
            .and_then(|r| r)
            .map_err(|e| engine_err("claimFaucet", e))
    }

    async fn claim_ad_bonus(&self) -> RpcResult<RpcClaim> {
        self.engine()
            .call(|e, _| {
                let reward = e.claim_ad_bonus();
                RpcClaim { reward, balance: e.balance() }
            })
            .await
            .map_err(|e| engine_err("claimAdBonus", e))
    }

    async fn complete_task(&self, task_id: String) -> RpcResult<RpcClaim> {
        self.engine()
            .call(move |e, _| e.complete_task(&task_id).map(|reward| RpcClaim { reward, balance: e.balance() }))
            .await
            .and_then(|r| r)
            .map_err(|e| engine_err("completeTask", e))
    }

    async fn request_withdrawal(&self, wallet: String, amount: String) -> RpcResult<WithdrawalRequest> {
        let amount: Amount = amount
            .trim()
            .parse()
            .map_err(|e: MinerError| rpc_err(INVALID_PARAMS, e.to_string()))?;
        self.engine()
            .request_withdrawal(wallet, amount)
            .await
            .map_err(|e| engine_err("requestWithdrawal", e))
    }

    async fn admin_tap(&self) -> RpcResult<RpcTap> {
        let outcome = self.engine().admin_tap().await.map_err(|e| engine_err("adminTap", e))?;
        Ok(match outcome {
            TapOutcome::Counting(taps) => RpcTap { prompt_open: false, taps },
            TapOutcome::PromptOpened => RpcTap { prompt_open: true, taps: 0 },
        })
    }

    async fn verify_passcode(&self, passcode: String) -> RpcResult<bool> {
        self.engine()
            .verify_passcode(passcode)
            .await
            .map(|()| true)
            .map_err(|e| engine_err("verifyPasscode", e))
    }

    async fn is_admin(&self) -> RpcResult<bool> {
        self.engine().is_admin().await.map_err(|e| engine_err("isAdmin", e))
    }

    async fn set_withdrawal_status(&self, id: String, status: String) -> RpcResult<WithdrawalRequest> {
        let status: WithdrawalStatus = status
            .parse()
            .map_err(|e: MinerError| rpc_err(INVALID_PARAMS, e.to_string()))?;
        self.engine()
            .call_admin(move |e, _| {
                e.set_withdrawal_status(&id, status)?;
                e.state()
                    .find_withdrawal(&id)
                    .cloned()
                    .ok_or(MinerError::WithdrawalNotFound(id))
            })
            .await
            .map_err(|e| engine_err("setWithdrawalStatus", e))
    }

    async fn save_admin(&self, config_input: ConfigInput, tasks: Vec<Task>) -> RpcResult<AppConfig> {
        self.engine()
            .save_admin(config_input, tasks)
            .await
            .map_err(|e| engine_err("saveAdmin", e))
    }

    async fn update_monetization(&self, monetization: Monetization) -> RpcResult<Monetization> {
        self.engine()
            .call_admin(move |e, _| {
                e.update_monetization(monetization);
                Ok(e.state().monetization.clone())
            })
            .await
            .map_err(|e| engine_err("updateMonetization", e))
    }

    async fn add_balance(&self, amount: String) -> RpcResult<Amount> {
        self.engine()
            .add_balance(coerce_amount(&amount))
            .await
            .map_err(|e| engine_err("addBalance", e))
    }

    async fn reset_all(&self) -> RpcResult<AppState> {
        let state = self
            .engine()
            .call_admin(|e, _| {
                e.reset_all();
                Ok(e.state().clone())
            })
            .await
            .map_err(|e| engine_err("resetAll", e))?;
        info!(code = %state.referral_code, "state reset over rpc");
        Ok(state)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
