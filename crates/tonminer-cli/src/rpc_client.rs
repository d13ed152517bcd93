use anyhow::{bail, Context};
use serde::de::DeserializeOwned;

use tonminer_core::input::ConfigInput;
use tonminer_core::state::{AppConfig, AppState, Monetization, Task, WithdrawalRequest};
use tonminer_core::types::Amount;
use tonminer_rpc::{RpcClaim, RpcDashboard, RpcSessionStart, RpcTap};

/// JSON-RPC 2.0 client for a running `tonminer-node`.
///
/// Plain HTTP POST with serde_json; results are decoded into the node's own
/// result types.
pub struct MinerRpcClient {
    url: String,
    client: reqwest::Client,
}

impl MinerRpcClient {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Call a JSON-RPC method and decode the `result` field.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> anyhow::Result<T> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("connecting to node at {}", self.url))?;

        let json: serde_json::Value = resp.json().await.context("parsing RPC response")?;

        if let Some(err) = json.get("error") {
            let message = err["message"].as_str().unwrap_or("unknown error");
            bail!("{method}: {message} (code {})", err["code"]);
        }

        serde_json::from_value(json["result"].clone()).with_context(|| format!("decoding {method} result"))
    }

    pub async fn get_state(&self) -> anyhow::Result<AppState> {
        self.call("miner_getState", serde_json::json!([])).await
    }

    pub async fn get_dashboard(&self) -> anyhow::Result<RpcDashboard> {
        self.call("miner_getDashboard", serde_json::json!([])).await
    }

    pub async fn start_mining(&self) -> anyhow::Result<RpcSessionStart> {
        self.call("miner_startMining", serde_json::json!([])).await
    }

    pub async fn claim_daily_gift(&self) -> anyhow::Result<RpcClaim> {
        self.call("miner_claimDailyGift", serde_json::json!([])).await
    }

    pub async fn claim_faucet(&self) -> anyhow::Result<RpcClaim> {
        self.call("miner_claimFaucet", serde_json::json!([])).await
    }

    pub async fn claim_ad_bonus(&self) -> anyhow::Result<RpcClaim> {
        self.call("miner_claimAdBonus", serde_json::json!([])).await
    }

    pub async fn complete_task(&self, task_id: &str) -> anyhow::Result<RpcClaim> {
        self.call("miner_completeTask", serde_json::json!([task_id])).await
    }

    pub async fn request_withdrawal(&self, wallet: &str, amount: &str) -> anyhow::Result<WithdrawalRequest> {
        self.call("miner_requestWithdrawal", serde_json::json!([wallet, amount]))
            .await
    }

    pub async fn admin_tap(&self) -> anyhow::Result<RpcTap> {
        self.call("miner_adminTap", serde_json::json!([])).await
    }

    pub async fn verify_passcode(&self, passcode: &str) -> anyhow::Result<bool> {
        self.call("miner_verifyPasscode", serde_json::json!([passcode])).await
    }

    pub async fn is_admin(&self) -> anyhow::Result<bool> {
        self.call("miner_isAdmin", serde_json::json!([])).await
    }

    pub async fn set_withdrawal_status(&self, id: &str, status: &str) -> anyhow::Result<WithdrawalRequest> {
        self.call("miner_setWithdrawalStatus", serde_json::json!([id, status]))
            .await
    }

    pub async fn save_admin(&self, input: &ConfigInput, tasks: &[Task]) -> anyhow::Result<AppConfig> {
        self.call("miner_saveAdmin", serde_json::json!([input, tasks])).await
    }

    pub async fn update_monetization(&self, monetization: &Monetization) -> anyhow::Result<Monetization> {
        self.call("miner_updateMonetization", serde_json::json!([monetization]))
            .await
    }

    pub async fn add_balance(&self, amount: &str) -> anyhow::Result<Amount> {
        self.call("miner_addBalance", serde_json::json!([amount])).await
    }

    pub async fn reset_all(&self) -> anyhow::Result<AppState> {
        self.call("miner_resetAll", serde_json::json!([])).await
    }
}
