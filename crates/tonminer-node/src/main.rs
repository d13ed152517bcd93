//! tonminer-node — the reward engine as a local service.
//!
//! Startup sequence:
//!   1. Open (or create) the sled store
//!   2. Load the persisted document, falling back to defaults
//!   3. Start the background writer and the engine service (periodic tick)
//!   4. Start the JSON-RPC 2.0 server
//!   5. Run until Ctrl-C, then drain pending writes and flush

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use tonminer_core::constants::{DEFAULT_ADMIN_PASSCODE, DEFAULT_USERNAME, TICK_INTERVAL_MS};
use tonminer_rpc::{RpcServer, RpcServerState};
use tonminer_state::{
    BackgroundWriter, EngineOptions, EngineService, RewardEngine, StateDb, SystemClock, TracingFeedback,
    WithdrawalPolicy,
};

#[derive(Parser, Debug)]
#[command(
    name = "tonminer-node",
    version,
    about = "TON Miner — reward state engine behind the Mini App"
)]
struct Args {
    /// Directory for the persistent state store.
    #[arg(long, default_value = "~/.tonminer/data")]
    data_dir: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8645")]
    rpc_addr: SocketAddr,

    /// Interval between session-expiry checks, in milliseconds.
    #[arg(long, default_value_t = TICK_INTERVAL_MS)]
    tick_ms: u64,

    /// Passcode that unlocks admin mode after the secret tap gesture.
    #[arg(long, default_value = DEFAULT_ADMIN_PASSCODE)]
    admin_passcode: String,

    /// Credit the amount back when an admin rejects a withdrawal.
    #[arg(long)]
    refund_on_reject: bool,

    /// Name recorded on withdrawal requests.
    #[arg(long, default_value = DEFAULT_USERNAME)]
    username: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tonminer=debug")),
        )
        .init();

    let args = Args::parse();
    info!("TON Miner node starting");

    // ── State store ───────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let db = Arc::new(StateDb::open(&data_dir).context("opening state store")?);

    // ── Engine ────────────────────────────────────────────────────────────────
    let options = EngineOptions {
        withdrawal_policy: if args.refund_on_reject {
            WithdrawalPolicy::RefundOnReject
        } else {
            WithdrawalPolicy::KeepDeducted
        },
        admin_passcode: args.admin_passcode.clone(),
        username: args.username.clone(),
    };
    if args.admin_passcode == DEFAULT_ADMIN_PASSCODE {
        warn!("admin passcode is the built-in default");
    }

    let (writer, writer_task) = BackgroundWriter::spawn(Arc::clone(&db));
    let engine = RewardEngine::load(&db, Arc::new(writer), Arc::new(TracingFeedback), options);
    info!(
        balance = %engine.balance(),
        referral_code = %engine.state().referral_code,
        policy = ?engine.options().withdrawal_policy,
        "engine loaded"
    );

    let tick = Duration::from_millis(args.tick_ms.max(1));
    let (handle, service_task) = EngineService::spawn(engine, Arc::new(SystemClock), tick);

    // ── RPC server ────────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState { engine: handle.clone() });
    let (rpc_addr, rpc_handle) = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    info!(%rpc_addr, "node ready");
    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("shutting down");

    // ── Shutdown: stop intake, stop the engine, drain the writer ─────────────
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    rpc_handle.stopped().await;
    handle.shutdown();
    service_task.await.context("engine service panicked")?;
    writer_task.await.context("state writer panicked")?;
    db.flush().context("final flush")?;

    info!("bye");
    Ok(())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
