//! tonminer — command-line client for a running tonminer-node.
//!
//! Usage:
//!   tonminer status                         [--rpc <url>]
//!   tonminer mine | daily | faucet | ad     [--rpc <url>]
//!   tonminer task     <id>
//!   tonminer withdraw --wallet <addr> --amount <ton>
//!   tonminer admin    [--passcode <code>] <pay|reject|add-balance|config|tasks|monetization|withdrawals|reset>

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;

use tonminer_core::constants::{ADMIN_TAP_COUNT, DEFAULT_ADMIN_PASSCODE};
use tonminer_core::input::ConfigInput;
use tonminer_core::state::{Monetization, Task};
use tonminer_core::types::Amount;
use tonminer_rpc::RpcClaim;

mod rpc_client;
use rpc_client::MinerRpcClient;

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tonminer", version, about = "TON Miner — mine, claim and manage rewards")]
struct Args {
    /// Node RPC endpoint.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8645")]
    rpc: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print balance, session progress and cooldowns.
    Status,

    /// Dump the full persisted document as JSON.
    State,

    /// Start a mining session.
    Mine,

    /// Claim the daily gift.
    Daily,

    /// Claim the faucet.
    Faucet,

    /// Claim the ad-watch bonus.
    Ad,

    /// Complete a task by id.
    Task { id: String },

    /// Request a manual payout.
    Withdraw {
        /// TON wallet address.
        #[arg(long)]
        wallet: String,
        /// Amount in TON, e.g. 0.005.
        #[arg(long)]
        amount: String,
    },

    /// Admin console. Unlocks admin mode on the node first if needed.
    Admin(AdminArgs),
}

#[derive(ClapArgs, Debug)]
struct AdminArgs {
    #[arg(long, default_value = DEFAULT_ADMIN_PASSCODE)]
    passcode: String,

    #[command(subcommand)]
    command: AdminCommand,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// List withdrawal requests, newest first.
    Withdrawals,

    /// Mark a pending withdrawal as paid.
    Pay { id: String },

    /// Reject a pending withdrawal.
    Reject { id: String },

    /// Credit the balance (TON).
    AddBalance { amount: String },

    /// Change config fields; omitted fields keep their current value.
    Config {
        #[arg(long)]
        mining_rate: Option<String>,
        #[arg(long)]
        faucet_reward: Option<String>,
        #[arg(long)]
        daily_gift_reward: Option<String>,
        /// Milliseconds.
        #[arg(long)]
        session_duration: Option<String>,
        /// Milliseconds.
        #[arg(long)]
        faucet_cooldown: Option<String>,
    },

    /// Replace the task list from a JSON file (array of tasks).
    Tasks { file: PathBuf },

    /// Update ad settings; omitted fields keep their current value.
    Monetization {
        #[arg(long)]
        tag_id: Option<String>,
        #[arg(long)]
        sponsored_link: Option<String>,
        /// TON per ad watch.
        #[arg(long)]
        ad_bonus: Option<String>,
    },

    /// Wipe all state back to defaults.
    Reset {
        /// Required; there is no undo.
        #[arg(long)]
        yes: bool,
    },
}

// ── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,tonminer=info")
        .init();

    let args = Args::parse();
    let client = MinerRpcClient::new(&args.rpc);

    match args.command {
        Command::Status => cmd_status(&client).await,

        Command::State => {
            let state = client.get_state().await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }

        Command::Mine => {
            let started = client.start_mining().await?;
            if let Some(reward) = started.settled_reward {
                println!("Previous session credited: +{} TON", reward);
            }
            println!("Mining until {}", local_time(started.ends_at));
            Ok(())
        }

        Command::Daily => print_claim("Daily Reward Claimed!", client.claim_daily_gift().await?),
        Command::Faucet => print_claim("Faucet Reward Claimed!", client.claim_faucet().await?),
        Command::Ad => print_claim("Ad bonus claimed", client.claim_ad_bonus().await?),
        Command::Task { id } => print_claim("Task Completed!", client.complete_task(&id).await?),

        Command::Withdraw { wallet, amount } => {
            let req = client.request_withdrawal(&wallet, &amount).await?;
            println!("Withdrawal Request Sent");
            println!("  id:      {}", req.id);
            println!("  amount:  {} TON", req.amount);
            println!("  wallet:  {}", req.wallet_address);
            Ok(())
        }

        Command::Admin(admin) => {
            ensure_admin(&client, &admin.passcode).await?;
            cmd_admin(&client, admin.command).await
        }
    }
}

// ── User commands ─────────────────────────────────────────────────────────────

async fn cmd_status(client: &MinerRpcClient) -> anyhow::Result<()> {
    let d = client.get_dashboard().await?;
    println!("Balance:        {} TON", d.balance);
    println!("Referral code:  {}", d.referral_code);
    println!("Active miners:  {}", d.active_miners);
    if d.is_mining {
        println!(
            "Mining:         {:.0}%  (+{} TON so far, {} left)",
            d.session_progress * 100.0,
            d.mined_this_session,
            clock_label(d.session_remaining_ms)
        );
    } else {
        println!("Mining:         idle  ({} TON per session)", d.mining_rate);
    }
    println!("Daily gift:     {}", d.daily_gift_label);
    println!("Faucet:         {}", d.faucet_label);
    println!("Tasks:");
    for t in &d.tasks {
        let mark = if t.completed { "x" } else { " " };
        println!("  [{mark}] {:<4} {:<28} +{} TON", t.id, t.title, t.reward);
    }
    if d.pending_withdrawals > 0 {
        println!("Pending withdrawals: {}", d.pending_withdrawals);
    }
    Ok(())
}

fn print_claim(headline: &str, claim: RpcClaim) -> anyhow::Result<()> {
    println!("{headline}  +{} TON", claim.reward);
    println!("Balance: {} TON", claim.balance);
    Ok(())
}

// ── Admin commands ────────────────────────────────────────────────────────────

/// Run the tap gesture and passcode check unless the node is already unlocked.
async fn ensure_admin(client: &MinerRpcClient, passcode: &str) -> anyhow::Result<()> {
    if client.is_admin().await? {
        return Ok(());
    }
    let mut opened = false;
    for _ in 0..ADMIN_TAP_COUNT {
        opened |= client.admin_tap().await?.prompt_open;
    }
    if !opened {
        bail!("passcode prompt did not open");
    }
    client
        .verify_passcode(passcode)
        .await
        .context("unlocking admin mode")?;
    info!("admin mode enabled");
    Ok(())
}

async fn cmd_admin(client: &MinerRpcClient, command: AdminCommand) -> anyhow::Result<()> {
    match command {
        AdminCommand::Withdrawals => {
            let state = client.get_state().await?;
            if state.withdrawals.is_empty() {
                println!("No withdrawal requests.");
            }
            for w in state.withdrawals_newest_first() {
                println!(
                    "{:<14} {:<9} {:>12} TON  {}  {}  {}",
                    w.id, w.status.to_string(), w.amount.to_string(), w.wallet_address, w.username, w.requested_at
                );
            }
            Ok(())
        }

        AdminCommand::Pay { id } => {
            let w = client.set_withdrawal_status(&id, "paid").await?;
            println!("{} → {}", w.id, w.status);
            Ok(())
        }

        AdminCommand::Reject { id } => {
            let w = client.set_withdrawal_status(&id, "rejected").await?;
            println!("{} → {}", w.id, w.status);
            Ok(())
        }

        AdminCommand::AddBalance { amount } => {
            let balance = client.add_balance(&amount).await?;
            println!("Balance: {} TON", balance);
            Ok(())
        }

        AdminCommand::Config {
            mining_rate,
            faucet_reward,
            daily_gift_reward,
            session_duration,
            faucet_cooldown,
        } => {
            let state = client.get_state().await?;
            let current = ConfigInput::from_config(&state.config);
            let input = ConfigInput {
                mining_rate: mining_rate.unwrap_or(current.mining_rate),
                faucet_reward: faucet_reward.unwrap_or(current.faucet_reward),
                daily_gift_reward: daily_gift_reward.unwrap_or(current.daily_gift_reward),
                session_duration: session_duration.unwrap_or(current.session_duration),
                faucet_cooldown: faucet_cooldown.unwrap_or(current.faucet_cooldown),
            };
            let config = client.save_admin(&input, &state.tasks).await?;
            println!("Changes Saved Successfully!");
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }

        AdminCommand::Tasks { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("reading tasks from {}", file.display()))?;
            let tasks: Vec<Task> = serde_json::from_str(&json).context("parsing tasks JSON")?;
            let state = client.get_state().await?;
            client
                .save_admin(&ConfigInput::from_config(&state.config), &tasks)
                .await?;
            println!("Changes Saved Successfully! ({} tasks)", tasks.len());
            Ok(())
        }

        AdminCommand::Monetization { tag_id, sponsored_link, ad_bonus } => {
            let current = client.get_state().await?.monetization;
            let ad_bonus = match ad_bonus {
                Some(s) => s
                    .trim()
                    .parse::<Amount>()
                    .map_err(|e| anyhow::anyhow!("--ad-bonus: {e}"))?,
                None => current.ad_bonus,
            };
            let next = Monetization {
                monetag_tag_id: tag_id.unwrap_or(current.monetag_tag_id),
                sponsored_link: sponsored_link.unwrap_or(current.sponsored_link),
                ad_bonus,
            };
            let saved = client.update_monetization(&next).await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
            Ok(())
        }

        AdminCommand::Reset { yes } => {
            if !yes {
                bail!("refusing to reset without --yes");
            }
            let state = client.reset_all().await?;
            println!("State reset. New referral code: {}", state.referral_code);
            Ok(())
        }
    }
}

// ── Formatting ────────────────────────────────────────────────────────────────

fn clock_label(ms: u64) -> String {
    let total = ms / 1000;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn local_time(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}
