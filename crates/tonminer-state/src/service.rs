//! Single-owner runtime for the engine.
//!
//! `EngineService` owns the `RewardEngine` inside one tokio task. Callers talk
//! to it through an `EngineHandle`, which ships closures over an mpsc mailbox
//! and awaits the reply on a oneshot. The same task drives the periodic tick,
//! so ticks and user operations are strictly serialized.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use tonminer_core::error::MinerError;
use tonminer_core::input::ConfigInput;
use tonminer_core::state::{AppConfig, AppState, Monetization, Task, WithdrawalRequest, WithdrawalStatus};
use tonminer_core::types::{now_ms, Amount, Timestamp};

use crate::admin::TapOutcome;
use crate::db::{StateDb, StateSink};
use crate::engine::{RewardEngine, SessionFinished};
use crate::timers::Readiness;

// ── Clock ─────────────────────────────────────────────────────────────────────

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock milliseconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now_ms()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self(AtomicI64::new(start))
    }

    pub fn set(&self, now: Timestamp) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) -> Timestamp {
        self.0.fetch_add(ms, Ordering::SeqCst) + ms
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.load(Ordering::SeqCst)
    }
}

// ── BackgroundWriter ──────────────────────────────────────────────────────────

enum WriteOp {
    Put(Vec<u8>),
    Clear,
}

/// Moves sled writes off the engine task. Snapshots queued behind a newer one
/// are skipped; the last write always lands, and the store is flushed once
/// every sender has been dropped.
pub struct BackgroundWriter {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl BackgroundWriter {
    pub fn spawn(db: Arc<StateDb>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteOp>();
        let handle = tokio::task::spawn_blocking(move || {
            while let Some(mut op) = rx.blocking_recv() {
                // Coalesce a backlog down to its latest operation.
                while let Ok(next) = rx.try_recv() {
                    op = next;
                }
                match op {
                    WriteOp::Put(bytes) => db.persist(bytes),
                    WriteOp::Clear => db.clear(),
                }
            }
            match db.flush() {
                Ok(()) => debug!("state writer drained"),
                Err(e) => warn!(error = %e, "final flush failed"),
            }
        });
        (Self { tx }, handle)
    }

    fn send(&self, op: WriteOp) {
        if self.tx.send(op).is_err() {
            warn!("state writer has stopped — snapshot dropped");
        }
    }
}

impl StateSink for BackgroundWriter {
    fn persist(&self, snapshot: Vec<u8>) {
        self.send(WriteOp::Put(snapshot));
    }

    fn clear(&self) {
        self.send(WriteOp::Clear);
    }
}

// ── EngineService ─────────────────────────────────────────────────────────────

type Job = Box<dyn FnOnce(&mut RewardEngine, Timestamp) + Send>;

const MAILBOX_CAPACITY: usize = 256;

pub struct EngineService {
    engine: RewardEngine,
    clock: Arc<dyn Clock>,
    jobs: mpsc::Receiver<Job>,
    shutdown: watch::Receiver<bool>,
    tick_every: Duration,
}

impl EngineService {
    /// Move `engine` onto its own task. The task ends, dropping the engine and
    /// with it the sink, when `EngineHandle::shutdown` is called or every
    /// handle is gone.
    pub fn spawn(
        engine: RewardEngine,
        clock: Arc<dyn Clock>,
        tick_every: Duration,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (job_tx, jobs) = mpsc::channel(MAILBOX_CAPACITY);
        let (shutdown_tx, shutdown) = watch::channel(false);
        let service = Self { engine, clock: clock.clone(), jobs, shutdown, tick_every };
        let task = tokio::spawn(service.run());
        let handle = EngineHandle {
            jobs: job_tx,
            clock,
            shutdown: Arc::new(shutdown_tx),
        };
        (handle, task)
    }

    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(tick_ms = self.tick_every.as_millis() as u64, "engine service running");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }

                job = self.jobs.recv() => match job {
                    Some(job) => {
                        let now = self.clock.now();
                        job(&mut self.engine, now);
                    }
                    None => break,
                },

                _ = ticker.tick() => {
                    self.engine.tick(self.clock.now());
                }
            }
        }
        info!("engine service stopped");
    }
}

// ── EngineHandle ──────────────────────────────────────────────────────────────

/// Cloneable front door to a running `EngineService`.
#[derive(Clone)]
pub struct EngineHandle {
    jobs: mpsc::Sender<Job>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl EngineHandle {
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Run `f` on the engine task with the service clock's current time.
    pub async fn call<R, F>(&self, f: F) -> Result<R, MinerError>
    where
        F: FnOnce(&mut RewardEngine, Timestamp) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |engine: &mut RewardEngine, now: Timestamp| {
            let _ = reply_tx.send(f(engine, now));
        });
        self.jobs.send(job).await.map_err(|_| MinerError::ServiceStopped)?;
        reply_rx.await.map_err(|_| MinerError::ServiceStopped)
    }

    /// Like `call`, but refused with `AdminLocked` unless admin mode is on.
    pub async fn call_admin<R, F>(&self, f: F) -> Result<R, MinerError>
    where
        F: FnOnce(&mut RewardEngine, Timestamp) -> Result<R, MinerError> + Send + 'static,
        R: Send + 'static,
    {
        self.call(move |engine, now| {
            engine.require_admin()?;
            f(engine, now)
        })
        .await?
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub async fn state(&self) -> Result<AppState, MinerError> {
        self.call(|e, _| e.state().clone()).await
    }

    pub async fn readiness(&self) -> Result<Readiness, MinerError> {
        self.call(|e, now| e.readiness(now)).await
    }

    pub async fn is_admin(&self) -> Result<bool, MinerError> {
        self.call(|e, _| e.is_admin_unlocked()).await
    }

    // ── User operations ───────────────────────────────────────────────────────

    pub async fn start_mining(&self) -> Result<Option<SessionFinished>, MinerError> {
        self.call(|e, now| e.start_mining_session(now)).await?
    }

    pub async fn claim_daily_gift(&self) -> Result<Amount, MinerError> {
        self.call(|e, now| e.claim_daily_gift(now)).await?
    }

    pub async fn claim_faucet(&self) -> Result<Amount, MinerError> {
        self.call(|e, now| e.claim_faucet(now)).await?
    }

    pub async fn claim_ad_bonus(&self) -> Result<Amount, MinerError> {
        self.call(|e, _| e.claim_ad_bonus()).await
    }

    pub async fn complete_task(&self, task_id: String) -> Result<Amount, MinerError> {
        self.call(move |e, _| e.complete_task(&task_id)).await?
    }

    pub async fn request_withdrawal(&self, wallet: String, amount: Amount) -> Result<WithdrawalRequest, MinerError> {
        self.call(move |e, now| e.request_withdrawal(&wallet, amount, now)).await?
    }

    // ── Admin gate ────────────────────────────────────────────────────────────

    pub async fn admin_tap(&self) -> Result<TapOutcome, MinerError> {
        self.call(|e, now| e.admin_tap(now)).await
    }

    pub async fn verify_passcode(&self, passcode: String) -> Result<(), MinerError> {
        self.call(move |e, _| e.verify_passcode(&passcode)).await?
    }

    // ── Admin operations ──────────────────────────────────────────────────────

    pub async fn set_withdrawal_status(&self, id: String, status: WithdrawalStatus) -> Result<(), MinerError> {
        self.call_admin(move |e, _| e.set_withdrawal_status(&id, status)).await
    }

    pub async fn update_config(&self, config: AppConfig) -> Result<AppConfig, MinerError> {
        self.call_admin(move |e, _| {
            e.update_config(config);
            Ok(e.state().config.clone())
        })
        .await
    }

    pub async fn update_tasks(&self, tasks: Vec<Task>) -> Result<(), MinerError> {
        self.call_admin(move |e, _| e.update_tasks(tasks)).await
    }

    pub async fn save_admin(&self, input: ConfigInput, tasks: Vec<Task>) -> Result<AppConfig, MinerError> {
        self.call_admin(move |e, _| e.save_admin(&input, tasks)).await
    }

    pub async fn update_monetization(&self, monetization: Monetization) -> Result<(), MinerError> {
        self.call_admin(move |e, _| {
            e.update_monetization(monetization);
            Ok(())
        })
        .await
    }

    pub async fn add_balance(&self, amount: Amount) -> Result<Amount, MinerError> {
        self.call_admin(move |e, _| Ok(e.add_balance(amount))).await
    }

    pub async fn reset_all(&self) -> Result<(), MinerError> {
        self.call_admin(|e, _| {
            e.reset_all();
            Ok(())
        })
        .await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
