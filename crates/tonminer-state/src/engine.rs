use std::sync::Arc;

use tonminer_core::constants::{DEFAULT_ADMIN_PASSCODE, DEFAULT_USERNAME};
use tonminer_core::error::MinerError;
use tonminer_core::input::ConfigInput;
use tonminer_core::state::{
    first_duplicate_id, AppConfig, AppState, Monetization, Task, WithdrawalRequest, WithdrawalStatus,
};
use tonminer_core::types::{format_request_time, Amount, Timestamp};
use tracing::{debug, info, warn};

use crate::admin::{AdminGate, TapOutcome};
use crate::db::{StateDb, StateSink};
use crate::feedback::{Haptic, HostFeedback, ToastKind};
use crate::timers::{self, Readiness};

// ── Options ───────────────────────────────────────────────────────────────────

/// What happens to the deducted balance when an admin rejects a withdrawal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WithdrawalPolicy {
    /// The amount stays deducted (the app's historical behaviour).
    #[default]
    KeepDeducted,
    /// The amount is credited back on rejection.
    RefundOnReject,
}

#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub withdrawal_policy: WithdrawalPolicy,
    pub admin_passcode: String,
    /// Name recorded on withdrawal requests.
    pub username: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            withdrawal_policy: WithdrawalPolicy::default(),
            admin_passcode: DEFAULT_ADMIN_PASSCODE.to_string(),
            username: DEFAULT_USERNAME.to_string(),
        }
    }
}

/// A session credited by `tick` (or settled before a new one starts).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionFinished {
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub reward: Amount,
}

// ── RewardEngine ──────────────────────────────────────────────────────────────

/// The reward state engine.
///
/// Sole owner of `AppState`. Every method is one named transition: it checks
/// its preconditions against the current state, and either applies the whole
/// change and hands a snapshot to the sink, or returns an error having changed
/// nothing.
pub struct RewardEngine {
    state: AppState,
    admin: AdminGate,
    sink: Arc<dyn StateSink>,
    feedback: Arc<dyn HostFeedback>,
    options: EngineOptions,
}

impl RewardEngine {
    pub fn new(
        state: AppState,
        sink: Arc<dyn StateSink>,
        feedback: Arc<dyn HostFeedback>,
        options: EngineOptions,
    ) -> Self {
        let admin = AdminGate::new(options.admin_passcode.clone());
        Self { state, admin, sink, feedback, options }
    }

    /// Start from whatever `db` holds. A missing or malformed document yields
    /// fresh defaults, which are written back immediately.
    pub fn load(
        db: &StateDb,
        sink: Arc<dyn StateSink>,
        feedback: Arc<dyn HostFeedback>,
        options: EngineOptions,
    ) -> Self {
        let (state, fresh) = match db.load_app_state() {
            Ok(Some(state)) => {
                info!(balance = %state.stats.balance, code = %state.referral_code, "loaded persisted state");
                (state, false)
            }
            Ok(None) => {
                info!("no persisted state — starting fresh");
                (AppState::new_default(), true)
            }
            Err(e) => {
                warn!(error = %e, "persisted state unusable — starting fresh");
                (AppState::new_default(), true)
            }
        };
        let engine = Self::new(state, sink, feedback, options);
        if fresh {
            engine.commit();
        }
        engine
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn balance(&self) -> Amount {
        self.state.stats.balance
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn readiness(&self, now: Timestamp) -> Readiness {
        Readiness::compute(&self.state, now)
    }

    pub fn is_admin_unlocked(&self) -> bool {
        self.admin.is_unlocked()
    }

    /// Gate for admin-only transitions.
    pub fn require_admin(&self) -> Result<(), MinerError> {
        if self.admin.is_unlocked() {
            Ok(())
        } else {
            Err(MinerError::AdminLocked)
        }
    }

    // ── Mining session ────────────────────────────────────────────────────────

    /// Begin a session at `now`. A session that has already run its course
    /// but not been ticked yet is credited first; a session still running
    /// makes this a no-op error. Zero-length sessions are only ever credited
    /// by `tick`, so restarting cannot pay out faster than the tick rate.
    pub fn start_mining_session(&mut self, now: Timestamp) -> Result<Option<SessionFinished>, MinerError> {
        let stats = &self.state.stats;
        let config = &self.state.config;
        let running = stats.session_start_time.is_some()
            && (config.session_duration == 0 || !timers::session_expired(stats, config, now));
        if running {
            return Err(MinerError::SessionActive {
                remaining_ms: timers::session_remaining(stats, config, now),
            });
        }
        let settled = self.settle_session(now);
        self.state.stats.session_start_time = Some(now);
        self.commit();
        info!(at = now, duration_ms = self.state.config.session_duration, "mining session started");
        Ok(settled)
    }

    /// Periodic check. Credits one `miningRate` when the running session has
    /// reached its end, however long ago that was; otherwise does nothing.
    pub fn tick(&mut self, now: Timestamp) -> Option<SessionFinished> {
        let finished = self.settle_session(now);
        if finished.is_some() {
            self.commit();
        }
        finished
    }

    fn settle_session(&mut self, now: Timestamp) -> Option<SessionFinished> {
        let started_at = self.state.stats.session_start_time?;
        if !timers::session_expired(&self.state.stats, &self.state.config, now) {
            return None;
        }
        let reward = self.state.config.mining_rate;
        self.state.stats.balance = self.state.stats.balance.saturating_add(reward);
        self.state.stats.session_start_time = None;

        info!(%reward, balance = %self.state.stats.balance, "mining session finished");
        self.feedback.haptic(Haptic::Success);
        self.feedback
            .toast(&format!("Mining Session Finished: +{reward} TON"), ToastKind::Success);
        Some(SessionFinished { started_at, finished_at: now, reward })
    }

    // ── Cooldown claims ───────────────────────────────────────────────────────

    pub fn claim_daily_gift(&mut self, now: Timestamp) -> Result<Amount, MinerError> {
        let stats = &self.state.stats;
        let remaining_ms =
            timers::cooldown_remaining(stats.last_daily_gift_claimed, self.state.config.daily_gift_cooldown, now);
        if remaining_ms > 0 {
            return Err(MinerError::DailyGiftCoolingDown { remaining_ms });
        }
        let reward = self.state.config.daily_gift_reward;
        self.state.stats.balance = self.state.stats.balance.saturating_add(reward);
        self.state.stats.last_daily_gift_claimed = Some(now);
        self.commit();

        info!(%reward, balance = %self.state.stats.balance, "daily gift claimed");
        self.feedback.toast("Daily Reward Claimed!", ToastKind::Success);
        Ok(reward)
    }

    pub fn claim_faucet(&mut self, now: Timestamp) -> Result<Amount, MinerError> {
        let stats = &self.state.stats;
        let remaining_ms =
            timers::cooldown_remaining(stats.last_faucet_claimed, self.state.config.faucet_cooldown, now);
        if remaining_ms > 0 {
            return Err(MinerError::FaucetCoolingDown { remaining_ms });
        }
        let reward = self.state.config.faucet_reward;
        self.state.stats.balance = self.state.stats.balance.saturating_add(reward);
        self.state.stats.last_faucet_claimed = Some(now);
        self.commit();

        info!(%reward, balance = %self.state.stats.balance, "faucet claimed");
        self.feedback.toast("Faucet Reward Claimed!", ToastKind::Success);
        Ok(reward)
    }

    /// Credit the ad-watch bonus. Not rate limited.
    pub fn claim_ad_bonus(&mut self) -> Amount {
        let bonus = self.state.monetization.ad_bonus;
        self.state.stats.balance = self.state.stats.balance.saturating_add(bonus);
        self.commit();
        info!(%bonus, balance = %self.state.stats.balance, "ad bonus claimed");
        bonus
    }

    // ── Tasks ─────────────────────────────────────────────────────────────────

    pub fn complete_task(&mut self, task_id: &str) -> Result<Amount, MinerError> {
        let task = self
            .state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| MinerError::TaskNotFound(task_id.to_string()))?;
        if task.completed {
            return Err(MinerError::TaskAlreadyCompleted(task_id.to_string()));
        }
        task.completed = true;
        let reward = task.reward;
        self.state.stats.balance = self.state.stats.balance.saturating_add(reward);
        self.commit();

        info!(task_id, %reward, balance = %self.state.stats.balance, "task completed");
        self.feedback.toast("Task Completed!", ToastKind::Success);
        Ok(reward)
    }

    // ── Withdrawals ───────────────────────────────────────────────────────────

    /// Deduct `amount` and queue a Pending request for manual payout. The
    /// wallet address is only checked for being non-empty.
    pub fn request_withdrawal(
        &mut self,
        wallet: &str,
        amount: Amount,
        now: Timestamp,
    ) -> Result<WithdrawalRequest, MinerError> {
        let wallet = wallet.trim();
        if wallet.is_empty() {
            return Err(MinerError::EmptyWalletAddress);
        }
        if amount.is_zero() {
            return Err(MinerError::ZeroAmount);
        }
        let min = self.state.config.min_withdrawal;
        if amount < min {
            return Err(MinerError::BelowMinimumWithdrawal { min });
        }
        let have = self.state.stats.balance;
        let remaining = have
            .checked_sub(amount)
            .ok_or(MinerError::InsufficientBalance { need: amount, have })?;

        let request = WithdrawalRequest {
            id: self.next_withdrawal_id(now),
            username: self.options.username.clone(),
            wallet_address: wallet.to_string(),
            amount,
            status: WithdrawalStatus::Pending,
            requested_at: format_request_time(now),
        };
        self.state.stats.balance = remaining;
        self.state.withdrawals.push(request.clone());
        self.commit();

        info!(id = %request.id, %amount, balance = %remaining, "withdrawal requested");
        self.feedback.toast("Withdrawal Request Sent", ToastKind::Success);
        Ok(request)
    }

    /// Request time in ms as a string, bumped until it is unused.
    fn next_withdrawal_id(&self, now: Timestamp) -> String {
        let mut candidate = now;
        loop {
            let id = candidate.to_string();
            if self.state.find_withdrawal(&id).is_none() {
                return id;
            }
            candidate = candidate.saturating_add(1);
        }
    }

    /// Settle a Pending request as Paid or Rejected. Under the default policy
    /// a rejection does not return the deducted amount.
    pub fn set_withdrawal_status(&mut self, id: &str, status: WithdrawalStatus) -> Result<(), MinerError> {
        if status == WithdrawalStatus::Pending {
            return Err(MinerError::InvalidWithdrawalStatus);
        }
        let request = self
            .state
            .withdrawals
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| MinerError::WithdrawalNotFound(id.to_string()))?;
        if request.status != WithdrawalStatus::Pending {
            return Err(MinerError::WithdrawalNotPending(id.to_string()));
        }
        request.status = status;
        let amount = request.amount;

        let refund = status == WithdrawalStatus::Rejected
            && self.options.withdrawal_policy == WithdrawalPolicy::RefundOnReject;
        if refund {
            self.state.stats.balance = self.state.stats.balance.saturating_add(amount);
        }
        self.commit();

        info!(id, %status, refund, balance = %self.state.stats.balance, "withdrawal settled");
        Ok(())
    }

    // ── Admin edits ───────────────────────────────────────────────────────────

    pub fn update_config(&mut self, config: AppConfig) {
        self.state.config = config.sanitized();
        self.commit();
        info!(
            mining_rate = %self.state.config.mining_rate,
            session_ms = self.state.config.session_duration,
            "config updated"
        );
    }

    /// Coerce free-text admin input onto the current config and store it.
    pub fn apply_config_input(&mut self, input: &ConfigInput) -> AppConfig {
        let next = input.apply_to(&self.state.config);
        self.update_config(next);
        self.state.config.clone()
    }

    /// Replace the task list. Rejected as a whole if two tasks share an id.
    pub fn update_tasks(&mut self, tasks: Vec<Task>) -> Result<(), MinerError> {
        if let Some(id) = first_duplicate_id(tasks.iter().map(|t| t.id.as_str())) {
            return Err(MinerError::DuplicateTaskId(id.to_string()));
        }
        let count = tasks.len();
        self.state.tasks = tasks;
        self.commit();
        info!(count, "tasks updated");
        Ok(())
    }

    pub fn update_monetization(&mut self, monetization: Monetization) {
        self.state.monetization = monetization;
        self.commit();
        info!(ad_bonus = %self.state.monetization.ad_bonus, "monetization updated");
    }

    /// The console's "save all": config input and task list land together or
    /// not at all.
    pub fn save_admin(&mut self, input: &ConfigInput, tasks: Vec<Task>) -> Result<AppConfig, MinerError> {
        if let Some(id) = first_duplicate_id(tasks.iter().map(|t| t.id.as_str())) {
            return Err(MinerError::DuplicateTaskId(id.to_string()));
        }
        self.state.config = input.apply_to(&self.state.config).sanitized();
        self.state.tasks = tasks;
        self.commit();

        info!(tasks = self.state.tasks.len(), "admin changes saved");
        self.feedback.haptic(Haptic::Success);
        self.feedback.alert("✅ Changes Saved Successfully!");
        Ok(self.state.config.clone())
    }

    /// Manual credit. Amounts are unsigned, so this can never take the
    /// balance below zero.
    pub fn add_balance(&mut self, amount: Amount) -> Amount {
        self.state.stats.balance = self.state.stats.balance.saturating_add(amount);
        self.commit();
        info!(%amount, balance = %self.state.stats.balance, "balance added by admin");
        self.state.stats.balance
    }

    /// Wipe storage and start over with fresh defaults and a new referral
    /// code. Admin mode locks again, as after a restart.
    pub fn reset_all(&mut self) {
        self.sink.clear();
        self.state = AppState::new_default();
        self.admin.lock();
        self.commit();
        warn!(code = %self.state.referral_code, "all state reset");
    }

    // ── Admin gate ────────────────────────────────────────────────────────────

    pub fn admin_tap(&mut self, now: Timestamp) -> TapOutcome {
        let outcome = self.admin.tap(now);
        if outcome == TapOutcome::PromptOpened {
            debug!("admin passcode prompt opened");
            self.feedback.haptic(Haptic::Impact);
        }
        outcome
    }

    pub fn verify_passcode(&mut self, input: &str) -> Result<(), MinerError> {
        match self.admin.verify(input) {
            Ok(()) => {
                info!("admin mode enabled");
                self.feedback.toast("Admin Mode Enabled", ToastKind::Success);
                self.feedback.haptic(Haptic::Success);
                Ok(())
            }
            Err(MinerError::InvalidPasscode) => {
                warn!("invalid admin passcode");
                self.feedback.toast("Invalid Passcode!", ToastKind::Error);
                self.feedback.haptic(Haptic::Error);
                Err(MinerError::InvalidPasscode)
            }
            Err(e) => Err(e),
        }
    }

    pub fn close_passcode_prompt(&mut self) {
        self.admin.close_prompt();
    }

    // ── Commit ────────────────────────────────────────────────────────────────

    fn commit(&self) {
        match self.state.to_json() {
            Ok(bytes) => self.sink.persist(bytes),
            Err(e) => warn!(error = %e, "failed to serialize state"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackEvent, RecordingFeedback};
    use tonminer_core::constants::STORAGE_KEY;
    use tonminer_core::input::coerce_amount;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn temp_db(name: &str) -> Arc<StateDb> {
        let dir = std::env::temp_dir().join(format!("tonminer_engine_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        Arc::new(StateDb::open(&dir).expect("open temp db"))
    }

    fn ton(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn engine_with(name: &str, options: EngineOptions) -> (RewardEngine, Arc<StateDb>, Arc<RecordingFeedback>) {
        let db = temp_db(name);
        let feedback = Arc::new(RecordingFeedback::default());
        let engine = RewardEngine::new(
            AppState::with_referral_code("TON-TEST00"),
            db.clone(),
            feedback.clone(),
            options,
        );
        (engine, db, feedback)
    }

    fn engine(name: &str) -> RewardEngine {
        engine_with(name, EngineOptions::default()).0
    }

    fn seed_balance(engine: &mut RewardEngine, amount: &str) {
        engine.add_balance(ton(amount));
    }

    fn unlock_admin(engine: &mut RewardEngine) {
        for i in 0..5 {
            engine.admin_tap(i * 10);
        }
        engine.verify_passcode(DEFAULT_ADMIN_PASSCODE).unwrap();
    }

    const HOUR: i64 = 3_600_000;

    // ── Mining session ────────────────────────────────────────────────────────

    #[test]
    fn session_credits_rate_at_expiry() {
        let mut e = engine("session_expiry");
        e.start_mining_session(0).unwrap();
        assert_eq!(e.state().stats.session_start_time, Some(0));

        let done = e.tick(HOUR).unwrap();
        assert_eq!(done.reward, ton("0.0002"));
        assert_eq!(e.balance(), ton("0.0002"));
        assert_eq!(e.state().stats.session_start_time, None);
    }

    #[test]
    fn tick_before_expiry_changes_nothing() {
        let mut e = engine("tick_early");
        e.start_mining_session(0).unwrap();
        let before = e.state().clone();
        assert!(e.tick(HOUR - 1).is_none());
        assert_eq!(e.state(), &before);
    }

    #[test]
    fn ticks_past_expiry_credit_once() {
        let mut e = engine("tick_idempotent");
        e.start_mining_session(0).unwrap();
        assert!(e.tick(HOUR + 5).is_some());
        for t in [HOUR + 6, HOUR + 1_000, 10 * HOUR] {
            assert!(e.tick(t).is_none());
        }
        assert_eq!(e.balance(), ton("0.0002"));
    }

    #[test]
    fn long_gap_credits_a_single_session() {
        let mut e = engine("tick_gap");
        e.start_mining_session(0).unwrap();
        e.tick(1_000 * HOUR).unwrap();
        assert_eq!(e.balance(), e.state().config.mining_rate);
    }

    #[test]
    fn second_start_while_mining_is_rejected() {
        let mut e = engine("double_start");
        e.start_mining_session(1_000).unwrap();
        let err = e.start_mining_session(2_000).unwrap_err();
        assert!(matches!(err, MinerError::SessionActive { remaining_ms } if remaining_ms == HOUR as u64 - 1_000));
        assert_eq!(e.state().stats.session_start_time, Some(1_000));
    }

    #[test]
    fn start_after_unticked_expiry_settles_first() {
        let mut e = engine("start_settles");
        e.start_mining_session(0).unwrap();
        let settled = e.start_mining_session(HOUR + 10).unwrap().unwrap();
        assert_eq!(settled.reward, ton("0.0002"));
        assert_eq!(e.balance(), ton("0.0002"));
        assert_eq!(e.state().stats.session_start_time, Some(HOUR + 10));
        // the old session is gone; only the new one can complete
        assert!(e.tick(HOUR + 20).is_none());
        e.tick(2 * HOUR + 10).unwrap();
        assert_eq!(e.balance(), ton("0.0004"));
    }

    #[test]
    fn zero_length_session_pays_only_on_tick() {
        let mut e = engine("zero_session");
        let mut config = e.state().config.clone();
        config.session_duration = 0;
        e.update_config(config);

        e.start_mining_session(100).unwrap();
        for t in 101..200 {
            assert!(matches!(
                e.start_mining_session(t),
                Err(MinerError::SessionActive { remaining_ms: 0 })
            ));
        }
        assert_eq!(e.balance(), Amount::ZERO);

        assert!(e.tick(1_100).is_some());
        assert_eq!(e.balance(), ton("0.0002"));
        assert!(e.start_mining_session(1_200).unwrap().is_none());
    }

    #[test]
    fn session_finish_notifies_host() {
        let (mut e, _db, feedback) = engine_with("session_notify", EngineOptions::default());
        e.start_mining_session(0).unwrap();
        e.tick(HOUR);
        assert_eq!(feedback.haptics(), vec![Haptic::Success]);
        assert!(feedback.events().contains(&FeedbackEvent::Toast(
            "Mining Session Finished: +0.0002 TON".into(),
            ToastKind::Success
        )));
    }

    // ── Cooldown claims ───────────────────────────────────────────────────────

    #[test]
    fn daily_gift_once_per_window() {
        let mut e = engine("daily_once");
        assert_eq!(e.claim_daily_gift(1_000).unwrap(), ton("0.0005"));
        assert!(matches!(
            e.claim_daily_gift(1_001).unwrap_err(),
            MinerError::DailyGiftCoolingDown { .. }
        ));
        assert_eq!(e.balance(), ton("0.0005"));
        let cooldown = e.state().config.daily_gift_cooldown as i64;
        e.claim_daily_gift(1_000 + cooldown).unwrap();
        assert_eq!(e.balance(), ton("0.001"));
    }

    #[test]
    fn faucet_once_per_window() {
        let mut e = engine("faucet_once");
        e.claim_faucet(0).unwrap();
        let err = e.claim_faucet(1).unwrap_err();
        assert!(matches!(err, MinerError::FaucetCoolingDown { remaining_ms: 599_999 }));
        assert_eq!(e.state().stats.last_faucet_claimed, Some(0));
        e.claim_faucet(600_000).unwrap();
        assert_eq!(e.balance(), ton("0.0002"));
    }

    #[test]
    fn ad_bonus_is_unlimited() {
        let mut e = engine("ad_bonus");
        for _ in 0..3 {
            e.claim_ad_bonus();
        }
        assert_eq!(e.balance(), ton("0.0003"));
    }

    // ── Tasks ─────────────────────────────────────────────────────────────────

    #[test]
    fn complete_task_is_idempotent() {
        let mut e = engine("task_idempotent");
        let reward = e.state().tasks[0].reward;
        let id = e.state().tasks[0].id.clone();
        assert_eq!(e.complete_task(&id).unwrap(), reward);
        assert!(matches!(e.complete_task(&id).unwrap_err(), MinerError::TaskAlreadyCompleted(_)));
        assert_eq!(e.balance(), reward);
        assert!(e.state().find_task(&id).unwrap().completed);
    }

    #[test]
    fn missing_task_is_rejected() {
        let mut e = engine("task_missing");
        let before = e.state().clone();
        assert!(matches!(e.complete_task("nope").unwrap_err(), MinerError::TaskNotFound(_)));
        assert_eq!(e.state(), &before);
    }

    #[test]
    fn update_tasks_rejects_duplicate_ids() {
        let mut e = engine("tasks_dupe");
        let before = e.state().tasks.clone();
        let t = Task::new("x", "X", ton("0.1"), "#");
        let err = e.update_tasks(vec![t.clone(), t]).unwrap_err();
        assert!(matches!(err, MinerError::DuplicateTaskId(id) if id == "x"));
        assert_eq!(e.state().tasks, before);
    }

    #[test]
    fn update_tasks_replaces_list() {
        let mut e = engine("tasks_replace");
        e.update_tasks(vec![Task::new("9", "Nine", ton("0.9"), "https://example.org")])
            .unwrap();
        assert_eq!(e.state().tasks.len(), 1);
        assert_eq!(e.complete_task("9").unwrap(), ton("0.9"));
    }

    // ── Withdrawals ───────────────────────────────────────────────────────────

    #[test]
    fn withdrawal_below_minimum_is_rejected() {
        let mut e = engine("wd_below_min");
        seed_balance(&mut e, "0.0005");
        let before = e.state().clone();
        let err = e.request_withdrawal("addr", ton("0.0005"), 10).unwrap_err();
        assert!(matches!(err, MinerError::BelowMinimumWithdrawal { .. }));
        assert_eq!(e.state(), &before);
        assert!(e.state().withdrawals.is_empty());
    }

    #[test]
    fn withdrawal_above_balance_is_rejected() {
        let mut e = engine("wd_above_balance");
        seed_balance(&mut e, "0.002");
        let before = e.state().clone();
        let err = e.request_withdrawal("addr", ton("0.0021"), 10).unwrap_err();
        assert!(matches!(err, MinerError::InsufficientBalance { .. }));
        assert_eq!(e.state(), &before);
    }

    #[test]
    fn withdrawal_deducts_and_queues() {
        let mut e = engine("wd_ok");
        seed_balance(&mut e, "0.01");
        let req = e.request_withdrawal("addr", ton("0.005"), 1_700_000_000_000).unwrap();
        assert_eq!(e.balance(), ton("0.005"));
        assert_eq!(e.state().withdrawals, vec![req.clone()]);
        assert_eq!(req.status, WithdrawalStatus::Pending);
        assert_eq!(req.amount, ton("0.005"));
        assert_eq!(req.id, "1700000000000");
        assert_eq!(req.username, DEFAULT_USERNAME);
    }

    #[test]
    fn whole_balance_can_be_withdrawn() {
        let mut e = engine("wd_all");
        seed_balance(&mut e, "0.003");
        e.request_withdrawal("addr", ton("0.003"), 1).unwrap();
        assert_eq!(e.balance(), Amount::ZERO);
    }

    #[test]
    fn withdrawal_needs_wallet_and_amount() {
        let mut e = engine("wd_inputs");
        seed_balance(&mut e, "1");
        assert!(matches!(
            e.request_withdrawal("   ", ton("0.01"), 1).unwrap_err(),
            MinerError::EmptyWalletAddress
        ));
        let mut cfg = e.state().config.clone();
        cfg.min_withdrawal = Amount::ZERO;
        e.update_config(cfg);
        assert!(matches!(
            e.request_withdrawal("addr", Amount::ZERO, 1).unwrap_err(),
            MinerError::ZeroAmount
        ));
    }

    #[test]
    fn same_millisecond_withdrawals_get_distinct_ids() {
        let mut e = engine("wd_ids");
        seed_balance(&mut e, "1");
        let a = e.request_withdrawal("addr", ton("0.01"), 500).unwrap();
        let b = e.request_withdrawal("addr", ton("0.01"), 500).unwrap();
        assert_eq!(a.id, "500");
        assert_eq!(b.id, "501");
    }

    #[test]
    fn rejected_withdrawal_keeps_deduction_by_default() {
        let mut e = engine("wd_reject_keep");
        seed_balance(&mut e, "0.01");
        let req = e.request_withdrawal("addr", ton("0.005"), 1).unwrap();
        e.set_withdrawal_status(&req.id, WithdrawalStatus::Rejected).unwrap();
        assert_eq!(e.balance(), ton("0.005"));
        assert_eq!(e.state().withdrawals[0].status, WithdrawalStatus::Rejected);
    }

    #[test]
    fn rejected_withdrawal_refunds_under_refund_policy() {
        let options = EngineOptions {
            withdrawal_policy: WithdrawalPolicy::RefundOnReject,
            ..EngineOptions::default()
        };
        let (mut e, _db, _fb) = engine_with("wd_reject_refund", options);
        seed_balance(&mut e, "0.01");
        let req = e.request_withdrawal("addr", ton("0.005"), 1).unwrap();
        e.set_withdrawal_status(&req.id, WithdrawalStatus::Rejected).unwrap();
        assert_eq!(e.balance(), ton("0.01"));
    }

    #[test]
    fn settled_withdrawal_cannot_change_again() {
        let mut e = engine("wd_settled");
        seed_balance(&mut e, "0.01");
        let req = e.request_withdrawal("addr", ton("0.005"), 1).unwrap();
        e.set_withdrawal_status(&req.id, WithdrawalStatus::Paid).unwrap();
        assert!(matches!(
            e.set_withdrawal_status(&req.id, WithdrawalStatus::Rejected).unwrap_err(),
            MinerError::WithdrawalNotPending(_)
        ));
        assert!(matches!(
            e.set_withdrawal_status("missing", WithdrawalStatus::Paid).unwrap_err(),
            MinerError::WithdrawalNotFound(_)
        ));
        assert!(matches!(
            e.set_withdrawal_status(&req.id, WithdrawalStatus::Pending).unwrap_err(),
            MinerError::InvalidWithdrawalStatus
        ));
        assert_eq!(e.state().withdrawals[0].status, WithdrawalStatus::Paid);
    }

    // ── Admin edits ───────────────────────────────────────────────────────────

    #[test]
    fn non_numeric_mining_rate_coerces_to_zero() {
        let mut e = engine("cfg_abc");
        let input = ConfigInput {
            mining_rate: "abc".into(),
            ..ConfigInput::from_config(&e.state().config)
        };
        let cfg = e.apply_config_input(&input);
        assert_eq!(cfg.mining_rate, Amount::ZERO);
        assert_eq!(e.state().config.mining_rate, Amount::ZERO);
        assert_eq!(e.state().config.faucet_reward, ton("0.0001"));
    }

    #[test]
    fn update_config_sanitizes_commission() {
        let mut e = engine("cfg_sanitize");
        let mut cfg = e.state().config.clone();
        cfg.referral_commission_percent = -3.0;
        e.update_config(cfg);
        assert_eq!(e.state().config.referral_commission_percent, 0.0);
    }

    #[test]
    fn new_session_length_applies_to_running_session() {
        let mut e = engine("cfg_session_len");
        e.start_mining_session(0).unwrap();
        let mut cfg = e.state().config.clone();
        cfg.session_duration = 60_000;
        e.update_config(cfg);
        assert!(e.tick(60_000).is_some());
    }

    #[test]
    fn save_admin_applies_config_and_tasks_together() {
        let (mut e, _db, feedback) = engine_with("save_admin", EngineOptions::default());
        let input = ConfigInput {
            faucet_reward: "0.5".into(),
            ..ConfigInput::from_config(&e.state().config)
        };
        let tasks = vec![Task::new("a", "A", ton("0.1"), "#")];
        e.save_admin(&input, tasks.clone()).unwrap();
        assert_eq!(e.state().config.faucet_reward, ton("0.5"));
        assert_eq!(e.state().tasks, tasks);
        assert!(feedback
            .events()
            .contains(&FeedbackEvent::Alert("✅ Changes Saved Successfully!".into())));

        let dupes = vec![Task::new("b", "B", ton("0.1"), "#"), Task::new("b", "B2", ton("0.2"), "#")];
        let before = e.state().clone();
        let input = ConfigInput { faucet_reward: "9".into(), ..input };
        assert!(e.save_admin(&input, dupes).is_err());
        assert_eq!(e.state(), &before);
    }

    #[test]
    fn monetization_update_changes_ad_bonus() {
        let mut e = engine("monetization");
        e.update_monetization(Monetization {
            monetag_tag_id: "123".into(),
            sponsored_link: "https://ads.example".into(),
            ad_bonus: ton("0.002"),
        });
        assert_eq!(e.claim_ad_bonus(), ton("0.002"));
    }

    #[test]
    fn reset_restores_defaults_and_locks_admin() {
        let (mut e, db, _fb) = engine_with("reset", EngineOptions::default());
        unlock_admin(&mut e);
        seed_balance(&mut e, "5");
        e.start_mining_session(0).unwrap();
        e.reset_all();
        assert_eq!(e.balance(), Amount::ZERO);
        assert_eq!(e.state().stats.session_start_time, None);
        assert_ne!(e.state().referral_code, "TON-TEST00");
        assert!(!e.is_admin_unlocked());
        let stored = db.load_app_state().unwrap().unwrap();
        assert_eq!(&stored, e.state());
    }

    // ── Admin gate ────────────────────────────────────────────────────────────

    #[test]
    fn passcode_flow_drives_haptics() {
        let (mut e, _db, feedback) = engine_with("admin_haptics", EngineOptions::default());
        for i in 0..5 {
            e.admin_tap(i * 10);
        }
        assert!(e.verify_passcode("0000").is_err());
        e.verify_passcode(DEFAULT_ADMIN_PASSCODE).unwrap();
        assert!(e.is_admin_unlocked());
        assert!(e.require_admin().is_ok());
        assert_eq!(feedback.haptics(), vec![Haptic::Impact, Haptic::Error, Haptic::Success]);
    }

    #[test]
    fn custom_passcode_is_honoured() {
        let options = EngineOptions { admin_passcode: "2468".into(), ..EngineOptions::default() };
        let (mut e, _db, _fb) = engine_with("admin_custom", options);
        for i in 0..5 {
            e.admin_tap(i);
        }
        assert!(e.verify_passcode(DEFAULT_ADMIN_PASSCODE).is_err());
        e.verify_passcode("2468").unwrap();
    }

    #[test]
    fn admin_is_locked_by_default() {
        let e = engine("admin_locked");
        assert!(matches!(e.require_admin().unwrap_err(), MinerError::AdminLocked));
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    #[test]
    fn every_mutation_is_persisted() {
        let (mut e, db, _fb) = engine_with("persist_each", EngineOptions::default());
        e.claim_faucet(0).unwrap();
        assert_eq!(&db.load_app_state().unwrap().unwrap(), e.state());
        e.start_mining_session(5).unwrap();
        assert_eq!(&db.load_app_state().unwrap().unwrap(), e.state());
    }

    #[test]
    fn rejected_operation_writes_nothing() {
        let (mut e, db, _fb) = engine_with("persist_reject", EngineOptions::default());
        e.claim_faucet(0).unwrap();
        let stored = db.get_raw().unwrap();
        assert!(e.claim_faucet(1).is_err());
        assert_eq!(db.get_raw().unwrap(), stored);
    }

    #[test]
    fn load_falls_back_to_defaults_on_garbage() {
        let db = temp_db("load_garbage");
        db.put_raw(b"{\"stats\":").unwrap();
        let e = RewardEngine::load(&db, db.clone(), Arc::new(RecordingFeedback::default()), EngineOptions::default());
        assert_eq!(e.balance(), Amount::ZERO);
        assert!(e.state().referral_code.starts_with("TON-"));
        // defaults are written straight back
        assert_eq!(&db.load_app_state().unwrap().unwrap(), e.state());
    }

    #[test]
    fn load_resumes_persisted_state() {
        let db = temp_db("load_resume");
        {
            let mut e = RewardEngine::load(&db, db.clone(), Arc::new(RecordingFeedback::default()), EngineOptions::default());
            e.claim_daily_gift(100).unwrap();
            e.start_mining_session(200).unwrap();
        }
        let mut e = RewardEngine::load(&db, db.clone(), Arc::new(RecordingFeedback::default()), EngineOptions::default());
        assert_eq!(e.balance(), ton("0.0005"));
        assert_eq!(e.state().stats.session_start_time, Some(200));
        // a session that expired while the process was down pays out once
        e.tick(200 + HOUR).unwrap();
        assert_eq!(e.balance(), ton("0.0007"));
        assert!(db.get_raw().unwrap().is_some());
        assert!(!STORAGE_KEY.is_empty());
    }

    #[test]
    fn saturated_balance_reloads_intact() {
        let db = temp_db("load_saturated");
        {
            let mut e = RewardEngine::load(&db, db.clone(), Arc::new(RecordingFeedback::default()), EngineOptions::default());
            e.add_balance(coerce_amount("1e12"));
            e.add_balance(Amount::MAX);
            e.request_withdrawal("UQ-wallet", ton("1"), 500).unwrap();
        }
        let e = RewardEngine::load(&db, db.clone(), Arc::new(RecordingFeedback::default()), EngineOptions::default());
        assert_eq!(e.balance(), Amount::from_nano(Amount::MAX.as_nano() - ton("1").as_nano()));
        assert_eq!(e.state().withdrawals.len(), 1);
    }

    // ── Balance invariant ─────────────────────────────────────────────────────

    #[test]
    fn balance_is_credits_minus_withdrawals() {
        let mut e = engine("balance_mixed");
        let mut credited = Amount::ZERO;
        let mut now: Timestamp = 0;
        for step in 0..200u64 {
            now += 7_919 * 60;
            match step % 6 {
                0 => {
                    if let Ok(Some(done)) = e.start_mining_session(now) {
                        credited = credited.saturating_add(done.reward);
                    }
                }
                1 => {
                    if let Some(done) = e.tick(now) {
                        credited = credited.saturating_add(done.reward);
                    }
                }
                2 => {
                    if let Ok(r) = e.claim_faucet(now) {
                        credited = credited.saturating_add(r);
                    }
                }
                3 => {
                    let _ = e.request_withdrawal("addr", Amount::from_nano(step * 37_000), now);
                }
                4 => {
                    let big = e.balance().saturating_add(Amount::from_nano(1));
                    assert!(e.request_withdrawal("addr", big, now).is_err());
                    if let Ok(r) = e.claim_daily_gift(now) {
                        credited = credited.saturating_add(r);
                    }
                }
                _ => {
                    let id = e.state().withdrawals.last().map(|w| w.id.clone());
                    if let Some(id) = id {
                        let _ = e.set_withdrawal_status(&id, WithdrawalStatus::Rejected);
                    }
                }
            }
            let withdrawn = e
                .state()
                .withdrawals
                .iter()
                .fold(Amount::ZERO, |acc, w| acc.saturating_add(w.amount));
            assert_eq!(e.balance().saturating_add(withdrawn), credited);
        }
        let ids: Vec<_> = e.state().withdrawals.iter().map(|w| w.id.as_str()).collect();
        assert!(first_duplicate_id(ids).is_none());
    }
}
