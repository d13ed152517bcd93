/// ─── TON Miner Constants ────────────────────────────────────────────────────
///
/// Base unit: nano-TON (1 TON = 1,000,000,000 nano)
/// Time:      Unix milliseconds

// ── Units ────────────────────────────────────────────────────────────────────

/// 1 TON expressed in nano-TON.
pub const NANO_PER_TON: u64 = 1_000_000_000;

/// Fractional digits carried by an `Amount`.
pub const NANO_DECIMALS: usize = 9;

/// Largest amount an `Amount` holds: 2^23 TON. Below this bound adjacent
/// doubles sit less than one nano apart, so a JSON number decodes back to the
/// exact nano it was written from.
pub const MAX_AMOUNT_NANO: u64 = 8_388_608 * NANO_PER_TON;

/// Milliseconds in one hour. The projected in-session reward accrues at
/// `miningRate` per hour, capped at one full `miningRate`.
pub const MS_PER_HOUR: u64 = 3_600_000;

// ── Storage ──────────────────────────────────────────────────────────────────

/// Key of the single persisted `AppState` document.
pub const STORAGE_KEY: &str = "ton_miner_premium_v1";

// ── Default config ───────────────────────────────────────────────────────────

/// One mining session: 1 hour.
pub const DEFAULT_SESSION_DURATION_MS: u64 = 3_600_000;

/// Reward credited when a session completes: 0.0002 TON.
pub const DEFAULT_MINING_RATE_NANO: u64 = 200_000;

/// Share of a referee's earnings paid to the referrer (fraction, not percent).
pub const DEFAULT_REFERRAL_COMMISSION: f64 = 0.10;

/// Bonus paid when a referee joins: 0.1 TON.
pub const DEFAULT_REFERRAL_JOIN_BONUS_NANO: u64 = 100_000_000;

/// Daily gift: 0.0005 TON every 24 hours.
pub const DEFAULT_DAILY_GIFT_NANO: u64 = 500_000;
pub const DEFAULT_DAILY_GIFT_COOLDOWN_MS: u64 = 24 * 60 * 60 * 1000;

/// Faucet: 0.0001 TON every 10 minutes.
pub const DEFAULT_FAUCET_NANO: u64 = 100_000;
pub const DEFAULT_FAUCET_COOLDOWN_MS: u64 = 10 * 60 * 1000;

/// Cosmetic "miners online" counter.
pub const DEFAULT_ACTIVE_MINERS_DISPLAY: u64 = 25_430;

/// Smallest withdrawal accepted: 0.001 TON.
pub const DEFAULT_MIN_WITHDRAWAL_NANO: u64 = 1_000_000;

// ── Default monetization ─────────────────────────────────────────────────────

pub const DEFAULT_MONETAG_TAG_ID: &str = "0";
pub const DEFAULT_SPONSORED_LINK: &str = "#";

/// Ad-watch bonus: 0.0001 TON.
pub const DEFAULT_AD_BONUS_NANO: u64 = 100_000;

// ── Referral codes ───────────────────────────────────────────────────────────

pub const REFERRAL_CODE_PREFIX: &str = "TON-";
pub const REFERRAL_CODE_LEN: usize = 6;

// ── Tasks & withdrawals ──────────────────────────────────────────────────────

pub const DEFAULT_TASK_ICON: &str = "zap";

/// Display name recorded on withdrawal requests.
pub const DEFAULT_USERNAME: &str = "User";

// ── Admin gate ───────────────────────────────────────────────────────────────

/// Shared admin passcode. Demonstration-grade gating only.
pub const DEFAULT_ADMIN_PASSCODE: &str = "7788";

/// Taps on the logo needed to open the passcode prompt.
pub const ADMIN_TAP_COUNT: usize = 5;

/// Rolling window the taps must fall within.
pub const ADMIN_TAP_WINDOW_MS: u64 = 2_000;

// ── Engine ───────────────────────────────────────────────────────────────────

/// Period of the session-resolving tick.
pub const TICK_INTERVAL_MS: u64 = 1_000;
