use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_AMOUNT_NANO, NANO_DECIMALS, NANO_PER_TON};
use crate::error::MinerError;

/// Unix timestamp (milliseconds, UTC).
pub type Timestamp = i64;

/// Length of a session or cooldown in milliseconds.
pub type DurationMs = u64;

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Human-readable request time stored on withdrawal records,
/// e.g. `3/14/2026, 9:05:12 PM`.
pub fn format_request_time(ts: Timestamp) -> String {
    match chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ts) {
        Some(dt) => dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        None => ts.to_string(),
    }
}

/// Milliseconds elapsed from `since` to `now`, clamped at zero when the clock
/// has moved backwards.
pub fn elapsed_ms(since: Timestamp, now: Timestamp) -> DurationMs {
    now.saturating_sub(since).max(0) as DurationMs
}

// ── Amount ───────────────────────────────────────────────────────────────────

/// A non-negative TON amount held in nano-TON (1 TON = 1_000_000_000 nano).
///
/// Encoded in JSON as a decimal TON number (`0.0002`), which is the shape the
/// persisted document has always used. Decoding rounds to the nearest nano.
/// Every value is capped at `Amount::MAX`, the range in which an f64 still
/// resolves single nanos, so an encode/decode cycle is exact.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const MAX: Amount = Amount(MAX_AMOUNT_NANO);

    /// Values above `Amount::MAX` saturate.
    pub const fn from_nano(nano: u64) -> Self {
        if nano > MAX_AMOUNT_NANO {
            Self::MAX
        } else {
            Self(nano)
        }
    }

    pub const fn as_nano(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert a floating TON value. Negative, NaN and infinite inputs map to
    /// zero; values above `Amount::MAX` saturate.
    pub fn from_ton_f64(ton: f64) -> Self {
        if !ton.is_finite() || ton <= 0.0 {
            return Self::ZERO;
        }
        let nano = (ton * NANO_PER_TON as f64).round();
        if nano >= MAX_AMOUNT_NANO as f64 {
            Self::MAX
        } else {
            Self(nano as u64)
        }
    }

    pub fn to_ton_f64(&self) -> f64 {
        self.0 as f64 / NANO_PER_TON as f64
    }

    pub fn saturating_add(self, rhs: Amount) -> Amount {
        Amount::from_nano(self.0.saturating_add(rhs.0))
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// `self * num / den`, rounded down. Returns zero when `den` is zero.
    pub fn mul_div(self, num: u64, den: u64) -> Amount {
        if den == 0 {
            return Amount::ZERO;
        }
        let v = (self.0 as u128 * num as u128) / den as u128;
        Amount::from_nano(v.min(MAX_AMOUNT_NANO as u128) as u64)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANO_PER_TON;
        let frac = self.0 % NANO_PER_TON;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{:0width$}", frac, width = NANO_DECIMALS);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({} TON)", self)
    }
}

/// Strict decimal parse: `"0.005"`, `"12"`, `".5"`. At most nine fractional
/// digits; signs, exponents, trailing garbage and values above `Amount::MAX`
/// are rejected.
impl FromStr for Amount {
    type Err = MinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || MinerError::InvalidAmount(s.to_string());
        let t = s.trim();
        let (int_part, frac_part) = match t.split_once('.') {
            Some((i, f)) => (i, f),
            None => (t, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(bad());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
            || frac_part.len() > NANO_DECIMALS
        {
            return Err(bad());
        }
        let whole: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| bad())?
        };
        let frac: u64 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_part, width = NANO_DECIMALS);
            padded.parse().map_err(|_| bad())?
        };
        whole
            .checked_mul(NANO_PER_TON)
            .and_then(|n| n.checked_add(frac))
            .filter(|n| *n <= MAX_AMOUNT_NANO)
            .map(Amount)
            .ok_or_else(bad)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_ton_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ton = f64::deserialize(deserializer)?;
        if !ton.is_finite() || ton < 0.0 {
            return Err(de::Error::custom(format!("amount must be a non-negative number, got {ton}")));
        }
        // documents written before the cap load saturated rather than failing
        Ok(Amount::from_ton_f64(ton))
    }
}
