//! Lenient parsing of admin form input.
//!
//! Admin fields arrive as free text. A leading numeric prefix is honoured
//! (`"12abc"` reads as 12); anything else, including negative values, reads
//! as zero. Bad input never reaches the engine as an error.

use serde::{Deserialize, Serialize};

use crate::state::AppConfig;
use crate::types::{Amount, DurationMs};

/// The admin-editable subset of `AppConfig`, as typed into the console.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigInput {
    pub mining_rate: String,
    pub faucet_reward: String,
    pub daily_gift_reward: String,
    pub session_duration: String,
    pub faucet_cooldown: String,
}

impl ConfigInput {
    /// Pre-fill the form from the live config.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mining_rate: config.mining_rate.to_string(),
            faucet_reward: config.faucet_reward.to_string(),
            daily_gift_reward: config.daily_gift_reward.to_string(),
            session_duration: config.session_duration.to_string(),
            faucet_cooldown: config.faucet_cooldown.to_string(),
        }
    }

    /// Overlay the coerced fields on `base`; every other field is kept.
    pub fn apply_to(&self, base: &AppConfig) -> AppConfig {
        AppConfig {
            mining_rate: coerce_amount(&self.mining_rate),
            faucet_reward: coerce_amount(&self.faucet_reward),
            daily_gift_reward: coerce_amount(&self.daily_gift_reward),
            session_duration: coerce_duration(&self.session_duration),
            faucet_cooldown: coerce_duration(&self.faucet_cooldown),
            ..base.clone()
        }
    }
}

/// Decimal TON input; unreadable or negative input is zero.
pub fn coerce_amount(input: &str) -> Amount {
    float_prefix(input).map(Amount::from_ton_f64).unwrap_or(Amount::ZERO)
}

/// Whole-millisecond input; fractions are truncated, unreadable or negative
/// input is zero.
pub fn coerce_duration(input: &str) -> DurationMs {
    let t = input.trim_start();
    let digits: &str = {
        let body = t.strip_prefix('+').unwrap_or(t);
        let end = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
        &body[..end]
    };
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(DurationMs::MAX)
}

/// Longest prefix of `input` that reads as a float: sign, digits, optional
/// fraction, optional exponent.
fn float_prefix(input: &str) -> Option<f64> {
    let s = input.trim_start().as_bytes();
    let mut i = 0;
    if i < s.len() && (s[i] == b'+' || s[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;
    if i < s.len() && s[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < s.len() && s[j].is_ascii_digit() {
            j += 1;
        }
        mantissa_digits += j - frac_start;
        if mantissa_digits > 0 {
            i = j;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }
    if i < s.len() && (s[i] == b'e' || s[i] == b'E') {
        let mut j = i + 1;
        if j < s.len() && (s[j] == b'+' || s[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < s.len() && s[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    std::str::from_utf8(&s[..i]).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_mining_rate_becomes_zero() {
        let base = AppConfig::default();
        let input = ConfigInput {
            mining_rate: "abc".into(),
            ..ConfigInput::from_config(&base)
        };
        let cfg = input.apply_to(&base);
        assert_eq!(cfg.mining_rate, Amount::ZERO);
        assert_eq!(cfg.faucet_reward, base.faucet_reward);
        assert_eq!(cfg.session_duration, base.session_duration);
    }

    #[test]
    fn numeric_prefix_is_honoured() {
        assert_eq!(coerce_amount("0.5 TON"), Amount::from_nano(500_000_000));
        assert_eq!(coerce_amount("  1e-3"), Amount::from_nano(1_000_000));
        assert_eq!(coerce_amount(".25x"), Amount::from_nano(250_000_000));
        assert_eq!(coerce_duration("600000ms"), 600_000);
        assert_eq!(coerce_duration("3600000.9"), 3_600_000);
    }

    #[test]
    fn huge_input_saturates_at_max() {
        assert_eq!(coerce_amount("1e12"), Amount::MAX);
        assert_eq!(coerce_amount("1e30"), Amount::MAX);
        assert_eq!(coerce_amount("8388608"), Amount::MAX);
    }

    #[test]
    fn negative_and_empty_input_is_zero() {
        assert_eq!(coerce_amount("-0.1"), Amount::ZERO);
        assert_eq!(coerce_amount(""), Amount::ZERO);
        assert_eq!(coerce_amount("."), Amount::ZERO);
        assert_eq!(coerce_duration("-5"), 0);
        assert_eq!(coerce_duration("soon"), 0);
    }

    #[test]
    fn untouched_fields_survive_apply() {
        let mut base = AppConfig::default();
        base.active_miners_display = 7;
        base.referral_commission_percent = 0.25;
        let cfg = ConfigInput::from_config(&base).apply_to(&base);
        assert_eq!(cfg, base);
    }
}
