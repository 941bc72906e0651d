//! Shared format checks and fixed-point amount conversion.
//!
//! All monetary values go through `rust_decimal::Decimal` and end up as
//! `U256` smallest units. Nothing here touches floating point.

use std::str::FromStr;
use std::sync::LazyLock;

use alloy::primitives::{Address, U256};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IntentError;

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid address regex"));

static SIGNATURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{130}$").expect("valid signature regex"));

/// Length of an `r || s || v` signature in bytes.
pub const SIGNATURE_LEN: usize = 65;

pub fn is_valid_address(s: &str) -> bool {
    ADDRESS_RE.is_match(s)
}

pub fn is_valid_signature_hex(s: &str) -> bool {
    SIGNATURE_RE.is_match(s)
}

/// Parse an account address. Mixed case is accepted without checksum
/// enforcement; callers normalize with [`checksum`].
pub fn parse_address(field: &str, s: &str) -> Result<Address, IntentError> {
    let trimmed = s.trim();
    if !is_valid_address(trimmed) {
        return Err(IntentError::invalid_address(field, trimmed));
    }
    trimmed
        .parse::<Address>()
        .map_err(|_| IntentError::invalid_address(field, trimmed))
}

/// EIP-55 checksummed representation.
pub fn checksum(address: &Address) -> String {
    address.to_checksum(None)
}

pub fn addresses_equal(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Read a scalar JSON value as text. Numbers keep serde_json's formatting.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a human-denominated decimal amount (e.g. `"1000"`, `"0.25"`).
pub fn parse_decimal(field: &str, value: &Value) -> Result<Decimal, IntentError> {
    let text = value_as_text(value)
        .ok_or_else(|| IntentError::invalid_amount(field, "expected a number or numeric string"))?;
    let cleaned = text.replace([',', '_'], "");
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|e| IntentError::invalid_amount(field, format!("'{text}' is not a decimal: {e}")))
}

/// Parse an integer already expressed in smallest units (decimal or `0x` hex).
pub fn parse_u256(field: &str, value: &Value) -> Result<U256, IntentError> {
    let text = value_as_text(value)
        .ok_or_else(|| IntentError::invalid_amount(field, "expected an integer or integer string"))?;
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() => U256::from_str_radix(hex, 16),
        Some(_) => return Err(IntentError::invalid_amount(field, "empty hex literal")),
        None => U256::from_str_radix(&text, 10),
    };
    parsed.map_err(|e| IntentError::invalid_amount(field, format!("'{text}' is not an integer: {e}")))
}

/// Scale a decimal token amount to the token's smallest unit.
///
/// Rejects negative values and more fractional digits than `decimals`
/// rather than rounding.
pub fn to_base_units(field: &str, amount: Decimal, decimals: u8) -> Result<U256, IntentError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(IntentError::invalid_amount(field, "must not be negative"));
    }
    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > u32::from(decimals) {
        return Err(IntentError::invalid_amount(
            field,
            format!("{amount} has {scale} fractional digits, token supports {decimals}"),
        ));
    }
    let mantissa = u128::try_from(normalized.mantissa())
        .map_err(|_| IntentError::invalid_amount(field, "must not be negative"))?;
    let factor = U256::from(10u64).pow(U256::from(u32::from(decimals) - scale));
    U256::from(mantissa)
        .checked_mul(factor)
        .ok_or_else(|| IntentError::invalid_amount(field, "overflows uint256"))
}

/// Canonical duration units. Months are 30 days, years 365 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Seconds => "seconds",
            DurationUnit::Minutes => "minutes",
            DurationUnit::Hours => "hours",
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
            DurationUnit::Months => "months",
            DurationUnit::Years => "years",
        }
    }

    pub fn seconds(&self) -> u64 {
        match self {
            DurationUnit::Seconds => 1,
            DurationUnit::Minutes => 60,
            DurationUnit::Hours => 3_600,
            DurationUnit::Days => 86_400,
            DurationUnit::Weeks => 604_800,
            DurationUnit::Months => 2_592_000,
            DurationUnit::Years => 31_536_000,
        }
    }

    /// Map an English or Spanish unit word, singular or plural, to a unit.
    pub fn from_word(word: &str) -> Option<DurationUnit> {
        let w = word.trim().to_lowercase();
        let unit = match w.as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" | "segundo" | "segundos" => {
                DurationUnit::Seconds
            }
            "m" | "min" | "mins" | "minute" | "minutes" | "minuto" | "minutos" => {
                DurationUnit::Minutes
            }
            "h" | "hr" | "hrs" | "hour" | "hours" | "hora" | "horas" => DurationUnit::Hours,
            "d" | "day" | "days" | "dia" | "dias" | "día" | "días" => DurationUnit::Days,
            "w" | "wk" | "wks" | "week" | "weeks" | "semana" | "semanas" => DurationUnit::Weeks,
            "mo" | "month" | "months" | "mes" | "meses" => DurationUnit::Months,
            "y" | "yr" | "yrs" | "year" | "years" | "año" | "años" | "ano" | "anos" => {
                DurationUnit::Years
            }
            _ => return None,
        };
        Some(unit)
    }
}

/// Convert `value` expressed in `unit` to whole seconds. Must be positive.
pub fn duration_to_seconds(value: Decimal, unit: DurationUnit) -> Result<u64, IntentError> {
    if value.is_sign_negative() || value.is_zero() {
        return Err(IntentError::InvalidDuration(format!(
            "duration must be greater than zero, got {value}"
        )));
    }
    let seconds = value
        .checked_mul(Decimal::from(unit.seconds()))
        .ok_or_else(|| IntentError::InvalidDuration(format!("{value} {} overflows", unit.as_str())))?
        .trunc();
    let seconds = u64::try_from(seconds)
        .map_err(|_| IntentError::InvalidDuration(format!("{value} {} overflows", unit.as_str())))?;
    if seconds == 0 {
        return Err(IntentError::InvalidDuration(
            "duration rounds down to zero seconds".into(),
        ));
    }
    Ok(seconds)
}
