//! Typed view of an authorization's parameter object.
//!
//! The payload carries parameters as an opaque JSON object so the signed
//! bytes stay exactly what the wallet saw. Before anything is encoded the
//! object is decoded once, against the payload's network, into an
//! [`ActionRequest`] whose fields are already resolved addresses and
//! smallest-unit integers.

use alloy::primitives::{Address, U256};
use serde_json::{Map, Value};

use crate::adapters::uniswap_v3::{DEFAULT_FEE_TIER, validate_fee_tier};
use crate::error::IntentError;
use crate::registry::{MAX_TOKEN_DECIMALS, NetworkConfig};
use crate::types::{IntentKind, TokenDescriptor};
use crate::validation::{
    DurationUnit, duration_to_seconds, parse_address, parse_decimal, parse_u256, to_base_units,
    value_as_text,
};

/// Liquidity shares are 18-decimal fixed point.
pub const SHARE_DECIMALS: u8 = 18;

/// Decimals of a pool side whose token is not named.
pub const DEFAULT_POOL_TOKEN_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    CreateStream {
        recipient: Address,
        token: TokenDescriptor,
        deposit: U256,
        rate_per_second: U256,
        duration_secs: u64,
    },
    ClaimStream {
        stream_id: U256,
    },
    CancelStream {
        stream_id: U256,
    },
    SwapTokens {
        token_in: TokenDescriptor,
        token_out: TokenDescriptor,
        amount_in: U256,
        min_amount_out: U256,
        fee_tier: u32,
    },
    AddLiquidity {
        pool_id: U256,
        amount0: U256,
        amount1: U256,
    },
    RemoveLiquidity {
        pool_id: U256,
        shares: U256,
    },
}

impl ActionRequest {
    pub fn kind(&self) -> IntentKind {
        match self {
            ActionRequest::CreateStream { .. } => IntentKind::CreateStream,
            ActionRequest::ClaimStream { .. } => IntentKind::ClaimStream,
            ActionRequest::CancelStream { .. } => IntentKind::CancelStream,
            ActionRequest::SwapTokens { .. } => IntentKind::SwapTokens,
            ActionRequest::AddLiquidity { .. } => IntentKind::AddLiquidity,
            ActionRequest::RemoveLiquidity { .. } => IntentKind::RemoveLiquidity,
        }
    }

    /// Decode `params` for `kind`, resolving tokens on `network`.
    pub fn decode(
        kind: IntentKind,
        params: &Map<String, Value>,
        network: &NetworkConfig,
    ) -> Result<Self, IntentError> {
        match kind {
            IntentKind::CreateStream => decode_create_stream(params, network),
            IntentKind::ClaimStream => Ok(ActionRequest::ClaimStream {
                stream_id: id_param(params, "streamId")?,
            }),
            IntentKind::CancelStream => Ok(ActionRequest::CancelStream {
                stream_id: id_param(params, "streamId")?,
            }),
            IntentKind::SwapTokens => decode_swap(params, network),
            IntentKind::AddLiquidity => decode_add_liquidity(params, network),
            IntentKind::RemoveLiquidity => Ok(ActionRequest::RemoveLiquidity {
                pool_id: id_param(params, "poolId")?,
                shares: amount_param(params, "shares", "sharesRaw", Some(SHARE_DECIMALS))?,
            }),
            IntentKind::PauseStream => Err(IntentError::UnsupportedIntent {
                kind,
                reason: "the stream contract has no pause entry point; cancel the stream instead"
                    .into(),
            }),
            IntentKind::ListStreams | IntentKind::ListPools | IntentKind::CheckBalance => {
                Err(IntentError::UnsupportedIntent {
                    kind,
                    reason: "read-only request, nothing to execute on-chain".into(),
                })
            }
            IntentKind::Unknown => Err(IntentError::UnsupportedIntent {
                kind,
                reason: "intent was not recognized".into(),
            }),
        }
    }
}

fn decode_create_stream(
    params: &Map<String, Value>,
    network: &NetworkConfig,
) -> Result<ActionRequest, IntentError> {
    let recipient = address_param(params, "recipient")?;
    let token = token_param(params, "token", network)?;
    let duration_secs = duration_param(params)?;
    let deposit = amount_param(params, "amount", "amountRaw", token.decimals)?;

    let rate_per_second = if let Some(raw) = optional(params, "ratePerSecondRaw") {
        parse_u256("ratePerSecondRaw", raw)?
    } else if let Some(rate) = optional(params, "ratePerSecond") {
        to_base_units(
            "ratePerSecond",
            parse_decimal("ratePerSecond", rate)?,
            known_decimals("ratePerSecond", "ratePerSecondRaw", &token)?,
        )?
    } else {
        deposit / U256::from(duration_secs)
    };
    if rate_per_second.is_zero() {
        return Err(IntentError::invalid_parameter(
            "ratePerSecond",
            "rate per second must be greater than zero",
        ));
    }
    let streamed = rate_per_second.checked_mul(U256::from(duration_secs));
    if streamed.is_none_or(|total| total > deposit) {
        return Err(IntentError::invalid_parameter(
            "ratePerSecond",
            format!("streaming for {duration_secs}s at this rate exceeds the deposit of {deposit}"),
        ));
    }

    Ok(ActionRequest::CreateStream {
        recipient,
        token,
        deposit,
        rate_per_second,
        duration_secs,
    })
}

fn decode_swap(
    params: &Map<String, Value>,
    network: &NetworkConfig,
) -> Result<ActionRequest, IntentError> {
    let token_in = token_param(params, "tokenIn", network)?;
    let token_out = token_param(params, "tokenOut", network)?;
    if token_in.address == token_out.address {
        return Err(IntentError::invalid_parameter(
            "tokenOut",
            "must differ from tokenIn",
        ));
    }
    let amount_in = amount_param(params, "amount", "amountRaw", token_in.decimals)?;

    let fee_tier = match optional(params, "feeTier") {
        Some(value) => {
            let tier = value_as_text(value)
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or_else(|| {
                    IntentError::invalid_parameter("feeTier", "expected an integer fee tier")
                })?;
            validate_fee_tier(tier)?
        }
        None => DEFAULT_FEE_TIER,
    };

    let min_amount_out = if let Some(raw) = optional(params, "minAmountOutRaw") {
        parse_u256("minAmountOutRaw", raw)?
    } else if let Some(min) = optional(params, "minAmountOut") {
        to_base_units(
            "minAmountOut",
            parse_decimal("minAmountOut", min)?,
            known_decimals("minAmountOut", "minAmountOutRaw", &token_out)?,
        )?
    } else {
        U256::ZERO
    };

    Ok(ActionRequest::SwapTokens {
        token_in,
        token_out,
        amount_in,
        min_amount_out,
        fee_tier,
    })
}

fn decode_add_liquidity(
    params: &Map<String, Value>,
    network: &NetworkConfig,
) -> Result<ActionRequest, IntentError> {
    let pool_id = id_param(params, "poolId")?;
    let decimals0 = optional_token_decimals(params, "token0", network)?;
    let decimals1 = optional_token_decimals(params, "token1", network)?;
    Ok(ActionRequest::AddLiquidity {
        pool_id,
        amount0: amount_param(params, "amount0", "amount0Raw", decimals0)?,
        amount1: amount_param(params, "amount1", "amount1Raw", decimals1)?,
    })
}

// ── Parameter helpers ───────────────────────────────────────────────────

/// A present, non-null, non-blank parameter.
fn optional<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

fn required<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a Value, IntentError> {
    optional(params, key).ok_or_else(|| IntentError::invalid_parameter(key, "required"))
}

fn text_param(params: &Map<String, Value>, key: &str) -> Result<String, IntentError> {
    value_as_text(required(params, key)?)
        .ok_or_else(|| IntentError::invalid_parameter(key, "expected a string"))
}

fn address_param(params: &Map<String, Value>, key: &str) -> Result<Address, IntentError> {
    parse_address(key, &text_param(params, key)?)
}

fn token_param(
    params: &Map<String, Value>,
    key: &str,
    network: &NetworkConfig,
) -> Result<TokenDescriptor, IntentError> {
    let raw = text_param(params, key)?;
    let mut token = network.resolve_token(&raw).map_err(|e| match e {
        IntentError::InvalidAddress { value, .. } => IntentError::invalid_address(key, value),
        other => other,
    })?;

    // `<key>Decimals` supplies the decimals of an unlisted address.
    let decimals_key = format!("{key}Decimals");
    if let Some(value) = optional(params, &decimals_key) {
        let declared = value_as_text(value)
            .and_then(|s| s.parse::<u8>().ok())
            .filter(|d| *d <= MAX_TOKEN_DECIMALS)
            .ok_or_else(|| {
                IntentError::invalid_parameter(
                    &decimals_key,
                    format!("expected an integer between 0 and {MAX_TOKEN_DECIMALS}"),
                )
            })?;
        match token.decimals {
            Some(listed) if listed != declared => {
                return Err(IntentError::invalid_parameter(
                    &decimals_key,
                    format!("{} has {listed} decimals", token.symbol_or_address),
                ));
            }
            _ => token.decimals = Some(declared),
        }
    }
    Ok(token)
}

fn optional_token_decimals(
    params: &Map<String, Value>,
    key: &str,
    network: &NetworkConfig,
) -> Result<Option<u8>, IntentError> {
    if optional(params, key).is_none() {
        return Ok(Some(DEFAULT_POOL_TOKEN_DECIMALS));
    }
    Ok(token_param(params, key, network)?.decimals)
}

fn known_decimals(key: &str, raw_key: &str, token: &TokenDescriptor) -> Result<u8, IntentError> {
    token.decimals.ok_or_else(|| unknown_decimals(key, raw_key))
}

fn unknown_decimals(key: &str, raw_key: &str) -> IntentError {
    IntentError::invalid_parameter(
        key,
        format!("token decimals are unknown; give {raw_key} in smallest units or declare the decimals"),
    )
}

/// Smallest-unit amount: `raw_key` (already an integer) wins over `key`
/// (human decimal scaled by `decimals`). Zero is rejected, as is a human
/// amount for a token of unknown decimals.
fn amount_param(
    params: &Map<String, Value>,
    key: &str,
    raw_key: &str,
    decimals: Option<u8>,
) -> Result<U256, IntentError> {
    let (field, amount) = match optional(params, raw_key) {
        Some(raw) => (raw_key, parse_u256(raw_key, raw)?),
        None => {
            let value = required(params, key)?;
            let decimals = decimals.ok_or_else(|| unknown_decimals(key, raw_key))?;
            (key, to_base_units(key, parse_decimal(key, value)?, decimals)?)
        }
    };
    if amount.is_zero() {
        return Err(IntentError::invalid_amount(field, "must be greater than zero"));
    }
    Ok(amount)
}

fn id_param(params: &Map<String, Value>, key: &str) -> Result<U256, IntentError> {
    parse_u256(key, required(params, key)?).map_err(|_| {
        IntentError::invalid_parameter(key, "expected a non-negative integer or 0x-prefixed hex id")
    })
}

fn duration_param(params: &Map<String, Value>) -> Result<u64, IntentError> {
    let value = optional(params, "duration")
        .ok_or_else(|| IntentError::InvalidDuration("duration is required".into()))?;
    let amount = parse_decimal("duration", value)
        .map_err(|_| IntentError::InvalidDuration(format!("'{value}' is not a number")))?;
    let unit = match optional(params, "durationUnit") {
        Some(unit) => {
            let word = value_as_text(unit).unwrap_or_default();
            DurationUnit::from_word(&word)
                .ok_or_else(|| IntentError::InvalidDuration(format!("unknown unit '{word}'")))?
        }
        None => DurationUnit::Seconds,
    };
    duration_to_seconds(amount, unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use serde_json::json;

    const RECIPIENT: &str = "0x1111111111111111111111111111111111111111";

    fn decode(kind: IntentKind, params: Value) -> Result<ActionRequest, IntentError> {
        let registry = Registry::local_dev();
        ActionRequest::decode(kind, params.as_object().unwrap(), registry.active())
    }

    #[test]
    fn test_create_stream_defaults_rate_to_deposit_over_duration() {
        let action = decode(
            IntentKind::CreateStream,
            json!({"recipient": RECIPIENT, "token": "usdc", "amount": "1000", "duration": "30", "durationUnit": "days"}),
        )
        .unwrap();
        let ActionRequest::CreateStream {
            deposit,
            rate_per_second,
            duration_secs,
            token,
            ..
        } = action
        else {
            panic!("expected CreateStream");
        };
        assert_eq!(token.symbol_or_address, "USDC");
        assert_eq!(deposit, U256::from(1_000_000_000u64));
        assert_eq!(duration_secs, 2_592_000);
        assert_eq!(rate_per_second, U256::from(1_000_000_000u64 / 2_592_000));
    }

    #[test]
    fn test_raw_amount_takes_precedence() {
        let action = decode(
            IntentKind::CreateStream,
            json!({"recipient": RECIPIENT, "token": "USDC", "amount": "1000", "amountRaw": "123456789", "duration": 3600}),
        )
        .unwrap();
        match action {
            ActionRequest::CreateStream { deposit, duration_secs, .. } => {
                assert_eq!(deposit, U256::from(123_456_789u64));
                assert_eq!(duration_secs, 3600);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_explicit_rate_in_token_units() {
        let action = decode(
            IntentKind::CreateStream,
            json!({"recipient": RECIPIENT, "token": "USDC", "amount": "1000", "ratePerSecond": "0.01", "duration": "1", "durationUnit": "days"}),
        )
        .unwrap();
        match action {
            ActionRequest::CreateStream { rate_per_second, .. } => {
                assert_eq!(rate_per_second, U256::from(10_000u64));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rate_rounding_to_zero_rejected() {
        let err = decode(
            IntentKind::CreateStream,
            json!({"recipient": RECIPIENT, "token": "USDC", "amountRaw": "5", "duration": "1", "durationUnit": "days"}),
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETERS");
        assert_eq!(err.field_errors()[0].field, "ratePerSecond");
    }

    #[test]
    fn test_create_stream_field_errors() {
        let base = json!({"recipient": RECIPIENT, "token": "USDC", "amount": "10", "duration": "1", "durationUnit": "days"});

        let mut bad_recipient = base.clone();
        bad_recipient["recipient"] = json!("alice");
        assert_eq!(
            decode(IntentKind::CreateStream, bad_recipient).unwrap_err().code(),
            "INVALID_ADDRESS"
        );

        let mut zero = base.clone();
        zero["amount"] = json!("0");
        assert_eq!(
            decode(IntentKind::CreateStream, zero).unwrap_err().code(),
            "INVALID_AMOUNT"
        );

        let mut no_duration = base.clone();
        no_duration.as_object_mut().unwrap().remove("duration");
        assert_eq!(
            decode(IntentKind::CreateStream, no_duration).unwrap_err().code(),
            "INVALID_DURATION"
        );

        let mut bad_unit = base.clone();
        bad_unit["durationUnit"] = json!("fortnights");
        assert_eq!(
            decode(IntentKind::CreateStream, bad_unit).unwrap_err().code(),
            "INVALID_DURATION"
        );

        let mut doge = base;
        doge["token"] = json!("DOGE");
        assert_eq!(
            decode(IntentKind::CreateStream, doge).unwrap_err().code(),
            "UNRESOLVED_TOKEN"
        );
    }

    #[test]
    fn test_stream_ids_decimal_and_hex() {
        assert_eq!(
            decode(IntentKind::ClaimStream, json!({"streamId": "0x10"})).unwrap(),
            ActionRequest::ClaimStream { stream_id: U256::from(16u64) }
        );
        assert_eq!(
            decode(IntentKind::CancelStream, json!({"streamId": 0})).unwrap(),
            ActionRequest::CancelStream { stream_id: U256::ZERO }
        );
        let err = decode(IntentKind::ClaimStream, json!({"streamId": "-3"})).unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETERS");
    }

    #[test]
    fn test_swap_defaults() {
        let action = decode(
            IntentKind::SwapTokens,
            json!({"tokenIn": "WETH", "tokenOut": "USDC", "amount": "1.5"}),
        )
        .unwrap();
        match action {
            ActionRequest::SwapTokens { amount_in, min_amount_out, fee_tier, .. } => {
                assert_eq!(amount_in, U256::from(1_500_000_000_000_000_000u128));
                assert_eq!(min_amount_out, U256::ZERO);
                assert_eq!(fee_tier, 3000);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_swap_min_out_uses_token_out_decimals() {
        let action = decode(
            IntentKind::SwapTokens,
            json!({"tokenIn": "WETH", "tokenOut": "USDC", "amount": "1", "minAmountOut": "2500.5", "feeTier": 500}),
        )
        .unwrap();
        match action {
            ActionRequest::SwapTokens { min_amount_out, fee_tier, .. } => {
                assert_eq!(min_amount_out, U256::from(2_500_500_000u64));
                assert_eq!(fee_tier, 500);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_swap_rejects_bad_fee_and_same_token() {
        let err = decode(
            IntentKind::SwapTokens,
            json!({"tokenIn": "WETH", "tokenOut": "USDC", "amount": "1", "feeTier": 250}),
        )
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "feeTier");

        let err = decode(
            IntentKind::SwapTokens,
            json!({"tokenIn": "USDC", "tokenOut": "usdc", "amount": "1"}),
        )
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "tokenOut");
    }

    #[test]
    fn test_liquidity_decimals() {
        let action = decode(
            IntentKind::AddLiquidity,
            json!({"poolId": "3", "amount0": "10", "amount1": "2", "token0": "USDC"}),
        )
        .unwrap();
        assert_eq!(
            action,
            ActionRequest::AddLiquidity {
                pool_id: U256::from(3u64),
                amount0: U256::from(10_000_000u64),
                amount1: U256::from(2_000_000_000_000_000_000u128),
            }
        );

        let action = decode(
            IntentKind::RemoveLiquidity,
            json!({"poolId": "3", "shares": "0.5"}),
        )
        .unwrap();
        assert_eq!(
            action,
            ActionRequest::RemoveLiquidity {
                pool_id: U256::from(3u64),
                shares: U256::from(500_000_000_000_000_000u128),
            }
        );
    }

    #[test]
    fn test_rate_beyond_deposit_rejected() {
        let err = decode(
            IntentKind::CreateStream,
            json!({"recipient": RECIPIENT, "token": "USDC", "amount": "1000", "ratePerSecond": "2", "duration": "30", "durationUnit": "days"}),
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETERS");
        assert_eq!(err.field_errors()[0].field, "ratePerSecond");

        let err = decode(
            IntentKind::CreateStream,
            json!({"recipient": RECIPIENT, "token": "USDC", "amountRaw": "1000", "ratePerSecondRaw": "1001", "duration": 1}),
        )
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "ratePerSecond");

        // Exactly the deposit is fine
        assert!(
            decode(
                IntentKind::CreateStream,
                json!({"recipient": RECIPIENT, "token": "USDC", "amountRaw": "1000", "ratePerSecondRaw": "10", "duration": 100}),
            )
            .is_ok()
        );
    }

    #[test]
    fn test_unlisted_token_needs_raw_amount_or_decimals() {
        const UNLISTED: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        let base = json!({"recipient": RECIPIENT, "token": UNLISTED, "amount": "1000", "duration": "30", "durationUnit": "days"});

        let err = decode(IntentKind::CreateStream, base.clone()).unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETERS");
        assert_eq!(err.field_errors()[0].field, "amount");

        let mut raw = base.clone();
        raw["amountRaw"] = json!("1000000000");
        match decode(IntentKind::CreateStream, raw).unwrap() {
            ActionRequest::CreateStream { deposit, token, .. } => {
                assert_eq!(deposit, U256::from(1_000_000_000u64));
                assert_eq!(token.decimals, None);
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut declared = base.clone();
        declared["tokenDecimals"] = json!(6);
        match decode(IntentKind::CreateStream, declared).unwrap() {
            ActionRequest::CreateStream { deposit, .. } => {
                assert_eq!(deposit, U256::from(1_000_000_000u64));
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut out_of_range = base;
        out_of_range["tokenDecimals"] = json!(77);
        let err = decode(IntentKind::CreateStream, out_of_range).unwrap_err();
        assert_eq!(err.field_errors()[0].field, "tokenDecimals");
    }

    #[test]
    fn test_declared_decimals_must_match_registry() {
        let err = decode(
            IntentKind::SwapTokens,
            json!({"tokenIn": "USDC", "tokenInDecimals": 18, "tokenOut": "WETH", "amount": "1"}),
        )
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "tokenInDecimals");

        assert!(
            decode(
                IntentKind::SwapTokens,
                json!({"tokenIn": "USDC", "tokenInDecimals": "6", "tokenOut": "WETH", "amount": "1"}),
            )
            .is_ok()
        );
    }

    #[test]
    fn test_unlisted_swap_output_needs_raw_min_out() {
        const UNLISTED: &str = "0x1111111111111111111111111111111111111112";
        let err = decode(
            IntentKind::SwapTokens,
            json!({"tokenIn": "USDC", "tokenOut": UNLISTED, "amount": "1", "minAmountOut": "5"}),
        )
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "minAmountOut");

        match decode(
            IntentKind::SwapTokens,
            json!({"tokenIn": "USDC", "tokenOut": UNLISTED, "amount": "1", "minAmountOutRaw": "5"}),
        )
        .unwrap()
        {
            ActionRequest::SwapTokens { min_amount_out, .. } => {
                assert_eq!(min_amount_out, U256::from(5u64));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_kinds() {
        for kind in [
            IntentKind::PauseStream,
            IntentKind::ListStreams,
            IntentKind::ListPools,
            IntentKind::CheckBalance,
            IntentKind::Unknown,
        ] {
            let err = decode(kind, json!({"streamId": "1"})).unwrap_err();
            assert_eq!(err.code(), "UNSUPPORTED_INTENT", "{kind}");
        }
    }
}
