use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A classified user goal extracted from free text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    CreateStream,
    ClaimStream,
    CancelStream,
    PauseStream,
    ListStreams,
    SwapTokens,
    AddLiquidity,
    RemoveLiquidity,
    ListPools,
    CheckBalance,
    Unknown,
}

impl IntentKind {
    pub const ALL: [IntentKind; 11] = [
        IntentKind::CreateStream,
        IntentKind::ClaimStream,
        IntentKind::CancelStream,
        IntentKind::PauseStream,
        IntentKind::ListStreams,
        IntentKind::SwapTokens,
        IntentKind::AddLiquidity,
        IntentKind::RemoveLiquidity,
        IntentKind::ListPools,
        IntentKind::CheckBalance,
        IntentKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::CreateStream => "CREATE_STREAM",
            IntentKind::ClaimStream => "CLAIM_STREAM",
            IntentKind::CancelStream => "CANCEL_STREAM",
            IntentKind::PauseStream => "PAUSE_STREAM",
            IntentKind::ListStreams => "LIST_STREAMS",
            IntentKind::SwapTokens => "SWAP_TOKENS",
            IntentKind::AddLiquidity => "ADD_LIQUIDITY",
            IntentKind::RemoveLiquidity => "REMOVE_LIQUIDITY",
            IntentKind::ListPools => "LIST_POOLS",
            IntentKind::CheckBalance => "CHECK_BALANCE",
            IntentKind::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Option<IntentKind> {
        IntentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Read-only views carry no on-chain effect and never get signed.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            IntentKind::ListStreams | IntentKind::ListPools | IntentKind::CheckBalance
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the intent parser. Created per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIntent {
    pub intent_kind: IntentKind,
    pub confidence: f64,
    pub parameters: BTreeMap<String, String>,
    pub original_text: String,
    pub reasoning: String,
}

impl ParsedIntent {
    pub fn unknown(original_text: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            intent_kind: IntentKind::Unknown,
            confidence: 0.0,
            parameters: BTreeMap::new(),
            original_text: original_text.into(),
            reasoning: reasoning.into(),
        }
    }

    /// Parameters as the opaque JSON object stored in an authorization payload.
    pub fn parameters_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.parameters
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect()
    }
}

pub const PAYLOAD_VERSION: &str = "1";

/// Versioned, time-bound, chain-bound authorization the wallet signs over.
///
/// Timestamps are Unix milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationPayload {
    pub version: String,
    pub request_id: String,
    pub intent_kind: IntentKind,
    pub user_address: String,
    pub network: String,
    pub chain_id: u64,
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// The account an upstream session layer has authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub account_address: String,
}

impl SessionIdentity {
    pub fn new(account_address: impl Into<String>) -> Self {
        Self {
            account_address: account_address.into(),
        }
    }
}

/// Result of a successful pass through the verification gate.
#[derive(Debug, Clone)]
pub struct VerifiedAuthorization {
    pub signature: String,
    pub payload: AuthorizationPayload,
    pub recovered_address: Address,
    pub canonical_message: String,
}

/// Unsigned call data for the client wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTx {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// One step of an ordered execution plan. Order encodes on-chain dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    pub label: String,
    pub tx: UnsignedTx,
}

impl TransactionDescriptor {
    pub fn new(label: impl Into<String>, to: Address, data: Bytes) -> Self {
        Self {
            label: label.into(),
            tx: UnsignedTx {
                to,
                data,
                value: U256::ZERO,
            },
        }
    }
}

/// A token resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub symbol_or_address: String,
    pub address: Address,
    /// `None` for an address the registry does not list.
    pub decimals: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_kind_serde_names() {
        let json = serde_json::to_string(&IntentKind::CreateStream).unwrap();
        assert_eq!(json, "\"CREATE_STREAM\"");
        let kind: IntentKind = serde_json::from_str("\"REMOVE_LIQUIDITY\"").unwrap();
        assert_eq!(kind, IntentKind::RemoveLiquidity);
    }

    #[test]
    fn test_intent_kind_parse_matches_as_str() {
        for kind in IntentKind::ALL {
            assert_eq!(IntentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(IntentKind::parse("swap_tokens"), Some(IntentKind::SwapTokens));
        assert_eq!(IntentKind::parse("FLY_TO_MOON"), None);
    }

    #[test]
    fn test_descriptor_value_defaults_to_zero() {
        let d = TransactionDescriptor::new("noop", Address::ZERO, Bytes::new());
        assert_eq!(d.tx.value, U256::ZERO);
    }
}
