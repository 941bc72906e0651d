//! Authorization payload builder and the canonical message both sides sign
//! and verify.
//!
//! [`canonical_message`] is the only routine that turns a payload into the
//! bytes a wallet signs. The builder and the verification gate both call
//! it; any second serialization path would break every signature check.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::IntentError;
use crate::registry::NetworkConfig;
use crate::types::{AuthorizationPayload, IntentKind, PAYLOAD_VERSION};
use crate::validation::{checksum, parse_address};

/// First line(s) of every canonical message, followed by a blank line.
pub const MESSAGE_PREFIX: &str = "StreamPay Authorization Request\n\
Signing this message authorizes the action below until it expires. \
It does not send a transaction.";

pub const DEFAULT_TTL_SECS: i64 = 300;

/// Serialize `value` as compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> Result<String, IntentError> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), IntentError> {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key], out)?;
            }
            out.push('}');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// The exact text a wallet signs for `payload`. Pure and deterministic.
pub fn canonical_message(payload: &AuthorizationPayload) -> Result<String, IntentError> {
    let body = canonical_json(&serde_json::to_value(payload)?)?;
    Ok(format!("{MESSAGE_PREFIX}\n\n{body}"))
}

/// A freshly issued payload and the message the wallet must sign.
#[derive(Debug, Clone, Serialize)]
pub struct SignableAuthorization {
    pub payload: AuthorizationPayload,
    pub message: String,
}

/// Issues authorization payloads bound to one deployment's chain.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    network: String,
    chain_id: u64,
    ttl: Duration,
}

impl PayloadBuilder {
    pub fn new(network: &NetworkConfig) -> Self {
        Self {
            network: network.name.clone(),
            chain_id: network.chain_id,
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Result<Self, IntentError> {
        if ttl <= Duration::zero() {
            return Err(IntentError::ConfigError(format!(
                "authorization TTL must be positive, got {}s",
                ttl.num_seconds()
            )));
        }
        self.ttl = ttl;
        Ok(self)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn build(
        &self,
        user_address: &str,
        intent_kind: IntentKind,
        parameters: Map<String, Value>,
    ) -> Result<SignableAuthorization, IntentError> {
        self.build_at(Utc::now(), user_address, intent_kind, parameters)
    }

    /// Same as [`build`](Self::build) with an explicit issuance time.
    pub fn build_at(
        &self,
        now: DateTime<Utc>,
        user_address: &str,
        intent_kind: IntentKind,
        parameters: Map<String, Value>,
    ) -> Result<SignableAuthorization, IntentError> {
        let user = parse_address("userAddress", user_address)?;
        if intent_kind == IntentKind::Unknown {
            return Err(IntentError::invalid_parameter(
                "intentKind",
                "cannot authorize an unrecognized intent",
            ));
        }

        let issued_at = now.timestamp_millis();
        let expires_at = issued_at
            .checked_add(self.ttl.num_milliseconds())
            .ok_or_else(|| {
                IntentError::ConfigError("authorization TTL overflows the expiry timestamp".into())
            })?;
        let payload = AuthorizationPayload {
            version: PAYLOAD_VERSION.to_string(),
            request_id: Uuid::new_v4().to_string(),
            intent_kind,
            user_address: checksum(&user),
            network: self.network.clone(),
            chain_id: self.chain_id,
            parameters,
            issued_at,
            expires_at,
        };
        let message = canonical_message(&payload)?;

        tracing::info!(
            request_id = %payload.request_id,
            intent_kind = %intent_kind,
            network = %payload.network,
            expires_at = payload.expires_at,
            "authorization payload issued"
        );

        Ok(SignableAuthorization { payload, message })
    }
}
