//! Signature verification gate.
//!
//! Checks run in a fixed order and stop at the first failure: session,
//! shape, expiry, session/payload account match, signer recovery, and
//! (when a [`NonceCache`] is attached) single use of the request id.

use std::sync::Arc;

use alloy::signers::Signature;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use crate::error::{FieldError, IntentError};
use crate::payload::canonical_message;
use crate::types::{
    AuthorizationPayload, IntentKind, PAYLOAD_VERSION, SessionIdentity, VerifiedAuthorization,
};
use crate::validation::{addresses_equal, is_valid_address, is_valid_signature_hex};

const PAYLOAD_FIELDS: &[&str] = &[
    "version",
    "requestId",
    "intentKind",
    "userAddress",
    "network",
    "chainId",
    "parameters",
    "issuedAt",
    "expiresAt",
];

/// Consumed request ids, each kept until its payload expires.
#[derive(Debug, Default)]
pub struct NonceCache {
    consumed: DashMap<String, i64>,
}

impl NonceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `request_id` as used. Returns `false` if it already was.
    pub fn consume(&self, request_id: &str, expires_at: i64, now_ms: i64) -> bool {
        self.consumed.retain(|_, exp| *exp >= now_ms);
        match self.consumed.entry(request_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignatureGate {
    nonces: Option<Arc<NonceCache>>,
}

impl SignatureGate {
    /// A gate without replay tracking: the TTL is the only replay bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// A gate that accepts each request id at most once.
    pub fn with_replay_protection(nonces: Arc<NonceCache>) -> Self {
        Self {
            nonces: Some(nonces),
        }
    }

    pub fn replay_protected(&self) -> bool {
        self.nonces.is_some()
    }

    pub fn verify(
        &self,
        session: Option<&SessionIdentity>,
        signature: &str,
        payload: &Value,
    ) -> Result<VerifiedAuthorization, IntentError> {
        self.verify_at(Utc::now(), session, signature, payload)
    }

    /// Same as [`verify`](Self::verify) against an explicit server time.
    pub fn verify_at(
        &self,
        now: DateTime<Utc>,
        session: Option<&SessionIdentity>,
        signature: &str,
        payload: &Value,
    ) -> Result<VerifiedAuthorization, IntentError> {
        let session = session.ok_or(IntentError::NotAuthenticated)?;
        let payload = check_shape(signature, payload)?;

        let now_ms = now.timestamp_millis();
        if now_ms > payload.expires_at {
            tracing::info!(
                request_id = %payload.request_id,
                expires_at = payload.expires_at,
                now = now_ms,
                "authorization expired"
            );
            return Err(IntentError::SignatureExpired {
                expires_at: payload.expires_at,
                now: now_ms,
            });
        }

        if !addresses_equal(&session.account_address, &payload.user_address) {
            tracing::warn!(
                request_id = %payload.request_id,
                session = %session.account_address,
                user = %payload.user_address,
                "session account does not match authorization"
            );
            return Err(IntentError::UserMismatch {
                session: session.account_address.clone(),
                payload: payload.user_address.clone(),
            });
        }

        let message = canonical_message(&payload)?;
        let recovered = recover_signer(signature, &message)?;
        let recovered_str = format!("{recovered:#x}");
        if !addresses_equal(&recovered_str, &payload.user_address) {
            tracing::warn!(
                request_id = %payload.request_id,
                recovered = %recovered_str,
                user = %payload.user_address,
                "signature recovered to a different account"
            );
            return Err(IntentError::InvalidSignature(format!(
                "signed by {recovered_str}, expected {}",
                payload.user_address
            )));
        }

        if let Some(nonces) = &self.nonces {
            if !nonces.consume(&payload.request_id, payload.expires_at, now_ms) {
                tracing::warn!(request_id = %payload.request_id, "authorization replayed");
                return Err(IntentError::RequestReplayed {
                    request_id: payload.request_id.clone(),
                });
            }
        }

        tracing::info!(
            request_id = %payload.request_id,
            intent_kind = %payload.intent_kind,
            signer = %recovered_str,
            "authorization verified"
        );

        Ok(VerifiedAuthorization {
            signature: signature.to_string(),
            payload,
            recovered_address: recovered,
            canonical_message: message,
        })
    }
}

fn recover_signer(signature: &str, message: &str) -> Result<alloy::primitives::Address, IntentError> {
    let hex_part = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(hex_part)
        .map_err(|e| IntentError::InvalidSignature(format!("signature is not hex: {e}")))?;
    let sig = Signature::try_from(bytes.as_slice())
        .map_err(|e| IntentError::InvalidSignature(format!("unparseable signature: {e}")))?;
    // EIP-191 personal_sign recovery
    sig.recover_address_from_msg(message.as_bytes())
        .map_err(|e| IntentError::InvalidSignature(format!("signer recovery failed: {e}")))
}

/// Validate request shape, collecting every field problem before failing.
fn check_shape(signature: &str, payload: &Value) -> Result<AuthorizationPayload, IntentError> {
    let mut errors = Vec::new();

    if !is_valid_signature_hex(signature) {
        errors.push(FieldError::new(
            "signature",
            "expected 0x-prefixed 65-byte hex signature",
        ));
    }

    let Some(obj) = payload.as_object() else {
        errors.push(FieldError::new("payload", "expected an object"));
        return Err(IntentError::MalformedRequest(errors));
    };

    for key in obj.keys() {
        if !PAYLOAD_FIELDS.contains(&key.as_str()) {
            errors.push(FieldError::new(key.clone(), "unexpected field"));
        }
    }

    match obj.get("version").and_then(Value::as_str) {
        Some(PAYLOAD_VERSION) => {}
        _ => errors.push(FieldError::new(
            "version",
            format!("expected \"{PAYLOAD_VERSION}\""),
        )),
    }

    if obj
        .get("requestId")
        .and_then(Value::as_str)
        .is_none_or(|s| s.trim().is_empty())
    {
        errors.push(FieldError::new("requestId", "required non-empty string"));
    }

    let kind = obj
        .get("intentKind")
        .and_then(|v| serde_json::from_value::<IntentKind>(v.clone()).ok());
    if kind.is_none_or(|k| k == IntentKind::Unknown) {
        errors.push(FieldError::new("intentKind", "expected a supported intent kind"));
    }

    if !obj
        .get("userAddress")
        .and_then(Value::as_str)
        .is_some_and(is_valid_address)
    {
        errors.push(FieldError::new("userAddress", "expected a 0x-prefixed 20-byte address"));
    }

    if obj
        .get("network")
        .and_then(Value::as_str)
        .is_none_or(|s| s.trim().is_empty())
    {
        errors.push(FieldError::new("network", "required non-empty string"));
    }

    if obj.get("chainId").and_then(Value::as_u64).is_none() {
        errors.push(FieldError::new("chainId", "expected an unsigned integer"));
    }

    if !obj.get("parameters").is_some_and(Value::is_object) {
        errors.push(FieldError::new("parameters", "expected an object"));
    }

    let issued_at = obj.get("issuedAt").and_then(Value::as_i64);
    let expires_at = obj.get("expiresAt").and_then(Value::as_i64);
    if issued_at.is_none() {
        errors.push(FieldError::new("issuedAt", "expected integer milliseconds"));
    }
    if expires_at.is_none() {
        errors.push(FieldError::new("expiresAt", "expected integer milliseconds"));
    }
    if let (Some(issued), Some(expires)) = (issued_at, expires_at) {
        if expires <= issued {
            errors.push(FieldError::new("expiresAt", "must be later than issuedAt"));
        }
    }

    if !errors.is_empty() {
        return Err(IntentError::MalformedRequest(errors));
    }

    serde_json::from_value(payload.clone())
        .map_err(|e| IntentError::MalformedRequest(vec![FieldError::new("payload", e.to_string())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadBuilder;
    use crate::registry::Registry;
    use alloy::signers::SignerSync;
    use alloy::signers::local::PrivateKeySigner;
    use chrono::Duration;
    use serde_json::json;

    // Hardhat account #0 (test-only key)
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    struct Fixture {
        signer: PrivateKeySigner,
        payload: Value,
        signature: String,
        issued: DateTime<Utc>,
    }

    fn fixture() -> Fixture {
        let signer: PrivateKeySigner = TEST_PRIVATE_KEY.parse().unwrap();
        let issued = Utc::now();
        let signable = PayloadBuilder::new(Registry::local_dev().active())
            .build_at(
                issued,
                &format!("{:#x}", signer.address()),
                IntentKind::ClaimStream,
                json!({"streamId": "7"}).as_object().cloned().unwrap(),
            )
            .unwrap();
        let sig = signer.sign_message_sync(signable.message.as_bytes()).unwrap();
        Fixture {
            payload: serde_json::to_value(&signable.payload).unwrap(),
            signature: format!("0x{}", hex::encode(sig.as_bytes())),
            signer,
            issued,
        }
    }

    fn session(f: &Fixture) -> SessionIdentity {
        SessionIdentity::new(format!("{:#x}", f.signer.address()))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let f = fixture();
        let verified = SignatureGate::new()
            .verify_at(f.issued, Some(&session(&f)), &f.signature, &f.payload)
            .unwrap();
        assert_eq!(verified.recovered_address, f.signer.address());
        assert_eq!(verified.payload.intent_kind, IntentKind::ClaimStream);
        assert!(verified.canonical_message.starts_with(crate::payload::MESSAGE_PREFIX));
    }

    #[test]
    fn test_missing_session_short_circuits() {
        let f = fixture();
        // Even a garbage payload reports the missing session first
        let err = SignatureGate::new()
            .verify_at(f.issued, None, "junk", &json!(null))
            .unwrap_err();
        assert_eq!(err, IntentError::NotAuthenticated);
    }

    #[test]
    fn test_malformed_collects_all_fields() {
        let f = fixture();
        let err = SignatureGate::new()
            .verify_at(
                f.issued,
                Some(&session(&f)),
                "0x1234",
                &json!({"version": "2", "userAddress": "bob", "extra": 1}),
            )
            .unwrap_err();
        let fields: Vec<String> = err.field_errors().into_iter().map(|e| e.field).collect();
        for expected in [
            "signature",
            "extra",
            "version",
            "requestId",
            "intentKind",
            "userAddress",
            "network",
            "chainId",
            "parameters",
            "issuedAt",
            "expiresAt",
        ] {
            assert!(fields.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let f = fixture();
        let gate = SignatureGate::new();
        let expires = f.issued + Duration::seconds(crate::payload::DEFAULT_TTL_SECS);

        let ok = gate.verify_at(
            expires - Duration::milliseconds(1),
            Some(&session(&f)),
            &f.signature,
            &f.payload,
        );
        assert!(ok.is_ok());

        let err = gate
            .verify_at(
                expires + Duration::milliseconds(1),
                Some(&session(&f)),
                &f.signature,
                &f.payload,
            )
            .unwrap_err();
        assert_eq!(err.code(), "SIGNATURE_EXPIRED");
    }

    #[test]
    fn test_user_mismatch() {
        let f = fixture();
        let other = SessionIdentity::new("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
        let err = SignatureGate::new()
            .verify_at(f.issued, Some(&other), &f.signature, &f.payload)
            .unwrap_err();
        assert_eq!(err.code(), "USER_MISMATCH");
        assert!(err.is_security_rejection());
    }

    #[test]
    fn test_case_insensitive_session_match() {
        let f = fixture();
        let upper = SessionIdentity::new(format!(
            "0x{}",
            hex::encode(f.signer.address().as_slice()).to_uppercase()
        ));
        assert!(
            SignatureGate::new()
                .verify_at(f.issued, Some(&upper), &f.signature, &f.payload)
                .is_ok()
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let f = fixture();
        let mut tampered = f.payload.clone();
        tampered["parameters"]["streamId"] = json!("8");
        let err = SignatureGate::new()
            .verify_at(f.issued, Some(&session(&f)), &f.signature, &tampered)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_replay_rejected_when_cache_attached() {
        let f = fixture();
        let cache = Arc::new(NonceCache::new());
        let gate = SignatureGate::with_replay_protection(cache.clone());
        assert!(gate.replay_protected());

        gate.verify_at(f.issued, Some(&session(&f)), &f.signature, &f.payload)
            .unwrap();
        let err = gate
            .verify_at(f.issued, Some(&session(&f)), &f.signature, &f.payload)
            .unwrap_err();
        assert_eq!(err.code(), "REQUEST_REPLAYED");
        assert_eq!(cache.len(), 1);

        // Without a cache the same pair stays valid until expiry
        let plain = SignatureGate::new();
        assert!(plain.verify_at(f.issued, Some(&session(&f)), &f.signature, &f.payload).is_ok());
        assert!(plain.verify_at(f.issued, Some(&session(&f)), &f.signature, &f.payload).is_ok());
    }

    #[test]
    fn test_nonce_cache_prunes_expired() {
        let cache = NonceCache::new();
        assert!(cache.consume("a", 1_000, 0));
        assert!(!cache.consume("a", 1_000, 500));
        // "a" expired by now=2_000, pruned before "b" is recorded
        assert!(cache.consume("b", 3_000, 2_000));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_verification_does_not_consume_nonce() {
        let f = fixture();
        let cache = Arc::new(NonceCache::new());
        let gate = SignatureGate::with_replay_protection(cache.clone());
        let other = SessionIdentity::new("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
        assert!(gate.verify_at(f.issued, Some(&other), &f.signature, &f.payload).is_err());
        assert!(cache.is_empty());
    }
}
