//! End-to-end tests for the authorization pipeline.
//!
//! Text goes through the parser and builder, the canonical message is
//! signed with a local key (as a wallet would), and the result is driven
//! through the verification gate and the orchestrator.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};

use streampay_runtime::contracts::{IERC20, IStreamCore};
use streampay_runtime::payload::DEFAULT_TTL_SECS;
use streampay_runtime::{
    IntentKind, IntentParser, NonceCache, PayloadBuilder, Registry, SessionIdentity,
    SignableAuthorization, SignatureGate, TransactionOrchestrator, canonical_message,
    validate_intent,
};

// Hardhat accounts #0 and #1 (test-only keys)
const USER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const OTHER_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

const RECIPIENT: &str = "0x1111111111111111111111111111111111111111";

struct Pipeline {
    registry: Arc<Registry>,
    parser: IntentParser,
    builder: PayloadBuilder,
    gate: SignatureGate,
    orchestrator: TransactionOrchestrator,
}

fn pipeline() -> Pipeline {
    let registry = Arc::new(Registry::local_dev());
    Pipeline {
        parser: IntentParser::from_registry(&registry),
        builder: PayloadBuilder::new(registry.active()),
        gate: SignatureGate::new(),
        orchestrator: TransactionOrchestrator::new(registry.clone()),
        registry,
    }
}

fn user() -> PrivateKeySigner {
    USER_KEY.parse().unwrap()
}

fn sign(signer: &PrivateKeySigner, message: &str) -> String {
    let sig = signer.sign_message_sync(message.as_bytes()).unwrap();
    format!("0x{}", hex::encode(sig.as_bytes()))
}

fn session_for(signer: &PrivateKeySigner) -> SessionIdentity {
    SessionIdentity::new(signer.address().to_checksum(None))
}

fn issue(p: &Pipeline, now: DateTime<Utc>, text: &str) -> SignableAuthorization {
    let parsed = p.parser.parse_intent(text);
    assert!(validate_intent(&parsed), "not actionable: {parsed:?}");
    p.builder
        .build_at(
            now,
            &user().address().to_checksum(None),
            parsed.intent_kind,
            parsed.parameters_json(),
        )
        .unwrap()
}

fn as_json(signable: &SignableAuthorization) -> Value {
    serde_json::to_value(&signable.payload).unwrap()
}

#[test]
fn test_usdc_stream_end_to_end() {
    let p = pipeline();
    let now = Utc::now();
    let text = format!("Create a stream of 1000 USDC to {RECIPIENT} per day for 30 days");

    let parsed = p.parser.parse_intent(&text);
    assert_eq!(parsed.intent_kind, IntentKind::CreateStream);
    assert!(parsed.confidence > 0.7);

    let signable = issue(&p, now, &text);
    let signature = sign(&user(), &signable.message);

    let verified = p
        .gate
        .verify_at(now, Some(&session_for(&user())), &signature, &as_json(&signable))
        .unwrap();
    assert_eq!(verified.recovered_address, user().address());

    let txs = p.orchestrator.resolve_verified(&verified).unwrap();
    assert_eq!(txs.len(), 2);

    let network = p.registry.active();
    let approve = IERC20::approveCall::abi_decode(&txs[0].tx.data).unwrap();
    let create = IStreamCore::createStreamCall::abi_decode(&txs[1].tx.data).unwrap();
    assert_eq!(approve.amount, U256::from(1_000_000_000u64));
    assert_eq!(approve.amount, create.deposit);
    assert_eq!(approve.spender, network.core_contract);
    assert_eq!(txs[1].tx.to, network.core_contract);
    assert_eq!(create.recipient, RECIPIENT.parse::<Address>().unwrap());
    assert_eq!(create.duration, U256::from(30u64 * 86_400));
    assert_eq!(
        create.ratePerSecond,
        U256::from(1_000_000_000u64 / (30 * 86_400))
    );
}

#[test]
fn test_canonical_message_is_stable_across_round_trip() {
    let p = pipeline();
    let signable = issue(&p, Utc::now(), "claim stream 5");
    // The client echoes the payload back as JSON
    let echoed: streampay_runtime::AuthorizationPayload =
        serde_json::from_str(&serde_json::to_string(&signable.payload).unwrap()).unwrap();
    assert_eq!(canonical_message(&echoed).unwrap(), signable.message);
}

#[test]
fn test_wrong_key_is_invalid_signature() {
    let p = pipeline();
    let now = Utc::now();
    let signable = issue(&p, now, "claim stream 5");
    let other: PrivateKeySigner = OTHER_KEY.parse().unwrap();
    let signature = sign(&other, &signable.message);

    let err = p
        .gate
        .verify_at(now, Some(&session_for(&user())), &signature, &as_json(&signable))
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_SIGNATURE");
}

#[test]
fn test_expiry_boundary() {
    let p = pipeline();
    let now = Utc::now();
    let signable = issue(&p, now, "cancel stream 9");
    let signature = sign(&user(), &signable.message);
    let expires = now + Duration::seconds(DEFAULT_TTL_SECS);
    let session = session_for(&user());

    assert!(
        p.gate
            .verify_at(
                expires - Duration::milliseconds(1),
                Some(&session),
                &signature,
                &as_json(&signable)
            )
            .is_ok()
    );
    let err = p
        .gate
        .verify_at(
            expires + Duration::milliseconds(1),
            Some(&session),
            &signature,
            &as_json(&signable),
        )
        .unwrap_err();
    assert_eq!(err.code(), "SIGNATURE_EXPIRED");
}

#[test]
fn test_session_match_is_case_insensitive() {
    let p = pipeline();
    let now = Utc::now();
    let signable = issue(&p, now, "cancel stream 9");
    let signature = sign(&user(), &signable.message);

    for session in [
        SessionIdentity::new(format!("{:#x}", user().address())),
        SessionIdentity::new(format!(
            "0x{}",
            hex::encode(user().address().as_slice()).to_uppercase()
        )),
    ] {
        assert!(
            p.gate
                .verify_at(now, Some(&session), &signature, &as_json(&signable))
                .is_ok()
        );
    }
}

#[test]
fn test_tampering_any_signed_field_invalidates_signature() {
    let p = pipeline();
    let now = Utc::now();
    let text = format!("Create a stream of 1000 USDC to {RECIPIENT} per day for 30 days");
    let signable = issue(&p, now, &text);
    let signature = sign(&user(), &signable.message);
    let session = session_for(&user());

    let mutations: Vec<(&str, Value)> = vec![
        ("requestId", json!("00000000-0000-4000-8000-000000000000")),
        ("intentKind", json!("CANCEL_STREAM")),
        ("network", json!("mainnet")),
        ("chainId", json!(1)),
        ("issuedAt", json!(signable.payload.issued_at - 1)),
        ("expiresAt", json!(signable.payload.expires_at + 60_000)),
    ];
    for (field, value) in mutations {
        let mut tampered = as_json(&signable);
        tampered[field] = value;
        let err = p
            .gate
            .verify_at(now, Some(&session), &signature, &tampered)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_SIGNATURE", "field {field}");
    }

    let mut tampered = as_json(&signable);
    tampered["parameters"]["amount"] = json!("1000000");
    let err = p
        .gate
        .verify_at(now, Some(&session), &signature, &tampered)
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_SIGNATURE");
}

#[test]
fn test_other_session_cannot_execute_valid_signature() {
    let p = pipeline();
    let now = Utc::now();
    let signable = issue(&p, now, "claim stream 5");
    let signature = sign(&user(), &signable.message);
    let other: PrivateKeySigner = OTHER_KEY.parse().unwrap();

    let err = p
        .gate
        .verify_at(now, Some(&session_for(&other)), &signature, &as_json(&signable))
        .unwrap_err();
    assert_eq!(err.code(), "USER_MISMATCH");
}

#[test]
fn test_pause_stream_verifies_but_never_resolves() {
    let p = pipeline();
    let now = Utc::now();
    let signable = issue(&p, now, "pause stream 3");
    let signature = sign(&user(), &signable.message);
    let verified = p
        .gate
        .verify_at(now, Some(&session_for(&user())), &signature, &as_json(&signable))
        .unwrap();
    let err = p.orchestrator.resolve_verified(&verified).unwrap_err();
    assert_eq!(err.code(), "UNSUPPORTED_INTENT");
}

#[test]
fn test_replay_protection_is_opt_in() {
    let p = pipeline();
    let now = Utc::now();
    let signable = issue(&p, now, "swap 250 usdc for weth");
    let signature = sign(&user(), &signable.message);
    let session = session_for(&user());

    let guarded = SignatureGate::with_replay_protection(Arc::new(NonceCache::new()));
    assert!(
        guarded
            .verify_at(now, Some(&session), &signature, &as_json(&signable))
            .is_ok()
    );
    let err = guarded
        .verify_at(now, Some(&session), &signature, &as_json(&signable))
        .unwrap_err();
    assert_eq!(err.code(), "REQUEST_REPLAYED");
}

#[test]
fn test_gibberish_never_reaches_builder() {
    let p = pipeline();
    let parsed = p.parser.parse_intent("asdfghjkl qwertyuiop");
    assert_eq!(parsed.intent_kind, IntentKind::Unknown);
    assert_eq!(parsed.confidence, 0.0);
    let err = p
        .builder
        .build(RECIPIENT, parsed.intent_kind, parsed.parameters_json())
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_PARAMETERS");
}
