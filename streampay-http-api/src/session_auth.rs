//! Wallet sign-in: challenge/verify over EIP-191 `personal_sign`, issuing
//! `sess_` bearer tokens bound to the recovered account.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use streampay_runtime::validation::{addresses_equal, checksum, parse_address};
use streampay_runtime::{FieldError, IntentError};

use crate::ApiState;
use crate::error::ApiError;

/// Pending challenge awaiting a signature from the wallet.
struct PendingChallenge {
    address: String,
    nonce: String,
    created_at: u64,
}

/// Validated session token for an authenticated account.
pub struct SessionToken {
    pub token: String,
    pub address: String,
    pub created_at: u64,
    pub expires_at: u64,
}

/// nonce → challenge and token → session, both expired lazily.
pub struct SessionStore {
    challenges: DashMap<String, PendingChallenge>,
    tokens: DashMap<String, SessionToken>,
    challenge_ttl_secs: u64,
    session_ttl_secs: u64,
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn challenge_text(address: &str, nonce: &str) -> String {
    format!("Sign in to StreamPay as {address}:\n{nonce}")
}

impl SessionStore {
    pub fn new(challenge_ttl_secs: u64, session_ttl_secs: u64) -> Self {
        Self {
            challenges: DashMap::new(),
            tokens: DashMap::new(),
            challenge_ttl_secs,
            session_ttl_secs,
        }
    }

    /// Issue a fresh challenge for `address`. Returns `(challenge, nonce)`.
    pub fn issue_challenge(&self, address: &str) -> (String, String) {
        let nonce = hex::encode(rand::random::<[u8; 16]>());
        let now = now_secs();

        let cutoff = now.saturating_sub(self.challenge_ttl_secs);
        self.challenges.retain(|_, v| v.created_at > cutoff);

        self.challenges.insert(
            nonce.clone(),
            PendingChallenge {
                address: address.to_string(),
                nonce: nonce.clone(),
                created_at: now,
            },
        );
        (challenge_text(address, &nonce), nonce)
    }

    /// Consume a challenge and, if `signature` recovers to the challenged
    /// account, issue a session token for it.
    pub fn verify_challenge(
        &self,
        nonce: &str,
        signature: &str,
    ) -> Result<SessionToken, IntentError> {
        let pending = self
            .challenges
            .remove(nonce)
            .map(|(_, v)| v)
            .ok_or_else(|| IntentError::invalid_parameter("nonce", "unknown or expired nonce"))?;

        if now_secs().saturating_sub(pending.created_at) > self.challenge_ttl_secs {
            return Err(IntentError::invalid_parameter("nonce", "challenge expired"));
        }

        let malformed_signature =
            |message: String| IntentError::MalformedRequest(vec![FieldError::new("signature", message)]);
        let sig_bytes = hex::decode(signature.strip_prefix("0x").unwrap_or(signature))
            .map_err(|e| malformed_signature(format!("invalid hex: {e}")))?;

        let signature = alloy::signers::Signature::try_from(sig_bytes.as_slice())
            .map_err(|e| malformed_signature(e.to_string()))?;

        // EIP-191 recovery: recover the signer address from the personal_sign message
        let text = challenge_text(&pending.address, &pending.nonce);
        let recovered = signature
            .recover_address_from_msg(text.as_bytes())
            .map_err(|e| IntentError::InvalidSignature(format!("recovery failed: {e}")))?;

        let recovered_str = checksum(&recovered);
        if !addresses_equal(&recovered_str, &pending.address) {
            tracing::warn!(
                claimed = %pending.address,
                recovered = %recovered_str,
                "sign-in signature from a different account"
            );
            return Err(IntentError::UserMismatch {
                session: pending.address,
                payload: recovered_str,
            });
        }

        let now = now_secs();
        self.tokens.retain(|_, v| v.expires_at > now);

        let token = format!("sess_{}", hex::encode(rand::random::<[u8; 24]>()));
        let expires_at = now + self.session_ttl_secs;
        self.tokens.insert(
            token.clone(),
            SessionToken {
                token: token.clone(),
                address: recovered_str.clone(),
                created_at: now,
                expires_at,
            },
        );
        tracing::info!(address = %recovered_str, expires_at, "session issued");

        Ok(SessionToken {
            token,
            address: recovered_str,
            created_at: now,
            expires_at,
        })
    }

    /// Validate a session token and return the associated account if valid.
    pub fn validate(&self, token: &str) -> Option<String> {
        let entry = self.tokens.get(token)?;
        if entry.expires_at <= now_secs() {
            drop(entry);
            self.tokens.remove(token);
            return None;
        }
        Some(entry.address.clone())
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }
}

// ── Challenge endpoint ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChallengeRequest {
    pub address: String,
}

#[derive(Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
    pub nonce: String,
}

pub async fn challenge(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let Json(body) = body?;
    let address = parse_address("address", &body.address)?;
    let (challenge, nonce) = state.sessions.issue_challenge(&checksum(&address));
    Ok(Json(ChallengeResponse { challenge, nonce }))
}

// ── Verify endpoint ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub nonce: String,
    pub signature: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub token: String,
    pub address: String,
    pub expires_at: u64,
}

pub async fn verify(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(body) = body?;
    let session = state
        .sessions
        .verify_challenge(&body.nonce, &body.signature)?;
    Ok(Json(VerifyResponse {
        token: session.token,
        address: session.address,
        expires_at: session.expires_at,
    }))
}
