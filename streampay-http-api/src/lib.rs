pub mod auth;
pub mod error;
pub mod routes;
pub mod session_auth;

use std::sync::Arc;

use axum::Router;
use chrono::TimeDelta;

use streampay_runtime::{
    IntentError, IntentParser, NonceCache, PayloadBuilder, Registry, SignatureGate,
    TransactionOrchestrator,
};

use crate::session_auth::SessionStore;

/// Tunables for [`ApiState`]. Defaults match the binary's env defaults.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Lifetime of an authorization payload.
    pub auth_ttl_secs: i64,
    /// Lifetime of a `sess_` token.
    pub session_ttl_secs: u64,
    /// Lifetime of an unanswered sign-in challenge.
    pub challenge_ttl_secs: u64,
    pub replay_protection: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_ttl_secs: 300,
            session_ttl_secs: 3600,
            challenge_ttl_secs: 300,
            replay_protection: true,
        }
    }
}

/// Every service a handler touches, built once and shared.
pub struct ApiState {
    pub registry: Arc<Registry>,
    pub parser: IntentParser,
    pub builder: PayloadBuilder,
    pub gate: SignatureGate,
    pub orchestrator: TransactionOrchestrator,
    pub sessions: SessionStore,
}

impl ApiState {
    pub fn new(registry: Arc<Registry>, config: &ApiConfig) -> Result<Self, IntentError> {
        let ttl = TimeDelta::try_seconds(config.auth_ttl_secs).ok_or_else(|| {
            IntentError::ConfigError(format!(
                "authorization TTL of {}s is out of range",
                config.auth_ttl_secs
            ))
        })?;
        let builder = PayloadBuilder::new(registry.active()).with_ttl(ttl)?;
        let gate = if config.replay_protection {
            SignatureGate::with_replay_protection(Arc::new(NonceCache::new()))
        } else {
            SignatureGate::new()
        };
        Ok(Self {
            parser: IntentParser::from_registry(&registry),
            orchestrator: TransactionOrchestrator::new(registry.clone()),
            sessions: SessionStore::new(config.challenge_ttl_secs, config.session_ttl_secs),
            registry,
            builder,
            gate,
        })
    }
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::session::router())
        .merge(routes::intent::router())
        .merge(routes::execute::router())
        .merge(routes::registry::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .with_state(state)
}
