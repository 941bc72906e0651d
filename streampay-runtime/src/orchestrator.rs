//! Verified authorization → ordered, unsigned transaction proposals.
//!
//! Pure with respect to the payload and the static registry: no chain or
//! network I/O happens here. Order of the returned list is execution order.

use std::sync::Arc;

use alloy::primitives::U256;

use crate::action::ActionRequest;
use crate::adapters::pool_manager::PoolManagerAdapter;
use crate::adapters::stream_core::StreamCoreAdapter;
use crate::adapters::uniswap_v3::{DEADLINE_GRACE_SECS, UniswapV3Adapter};
use crate::adapters::{PlanContext, ProtocolAdapter};
use crate::error::IntentError;
use crate::registry::{NetworkConfig, Registry};
use crate::types::{AuthorizationPayload, TransactionDescriptor, VerifiedAuthorization};
use crate::validation::parse_address;

#[derive(Debug, Clone)]
pub struct TransactionOrchestrator {
    registry: Arc<Registry>,
}

impl TransactionOrchestrator {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compile a payload into its execution plan.
    pub fn resolve(
        &self,
        payload: &AuthorizationPayload,
    ) -> Result<Vec<TransactionDescriptor>, IntentError> {
        let network = self.network_for(payload)?;
        let action = ActionRequest::decode(payload.intent_kind, &payload.parameters, network)?;
        let ctx = PlanContext {
            user: parse_address("userAddress", &payload.user_address)?,
            deadline: swap_deadline(payload.expires_at)?,
        };

        let adapter = adapter_for(&action, network);
        let txs = adapter.encode_action(&action, &ctx)?;

        tracing::info!(
            request_id = %payload.request_id,
            intent_kind = %payload.intent_kind,
            network = %network.name,
            protocol = adapter.protocol_id(),
            steps = txs.len(),
            "execution plan resolved"
        );
        Ok(txs)
    }

    pub fn resolve_verified(
        &self,
        verified: &VerifiedAuthorization,
    ) -> Result<Vec<TransactionDescriptor>, IntentError> {
        self.resolve(&verified.payload)
    }

    fn network_for(&self, payload: &AuthorizationPayload) -> Result<&NetworkConfig, IntentError> {
        let network = self.registry.network(&payload.network).ok_or_else(|| {
            IntentError::invalid_parameter(
                "network",
                format!("'{}' is not a configured network", payload.network),
            )
        })?;
        if network.chain_id != payload.chain_id {
            return Err(IntentError::invalid_parameter(
                "chainId",
                format!(
                    "{} does not match network '{}' (chain {})",
                    payload.chain_id, network.name, network.chain_id
                ),
            ));
        }
        Ok(network)
    }
}

fn adapter_for(action: &ActionRequest, network: &NetworkConfig) -> Box<dyn ProtocolAdapter> {
    match action {
        ActionRequest::CreateStream { .. }
        | ActionRequest::ClaimStream { .. }
        | ActionRequest::CancelStream { .. } => {
            Box::new(StreamCoreAdapter::new(network.core_contract))
        }
        ActionRequest::SwapTokens { .. } => {
            Box::new(UniswapV3Adapter::with_router(network.swap_router))
        }
        ActionRequest::AddLiquidity { .. } | ActionRequest::RemoveLiquidity { .. } => {
            Box::new(PoolManagerAdapter::new(network.pool_manager))
        }
    }
}

/// Swap deadline in Unix seconds: authorization expiry plus a settle window.
fn swap_deadline(expires_at_ms: i64) -> Result<U256, IntentError> {
    let secs = u64::try_from(expires_at_ms.div_euclid(1000))
        .map_err(|_| IntentError::invalid_parameter("expiresAt", "must not be negative"))?;
    Ok(U256::from(secs) + U256::from(DEADLINE_GRACE_SECS))
}
