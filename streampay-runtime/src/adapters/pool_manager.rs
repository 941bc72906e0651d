use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;

use super::{PlanContext, ProtocolAdapter, unsupported};
use crate::action::ActionRequest;
use crate::contracts::IPoolManager;
use crate::error::IntentError;
use crate::types::TransactionDescriptor;

/// Liquidity pool manager. Deposits pull from an allowance the user has
/// already granted, so no approval step is emitted.
pub struct PoolManagerAdapter {
    manager: Address,
}

impl PoolManagerAdapter {
    pub fn new(manager: Address) -> Self {
        Self { manager }
    }
}

impl ProtocolAdapter for PoolManagerAdapter {
    fn protocol_id(&self) -> &str {
        "pool_manager"
    }

    fn target(&self) -> Address {
        self.manager
    }

    fn encode_action(
        &self,
        action: &ActionRequest,
        _ctx: &PlanContext,
    ) -> Result<Vec<TransactionDescriptor>, IntentError> {
        let (label, data) = match action {
            ActionRequest::AddLiquidity {
                pool_id,
                amount0,
                amount1,
            } => (
                format!("Add liquidity to pool {pool_id}"),
                IPoolManager::addLiquidityCall {
                    poolId: *pool_id,
                    amount0: *amount0,
                    amount1: *amount1,
                }
                .abi_encode(),
            ),
            ActionRequest::RemoveLiquidity { pool_id, shares } => (
                format!("Remove liquidity from pool {pool_id}"),
                IPoolManager::removeLiquidityCall {
                    poolId: *pool_id,
                    shares: *shares,
                }
                .abi_encode(),
            ),
            other => return Err(unsupported(self.protocol_id(), other)),
        };
        Ok(vec![TransactionDescriptor::new(
            label,
            self.manager,
            Bytes::from(data),
        )])
    }
}
