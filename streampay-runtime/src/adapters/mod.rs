pub mod erc20;
pub mod pool_manager;
pub mod stream_core;
pub mod uniswap_v3;

use alloy::primitives::{Address, U256};

use crate::action::ActionRequest;
use crate::error::IntentError;
use crate::types::TransactionDescriptor;

/// Common trait for the contracts an execution plan can target
pub trait ProtocolAdapter: Send + Sync {
    /// Protocol identifier
    fn protocol_id(&self) -> &str;

    /// Contract the adapter's main call goes to
    fn target(&self) -> Address;

    /// Encode an action into its ordered transaction steps
    fn encode_action(
        &self,
        action: &ActionRequest,
        ctx: &PlanContext,
    ) -> Result<Vec<TransactionDescriptor>, IntentError>;
}

/// Per-authorization values an adapter may need besides the action itself.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext {
    /// The account that signed the authorization.
    pub user: Address,
    /// Unix seconds after which time-bounded calls must revert.
    pub deadline: U256,
}

pub(crate) fn unsupported(protocol: &str, action: &ActionRequest) -> IntentError {
    IntentError::UnsupportedIntent {
        kind: action.kind(),
        reason: format!("{protocol} adapter cannot encode this action"),
    }
}
