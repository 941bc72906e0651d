use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use super::{PlanContext, ProtocolAdapter, erc20, unsupported};
use crate::action::ActionRequest;
use crate::contracts::IStreamCore;
use crate::error::IntentError;
use crate::types::TransactionDescriptor;

/// Payment-stream core contract: create, claim, cancel.
pub struct StreamCoreAdapter {
    core: Address,
}

impl StreamCoreAdapter {
    pub fn new(core: Address) -> Self {
        Self { core }
    }

    fn call(&self, label: String, data: Vec<u8>) -> TransactionDescriptor {
        TransactionDescriptor::new(label, self.core, Bytes::from(data))
    }
}

impl ProtocolAdapter for StreamCoreAdapter {
    fn protocol_id(&self) -> &str {
        "stream_core"
    }

    fn target(&self) -> Address {
        self.core
    }

    fn encode_action(
        &self,
        action: &ActionRequest,
        _ctx: &PlanContext,
    ) -> Result<Vec<TransactionDescriptor>, IntentError> {
        match action {
            ActionRequest::CreateStream {
                recipient,
                token,
                deposit,
                rate_per_second,
                duration_secs,
            } => {
                // The core pulls the deposit, so the approval must land first.
                let approve = erc20::approve(token, self.core, "stream core", *deposit);
                let create = IStreamCore::createStreamCall {
                    recipient: *recipient,
                    token: token.address,
                    deposit: *deposit,
                    ratePerSecond: *rate_per_second,
                    duration: U256::from(*duration_secs),
                };
                Ok(vec![
                    approve,
                    self.call(
                        format!("Create {} stream", token.symbol_or_address),
                        create.abi_encode(),
                    ),
                ])
            }
            ActionRequest::ClaimStream { stream_id } => {
                let call = IStreamCore::claimStreamCall {
                    streamId: *stream_id,
                };
                Ok(vec![
                    self.call(format!("Claim stream {stream_id}"), call.abi_encode()),
                ])
            }
            ActionRequest::CancelStream { stream_id } => {
                let call = IStreamCore::cancelStreamCall {
                    streamId: *stream_id,
                };
                Ok(vec![
                    self.call(format!("Cancel stream {stream_id}"), call.abi_encode()),
                ])
            }
            other => Err(unsupported(self.protocol_id(), other)),
        }
    }
}
