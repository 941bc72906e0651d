use alloy::primitives::{Address, Bytes, U256, Uint};
use alloy::sol_types::SolCall;

use super::{PlanContext, ProtocolAdapter, erc20, unsupported};
use crate::action::ActionRequest;
use crate::contracts::ISwapRouter;
use crate::error::IntentError;
use crate::types::{TokenDescriptor, TransactionDescriptor};

/// Alloy type alias for uint24 (used for Uniswap fee tiers)
type Uint24 = Uint<24, 1>;
/// Alloy type alias for uint160 (used for sqrtPriceLimitX96)
type Uint160 = Uint<160, 3>;

/// 0.3%
pub const DEFAULT_FEE_TIER: u32 = 3000;

/// Pool fee tiers the router accepts, in hundredths of a basis point.
pub const SUPPORTED_FEE_TIERS: &[u32] = &[100, 500, 3000, 10000];

/// Seconds past the authorization's expiry that a swap may still settle.
pub const DEADLINE_GRACE_SECS: u64 = 1800;

pub fn validate_fee_tier(fee_tier: u32) -> Result<u32, IntentError> {
    if SUPPORTED_FEE_TIERS.contains(&fee_tier) {
        Ok(fee_tier)
    } else {
        Err(IntentError::invalid_parameter(
            "feeTier",
            format!("{fee_tier} is not one of {SUPPORTED_FEE_TIERS:?}"),
        ))
    }
}

pub struct UniswapV3Adapter {
    router_address: Address,
}

impl UniswapV3Adapter {
    pub fn with_router(router_address: Address) -> Self {
        Self { router_address }
    }

    /// Encode an exactInputSingle call.
    fn encode_exact_input_single(
        &self,
        token_in: &TokenDescriptor,
        token_out: &TokenDescriptor,
        amount_in: U256,
        amount_out_min: U256,
        fee_tier: u32,
        ctx: &PlanContext,
    ) -> Bytes {
        let call = ISwapRouter::exactInputSingleCall {
            params: ISwapRouter::ExactInputSingleParams {
                tokenIn: token_in.address,
                tokenOut: token_out.address,
                fee: Uint24::from(fee_tier),
                recipient: ctx.user,
                deadline: ctx.deadline,
                amountIn: amount_in,
                amountOutMinimum: amount_out_min,
                sqrtPriceLimitX96: Uint160::ZERO, // No price limit
            },
        };
        Bytes::from(call.abi_encode())
    }
}

impl ProtocolAdapter for UniswapV3Adapter {
    fn protocol_id(&self) -> &str {
        "uniswap_v3"
    }

    fn target(&self) -> Address {
        self.router_address
    }

    fn encode_action(
        &self,
        action: &ActionRequest,
        ctx: &PlanContext,
    ) -> Result<Vec<TransactionDescriptor>, IntentError> {
        let ActionRequest::SwapTokens {
            token_in,
            token_out,
            amount_in,
            min_amount_out,
            fee_tier,
        } = action
        else {
            return Err(unsupported(self.protocol_id(), action));
        };

        let fee_tier = validate_fee_tier(*fee_tier)?;
        let approve = erc20::approve(token_in, self.router_address, "swap router", *amount_in);
        let calldata = self.encode_exact_input_single(
            token_in,
            token_out,
            *amount_in,
            *min_amount_out,
            fee_tier,
            ctx,
        );
        Ok(vec![
            approve,
            TransactionDescriptor::new(
                format!(
                    "Swap {} for {}",
                    token_in.symbol_or_address, token_out.symbol_or_address
                ),
                self.router_address,
                calldata,
            ),
        ])
    }
}
