use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use crate::contracts::IERC20;
use crate::types::{TokenDescriptor, TransactionDescriptor};

/// `approve(spender, amount)` on the token contract.
pub fn approve(
    token: &TokenDescriptor,
    spender: Address,
    spender_name: &str,
    amount: U256,
) -> TransactionDescriptor {
    let call = IERC20::approveCall { spender, amount };
    TransactionDescriptor::new(
        format!("Approve {} for {spender_name}", token.symbol_or_address),
        token.address,
        Bytes::from(call.abi_encode()),
    )
}
