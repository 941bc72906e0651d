//! Solidity bindings for every contract the orchestrator targets.
//!
//! Uses alloy's `sol!` macro to generate ABI encoders for the stream core,
//! the pool manager and the ERC-20 approval they depend on.

use alloy::sol;

sol! {
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }

    interface IStreamCore {
        function createStream(
            address recipient,
            address token,
            uint256 deposit,
            uint256 ratePerSecond,
            uint256 duration
        ) external returns (uint256 streamId);
        function claimStream(uint256 streamId) external returns (uint256 claimed);
        function cancelStream(uint256 streamId) external;
    }

    interface IPoolManager {
        function addLiquidity(uint256 poolId, uint256 amount0, uint256 amount1) external returns (uint256 shares);
        function removeLiquidity(uint256 poolId, uint256 shares) external returns (uint256 amount0, uint256 amount1);
    }

    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }
        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
    }
}
