//! Centralized Contract Definitions
//!
//! All Solidity interfaces the scanner reads, defined with alloy's `sol!`
//! macro. Calls are encoded with `SolCall::abi_encode` and dispatched as
//! raw `eth_call`s (directly or inside a Multicall3 batch), so no
//! `#[sol(rpc)]` instance types are generated.

use alloy::sol;

// ── Uniswap V2 (constant product) ────────────────────────────────────

sol! {
    interface IUniswapV2Router {
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
        function factory() external view returns (address);
    }
}

sol! {
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

sol! {
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
    }
}

// ── Uniswap V3 (concentrated liquidity) ──────────────────────────────

sol! {
    interface IQuoter {
        function quoteExactInputSingle(address tokenIn, address tokenOut, uint256 amountIn, uint24 fee) external returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);
    }
}

// ── Multicall3 ───────────────────────────────────────────────────────

sol! {
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct CallResult {
        bool success;
        bytes returnData;
    }

    interface IMulticall3 {
        function aggregate3(Call3[] calldata calls) external payable returns (CallResult[] memory returnData);
    }
}
