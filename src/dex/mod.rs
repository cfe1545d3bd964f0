//! On-chain DEX quoting: adapters per pool protocol, a Multicall3 batcher,
//! and the aggregator that fans quote tasks out across chains.

pub mod adapter;
pub mod aggregator;
pub mod concentrated;
pub mod constant_product;
pub mod multicall;

pub use adapter::{DexAdapter, PoolQuote, TokenOnChain};
pub use aggregator::{DexAggregator, DexQuote};
pub use concentrated::ConcentratedLiquidityAdapter;
pub use constant_product::ConstantProductAdapter;
pub use multicall::{aggregate3, Call, MULTICALL3_ADDRESS};
