//! The adapter capability set every DEX protocol implements.

use alloy::primitives::{Address, Bytes, U256};
use anyhow::Result;
use async_trait::async_trait;

use crate::config::chains::{AdapterKind, ChainId};
use crate::dex::multicall::Call;

/// A token resolved onto a specific chain.
#[derive(Debug, Clone, Copy)]
pub struct TokenOnChain {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
}

/// Raw bid/ask produced by one adapter for one pair.
///
/// Prices are decimal-adjusted quote-per-base. The router fee is NOT yet
/// folded in; the scan engine applies it symmetrically when the quote
/// enters the price matrix.
#[derive(Debug, Clone, Copy)]
pub struct PoolQuote {
    pub bid: f64,
    pub ask: f64,
    /// Swap fee percentage (constant-product: the router's fixed fee;
    /// concentrated: the winning fee tier)
    pub fee_percent: f64,
}

/// One router (or quoter) on one chain.
///
/// `encode_calls`/`decode_result` expose the multicall wire format so
/// batches can be assembled and unpacked without touching adapter state;
/// `quote` is the full path including cached-address resolution.
#[async_trait]
pub trait DexAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn chain(&self) -> ChainId;
    fn kind(&self) -> AdapterKind;

    /// Encode the view calls needed to price `amount_in` of base in quote
    /// units. May return no calls when a prerequisite (e.g. the pair
    /// address) has not been resolved yet.
    fn encode_calls(&self, base: &TokenOnChain, quote: &TokenOnChain, amount_in: U256)
        -> Vec<Call>;

    /// Decode a multicall result slice (aligned with `encode_calls`
    /// output) into a quote. `None` when the pool cannot be priced.
    fn decode_result(
        &self,
        results: &[Option<Bytes>],
        base: &TokenOnChain,
        quote: &TokenOnChain,
        amount_in: U256,
    ) -> Option<PoolQuote>;

    /// Produce a bid/ask for the pair, or `None` when the pool does not
    /// exist, is below the liquidity floor, or cannot be priced.
    async fn quote(
        &self,
        base: &TokenOnChain,
        quote: &TokenOnChain,
        amount_in: U256,
    ) -> Result<Option<PoolQuote>>;
}

/// Lossless enough for price math: reserves are uint112 and sized trade
/// amounts fit u128 comfortably.
pub(crate) fn to_f64(value: U256) -> f64 {
    match u128::try_from(value) {
        Ok(v) => v as f64,
        Err(_) => f64::MAX,
    }
}

/// Decimal scale factor, e.g. `pow10(6)` = 1e6.
pub(crate) fn pow10(decimals: u8) -> f64 {
    10f64.powi(decimals as i32)
}
