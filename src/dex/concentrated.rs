//! Concentrated-liquidity (Uniswap-V3-style) pool adapter.
//!
//! Quotes via the protocol's Quoter contract across the standard fee
//! tiers, batched into one Multicall3 round-trip with per-tier failure
//! tolerance (most pairs only deploy one or two tiers). The tier with the
//! largest output wins; the quoted price already reflects the impact of
//! the sized input, so bid == ask here and slippage is not re-applied.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::chains::{AdapterKind, ChainId};
use crate::contracts::IQuoter;
use crate::dex::adapter::{pow10, to_f64, DexAdapter, PoolQuote, TokenOnChain};
use crate::dex::multicall::{aggregate3, Call};
use crate::rate_limit::RateGovernor;
use crate::rpc::RpcManager;

/// Standard fee tiers: 0.05%, 0.30%, 1.00%.
pub const FEE_TIERS: [u32; 3] = [500, 3000, 10000];

pub struct ConcentratedLiquidityAdapter {
    name: String,
    chain: ChainId,
    quoter: Address,
    rpc: Arc<RpcManager>,
    governor: Arc<RateGovernor>,
}

impl ConcentratedLiquidityAdapter {
    pub fn new(
        name: impl Into<String>,
        chain: ChainId,
        quoter: Address,
        rpc: Arc<RpcManager>,
        governor: Arc<RateGovernor>,
    ) -> Self {
        Self {
            name: name.into(),
            chain,
            quoter,
            rpc,
            governor,
        }
    }
}

#[async_trait]
impl DexAdapter for ConcentratedLiquidityAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn chain(&self) -> ChainId {
        self.chain
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::ConcentratedLiquidity
    }

    fn encode_calls(
        &self,
        base: &TokenOnChain,
        quote: &TokenOnChain,
        amount_in: U256,
    ) -> Vec<Call> {
        FEE_TIERS
            .iter()
            .map(|&fee| Call {
                target: self.quoter,
                allow_failure: true,
                call_data: IQuoter::quoteExactInputSingleCall {
                    tokenIn: base.address,
                    tokenOut: quote.address,
                    amountIn: amount_in,
                    fee: alloy::primitives::Uint::from(fee),
                }
                .abi_encode()
                .into(),
            })
            .collect()
    }

    fn decode_result(
        &self,
        results: &[Option<Bytes>],
        base: &TokenOnChain,
        quote: &TokenOnChain,
        amount_in: U256,
    ) -> Option<PoolQuote> {
        let mut best_out = U256::ZERO;
        let mut best_fee = 0u32;

        for (i, result) in results.iter().enumerate() {
            let Some(raw) = result else { continue };
            let Ok(decoded) = IQuoter::quoteExactInputSingleCall::abi_decode_returns(raw) else {
                continue;
            };
            if decoded.amountOut > best_out {
                best_out = decoded.amountOut;
                best_fee = FEE_TIERS[i];
            }
        }

        if best_out.is_zero() {
            debug!(
                "{} {}/{}: no fee tier produced output",
                self.name, base.symbol, quote.symbol
            );
            return None;
        }

        let price = (to_f64(best_out) / pow10(quote.decimals))
            / (to_f64(amount_in) / pow10(base.decimals));
        if price <= 0.0 || !price.is_finite() || price > 1e12 {
            return None;
        }

        Some(PoolQuote {
            bid: price,
            ask: price,
            fee_percent: best_fee as f64 / 10_000.0,
        })
    }

    async fn quote(
        &self,
        base: &TokenOnChain,
        quote: &TokenOnChain,
        amount_in: U256,
    ) -> Result<Option<PoolQuote>> {
        self.governor
            .acquire(&format!("chain:{}", self.chain.name()))
            .await;

        let calls = self.encode_calls(base, quote, amount_in);
        let results = aggregate3(&self.rpc, self.chain, &calls).await?;

        Ok(self.decode_result(&results, base, quote, amount_in))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolValue;

    fn adapter() -> ConcentratedLiquidityAdapter {
        ConcentratedLiquidityAdapter::new(
            "Uniswap V3",
            ChainId::Ethereum,
            Address::ZERO,
            Arc::new(RpcManager::new()),
            Arc::new(RateGovernor::new()),
        )
    }

    fn token(symbol: &'static str, decimals: u8) -> TokenOnChain {
        TokenOnChain {
            symbol,
            address: Address::ZERO,
            decimals,
        }
    }

    fn encode_quoter_return(amount_out: U256) -> Bytes {
        // (amountOut, sqrtPriceX96After, ticksCrossed, gasEstimate)
        (
            amount_out,
            U256::ZERO,
            0u32,
            U256::ZERO,
        )
            .abi_encode()
            .into()
    }

    #[test]
    fn encodes_one_call_per_fee_tier() {
        let adapter = adapter();
        let calls = adapter.encode_calls(&token("ETH", 18), &token("USDT", 6), U256::from(1));
        assert_eq!(calls.len(), FEE_TIERS.len());
        assert!(calls.iter().all(|c| c.allow_failure));
    }

    #[test]
    fn best_tier_wins() {
        let adapter = adapter();
        let eth = token("ETH", 18);
        let usdt = token("USDT", 6);
        // 1 ETH in
        let amount_in = U256::from(10u128.pow(18));

        // 0.05% tier quotes 3000, 0.30% quotes 2990, 1% tier reverted
        let results = vec![
            Some(encode_quoter_return(U256::from(3_000_000_000u64))),
            Some(encode_quoter_return(U256::from(2_990_000_000u64))),
            None,
        ];

        let quote = adapter
            .decode_result(&results, &eth, &usdt, amount_in)
            .unwrap();
        assert!((quote.bid - 3000.0).abs() < 1e-6);
        assert_eq!(quote.bid, quote.ask);
        assert!((quote.fee_percent - 0.05).abs() < 1e-9);
    }

    #[test]
    fn all_tiers_failing_yields_none() {
        let adapter = adapter();
        let results = vec![None, None, None];
        assert!(adapter
            .decode_result(
                &results,
                &token("ETH", 18),
                &token("USDT", 6),
                U256::from(1)
            )
            .is_none());
    }

    #[test]
    fn zero_output_yields_none() {
        let adapter = adapter();
        let results = vec![Some(encode_quoter_return(U256::ZERO)), None, None];
        assert!(adapter
            .decode_result(
                &results,
                &token("ETH", 18),
                &token("USDT", 6),
                U256::from(10u128.pow(18))
            )
            .is_none());
    }
}
