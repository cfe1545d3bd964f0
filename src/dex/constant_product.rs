//! Constant-product (Uniswap-V2-style) pool adapter.
//!
//! Spot price comes from the decimal-adjusted reserve ratio rather than a
//! 1-unit `getAmountsOut`, which distorts in shallow pools. Slippage for
//! the sized trade is applied symmetrically with the constant-product
//! impact rule. Pair and token0 addresses are cached after the first
//! factory lookup; reserves are fetched fresh every scan.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::chains::{AdapterKind, ChainId};
use crate::contracts::{IUniswapV2Factory, IUniswapV2Pair, IUniswapV2Router};
use crate::dex::adapter::{pow10, to_f64, DexAdapter, PoolQuote, TokenOnChain};
use crate::dex::multicall::{aggregate3, Call};
use crate::rate_limit::RateGovernor;
use crate::rpc::RpcManager;

/// Minimum output-side reserves for a pool to be quotable, measured in
/// whole quote tokens. Shallow pools produce phantom spreads.
const MIN_RESERVE_STABLE_QUOTE: f64 = 10_000.0;
const MIN_RESERVE_NATIVE_QUOTE: f64 = 2.0;

fn is_native_quote(symbol: &str) -> bool {
    matches!(symbol, "ETH" | "WETH" | "BTC" | "WBTC" | "BNB" | "WBNB")
}

/// Cached pair resolution: pool address plus its token0 for reserve
/// ordering.
#[derive(Debug, Clone, Copy)]
struct PairInfo {
    pair: Address,
    token0: Address,
}

pub struct ConstantProductAdapter {
    name: String,
    chain: ChainId,
    router: Address,
    fee_percent: f64,
    rpc: Arc<RpcManager>,
    governor: Arc<RateGovernor>,
    factory: OnceCell<Address>,
    /// (tokenA, tokenB) -> pair info, process lifetime. Key is
    /// direction-insensitive (sorted).
    pair_cache: DashMap<(Address, Address), PairInfo>,
}

impl ConstantProductAdapter {
    pub fn new(
        name: impl Into<String>,
        chain: ChainId,
        router: Address,
        fee_percent: f64,
        rpc: Arc<RpcManager>,
        governor: Arc<RateGovernor>,
    ) -> Self {
        Self {
            name: name.into(),
            chain,
            router,
            fee_percent,
            rpc,
            governor,
            factory: OnceCell::new(),
            pair_cache: DashMap::new(),
        }
    }

    fn cache_key(a: Address, b: Address) -> (Address, Address) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    async fn factory_address(&self) -> Result<Address> {
        self.factory
            .get_or_try_init(|| async {
                let calldata = IUniswapV2Router::factoryCall {}.abi_encode();
                let raw = self
                    .rpc
                    .call_raw(self.chain, self.router, calldata.into())
                    .await
                    .context("factory() call failed")?;
                IUniswapV2Router::factoryCall::abi_decode_returns(&raw)
                    .context("factory() decode failed")
            })
            .await
            .map(|a| *a)
    }

    /// Resolve and cache the pair address and its token0.
    async fn pair_info(&self, token_a: Address, token_b: Address) -> Result<Option<PairInfo>> {
        let key = Self::cache_key(token_a, token_b);
        if let Some(info) = self.pair_cache.get(&key) {
            return Ok(Some(*info));
        }

        self.governor
            .acquire(&format!("chain:{}", self.chain.name()))
            .await;

        let factory = self.factory_address().await?;
        let calldata = IUniswapV2Factory::getPairCall {
            tokenA: token_a,
            tokenB: token_b,
        }
        .abi_encode();
        let raw = self
            .rpc
            .call_raw(self.chain, factory, calldata.into())
            .await
            .context("getPair call failed")?;
        let pair = IUniswapV2Factory::getPairCall::abi_decode_returns(&raw)
            .context("getPair decode failed")?;

        if pair == Address::ZERO {
            return Ok(None);
        }

        let calldata = IUniswapV2Pair::token0Call {}.abi_encode();
        let raw = self
            .rpc
            .call_raw(self.chain, pair, calldata.into())
            .await
            .context("token0 call failed")?;
        let token0 = IUniswapV2Pair::token0Call::abi_decode_returns(&raw)
            .context("token0 decode failed")?;

        let info = PairInfo { pair, token0 };
        self.pair_cache.insert(key, info);
        Ok(Some(info))
    }

    /// Reserves ordered as (base side, quote side).
    pub async fn get_reserves(
        &self,
        base: &TokenOnChain,
        quote: &TokenOnChain,
    ) -> Result<Option<(U256, U256)>> {
        let Some(info) = self.pair_info(base.address, quote.address).await? else {
            return Ok(None);
        };

        self.governor
            .acquire(&format!("chain:{}", self.chain.name()))
            .await;

        let calldata = IUniswapV2Pair::getReservesCall {}.abi_encode();
        let raw = self
            .rpc
            .call_raw(self.chain, info.pair, calldata.into())
            .await
            .context("getReserves call failed")?;
        let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(&raw)
            .context("getReserves decode failed")?;

        let (r0, r1) = (
            reserves.reserve0.to::<U256>(),
            reserves.reserve1.to::<U256>(),
        );
        if info.token0 == base.address {
            Ok(Some((r0, r1)))
        } else {
            Ok(Some((r1, r0)))
        }
    }

    /// Price the pair from raw reserves. Exposed for decode_result and
    /// direct testing; pure math, no I/O.
    fn quote_from_reserves(
        &self,
        reserve_base: U256,
        reserve_quote: U256,
        base: &TokenOnChain,
        quote: &TokenOnChain,
        amount_in: U256,
    ) -> Option<PoolQuote> {
        if reserve_base.is_zero() || reserve_quote.is_zero() {
            return None;
        }

        // Liquidity floor on the output side, in whole quote tokens
        let quote_reserve_units = to_f64(reserve_quote) / pow10(quote.decimals);
        let floor = if is_native_quote(quote.symbol) {
            MIN_RESERVE_NATIVE_QUOTE
        } else {
            MIN_RESERVE_STABLE_QUOTE
        };
        if quote_reserve_units < floor {
            debug!(
                "{} {}/{}: reserves below liquidity floor ({:.2} < {})",
                self.name, base.symbol, quote.symbol, quote_reserve_units, floor
            );
            return None;
        }

        let spot = (to_f64(reserve_quote) / pow10(quote.decimals))
            / (to_f64(reserve_base) / pow10(base.decimals));
        if spot <= 0.0 || !spot.is_finite() {
            return None;
        }

        // Constant-product impact of the sized trade
        let amount = to_f64(amount_in);
        let impact = amount / (to_f64(reserve_base) + amount);

        let bid = spot * (1.0 - impact);
        let ask = spot * (1.0 + impact);
        if bid <= 0.0 || ask <= 0.0 || bid > 1e12 {
            return None;
        }

        Some(PoolQuote {
            bid,
            ask,
            fee_percent: self.fee_percent,
        })
    }
}

#[async_trait]
impl DexAdapter for ConstantProductAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn chain(&self) -> ChainId {
        self.chain
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::ConstantProduct
    }

    fn encode_calls(
        &self,
        base: &TokenOnChain,
        quote: &TokenOnChain,
        _amount_in: U256,
    ) -> Vec<Call> {
        // Reserves are the only per-scan fetch; pair resolution happens
        // out-of-band and is cached. Unresolved pairs encode nothing.
        let key = Self::cache_key(base.address, quote.address);
        let Some(info) = self.pair_cache.get(&key) else {
            return Vec::new();
        };
        vec![Call {
            target: info.pair,
            allow_failure: true,
            call_data: IUniswapV2Pair::getReservesCall {}.abi_encode().into(),
        }]
    }

    fn decode_result(
        &self,
        results: &[Option<Bytes>],
        base: &TokenOnChain,
        quote: &TokenOnChain,
        amount_in: U256,
    ) -> Option<PoolQuote> {
        let raw = results.first()?.as_ref()?;
        let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(raw).ok()?;

        let key = Self::cache_key(base.address, quote.address);
        let info = self.pair_cache.get(&key)?;

        let (r0, r1) = (
            reserves.reserve0.to::<U256>(),
            reserves.reserve1.to::<U256>(),
        );
        let (reserve_base, reserve_quote) = if info.token0 == base.address {
            (r0, r1)
        } else {
            (r1, r0)
        };

        self.quote_from_reserves(reserve_base, reserve_quote, base, quote, amount_in)
    }

    async fn quote(
        &self,
        base: &TokenOnChain,
        quote: &TokenOnChain,
        amount_in: U256,
    ) -> Result<Option<PoolQuote>> {
        // Warm the pair cache, then run the per-scan reserve fetch through
        // the batcher so sub-call failure semantics match the batch path.
        if self.pair_info(base.address, quote.address).await?.is_none() {
            return Ok(None);
        }

        let calls = self.encode_calls(base, quote, amount_in);
        if calls.is_empty() {
            return Ok(None);
        }

        self.governor
            .acquire(&format!("chain:{}", self.chain.name()))
            .await;
        let results = aggregate3(&self.rpc, self.chain, &calls).await?;

        Ok(self.decode_result(&results, base, quote, amount_in))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> ConstantProductAdapter {
        ConstantProductAdapter::new(
            "QuickSwap",
            ChainId::Polygon,
            Address::ZERO,
            0.3,
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

    #[test]
    fn spot_from_reserves_is_decimal_adjusted() {
        let adapter = adapter();
        let eth = token("ETH", 18);
        let usdt = token("USDT", 6);

        // 1000 ETH vs 3,000,000 USDT -> spot 3000
        let reserve_base = U256::from(10u128.pow(18) * 1000);
        let reserve_quote = U256::from(10u128.pow(6) * 3_000_000);
        // Negligible trade size -> bid/ask straddle spot tightly
        let amount_in = U256::from(10u128.pow(12));

        let quote = adapter
            .quote_from_reserves(reserve_base, reserve_quote, &eth, &usdt, amount_in)
            .unwrap();
        let mid = (quote.bid + quote.ask) / 2.0;
        assert!((mid - 3000.0).abs() < 0.01);
        assert!(quote.bid < quote.ask);
        assert_eq!(quote.fee_percent, 0.3);
    }

    #[test]
    fn impact_is_symmetric_around_spot() {
        let adapter = adapter();
        let eth = token("ETH", 18);
        let usdt = token("USDT", 6);

        let reserve_base = U256::from(10u128.pow(18) * 1000);
        let reserve_quote = U256::from(10u128.pow(6) * 3_000_000);
        // Trade 1 ETH into 1000 ETH of reserves -> impact ~= 1/1001
        let amount_in = U256::from(10u128.pow(18));

        let quote = adapter
            .quote_from_reserves(reserve_base, reserve_quote, &eth, &usdt, amount_in)
            .unwrap();

        let spot = 3000.0;
        let impact = 1.0 / 1001.0;
        assert!((quote.bid - spot * (1.0 - impact)).abs() < 0.01);
        assert!((quote.ask - spot * (1.0 + impact)).abs() < 0.01);
    }

    #[test]
    fn shallow_stable_pool_is_rejected() {
        let adapter = adapter();
        let eth = token("ETH", 18);
        let usdt = token("USDT", 6);

        // Only 5k USDT on the output side, below the 10k floor
        let reserve_base = U256::from(10u128.pow(18) * 2);
        let reserve_quote = U256::from(10u128.pow(6) * 5_000);
        let amount_in = U256::from(10u128.pow(18));

        assert!(adapter
            .quote_from_reserves(reserve_base, reserve_quote, &eth, &usdt, amount_in)
            .is_none());
    }

    #[test]
    fn native_quote_uses_small_floor() {
        let adapter = adapter();
        let link = token("LINK", 18);
        let eth = token("ETH", 18);

        // 5 ETH of output reserves passes the native floor of 2
        let reserve_base = U256::from(10u128.pow(18) * 1000);
        let reserve_quote = U256::from(10u128.pow(18) * 5);
        let amount_in = U256::from(10u128.pow(18));

        assert!(adapter
            .quote_from_reserves(reserve_base, reserve_quote, &link, &eth, amount_in)
            .is_some());
    }

    #[test]
    fn empty_pool_is_rejected() {
        let adapter = adapter();
        let eth = token("ETH", 18);
        let usdt = token("USDT", 6);

        assert!(adapter
            .quote_from_reserves(U256::ZERO, U256::ZERO, &eth, &usdt, U256::from(1))
            .is_none());
    }
}
