//! Per-chain swap gas cost estimation in USD.
//!
//! Samples the current gas price, multiplies by the reference gas of a
//! representative swap, and converts through the chain's native-token USD
//! price (sourced from the CEX layer with static fallbacks). Rollups get
//! a flat safety multiplier for the unmodeled L1 data component.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cex::rest::RestFetcher;
use crate::config::chains::{ChainId, CHAINS};
use crate::rate_limit::RateGovernor;
use crate::rpc::RpcManager;

/// Reference gas use of one swap.
const V2_SWAP_GAS: f64 = 150_000.0;
const V3_SWAP_GAS: f64 = 180_000.0;

/// Buffer on rollups for L1 data-blob fees the gas price misses.
const ROLLUP_SAFETY_FACTOR: f64 = 1.5;

/// Umbrella timeout across all chains; slow chains yield a partial map.
const ESTIMATE_ALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Gas cost estimate for one chain.
#[derive(Debug, Clone, Copy)]
pub struct GasEstimate {
    pub chain_id: ChainId,
    pub gas_price_gwei: f64,
    pub native_token_price_usd: f64,
    /// One constant-product swap
    pub swap_cost_usd: f64,
    /// One concentrated-liquidity swap
    pub v3_swap_cost_usd: f64,
}

/// Conservative static prices when the CEX layer has nothing fresher.
fn fallback_native_price(symbol: &str) -> f64 {
    match symbol {
        "ETH" => 3000.0,
        "BNB" => 500.0,
        "MATIC" => 0.80,
        "AVAX" => 40.0,
        "FTM" => 0.50,
        "CRO" => 0.15,
        "GLMR" => 0.40,
        "CELO" => 0.80,
        "KAVA" => 0.70,
        "xDAI" => 1.0,
        _ => 40.0,
    }
}

pub struct GasEstimator {
    rpc: Arc<RpcManager>,
    governor: Arc<RateGovernor>,
    native_prices: DashMap<&'static str, f64>,
}

impl GasEstimator {
    pub fn new(rpc: Arc<RpcManager>, governor: Arc<RateGovernor>) -> Self {
        Self {
            rpc,
            governor,
            native_prices: DashMap::new(),
        }
    }

    /// Refresh native-token USD prices from CEX mids: the primary venue's
    /// USDT market first, then a USDC fallback, then the static table.
    pub async fn update_native_prices(&self, rest: &RestFetcher) {
        let mut symbols: Vec<&'static str> = CHAINS.iter().map(|c| c.native_token).collect();
        symbols.sort_unstable();
        symbols.dedup();

        let tasks: Vec<_> = symbols
            .into_iter()
            .map(|symbol| async move {
                let price = match rest.fetch_mid("binance", symbol, "USDT").await {
                    Some(mid) => mid,
                    None => match rest.fetch_mid("okx", symbol, "USDC").await {
                        Some(mid) => mid,
                        None => fallback_native_price(symbol),
                    },
                };
                (symbol, price)
            })
            .collect();

        for (symbol, price) in join_all(tasks).await {
            if price > 0.0 {
                debug!("Native price {symbol}: ${price:.2}");
                self.native_prices.insert(symbol, price);
            }
        }
    }

    fn native_price(&self, symbol: &'static str) -> f64 {
        self.native_prices
            .get(symbol)
            .map(|p| *p)
            .unwrap_or_else(|| fallback_native_price(symbol))
    }

    /// Estimate swap costs for one chain. `None` when gas-price sampling
    /// fails on every endpoint; the engine substitutes its fallback table.
    pub async fn estimate(&self, chain_id: ChainId) -> Option<GasEstimate> {
        let chain = crate::config::chains::chain(chain_id);

        self.governor
            .acquire(&format!("chain:{}", chain.name))
            .await;

        let gas_price_wei = match self.rpc.gas_price(chain_id).await {
            Ok(price) => price as f64,
            Err(e) => {
                debug!("Gas price sampling failed for {}: {e}", chain.name);
                return None;
            }
        };
        let gas_price_gwei = gas_price_wei / 1e9;
        let native_price = self.native_price(chain.native_token);

        // gas * gwei / 1e9 = native units, then into USD
        let mut swap_cost_usd = V2_SWAP_GAS * gas_price_gwei / 1e9 * native_price;
        let mut v3_swap_cost_usd = V3_SWAP_GAS * gas_price_gwei / 1e9 * native_price;

        if chain_id.is_rollup() {
            swap_cost_usd *= ROLLUP_SAFETY_FACTOR;
            v3_swap_cost_usd *= ROLLUP_SAFETY_FACTOR;
        }

        Some(GasEstimate {
            chain_id,
            gas_price_gwei,
            native_token_price_usd: native_price,
            swap_cost_usd,
            v3_swap_cost_usd,
        })
    }

    /// Estimates for every chain, bounded by an umbrella timeout. Chains
    /// that miss the window are simply absent from the map.
    pub async fn estimate_all(&self) -> HashMap<ChainId, GasEstimate> {
        let results = Arc::new(Mutex::new(HashMap::new()));

        let tasks: Vec<_> = CHAINS
            .iter()
            .map(|chain| {
                let results = Arc::clone(&results);
                async move {
                    if let Some(estimate) = self.estimate(chain.chain_id).await {
                        results.lock().await.insert(chain.chain_id, estimate);
                    }
                }
            })
            .collect();

        if tokio::time::timeout(ESTIMATE_ALL_TIMEOUT, join_all(tasks))
            .await
            .is_err()
        {
            warn!("Gas estimation timed out; continuing with partial results");
        }

        let map = results.lock().await.clone();
        debug!("Gas estimates for {}/{} chains", map.len(), CHAINS.len());
        map
    }
}

/// Conservative per-chain swap cost when live estimation failed.
pub fn fallback_swap_cost_usd(chain_id: ChainId) -> f64 {
    match chain_id {
        ChainId::Ethereum => 25.0,
        ChainId::Bsc => 0.30,
        _ if chain_id.is_rollup() => 0.50,
        ChainId::Polygon | ChainId::Avalanche | ChainId::Fantom => 0.10,
        _ => 0.20,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_costs_rank_sensibly() {
        assert_eq!(fallback_swap_cost_usd(ChainId::Ethereum), 25.0);
        assert_eq!(fallback_swap_cost_usd(ChainId::Arbitrum), 0.50);
        assert_eq!(fallback_swap_cost_usd(ChainId::Polygon), 0.10);
        assert_eq!(fallback_swap_cost_usd(ChainId::Gnosis), 0.20);
    }

    #[test]
    fn fallback_native_prices_cover_all_chains() {
        for chain in CHAINS {
            assert!(fallback_native_price(chain.native_token) > 0.0);
        }
    }

    #[test]
    fn cost_math_and_rollup_factor() {
        // 30 gwei on Ethereum at $3000: 150k gas = 150000*30/1e9*3000 = $13.5
        let cost = V2_SWAP_GAS * 30.0 / 1e9 * 3000.0;
        assert!((cost - 13.5).abs() < 1e-9);

        // Same numbers on a rollup carry the 1.5x data-fee buffer
        assert!((cost * ROLLUP_SAFETY_FACTOR - 20.25).abs() < 1e-9);
    }
}
