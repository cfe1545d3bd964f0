//! Aggregates quotes from every DEX adapter across every chain.
//!
//! One task per (pair, adapter), bounded by a semaphore so a wide
//! universe cannot storm the public RPCs. Adapters that fail or time out
//! contribute nothing; the scan proceeds with whatever succeeded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::chains::{AdapterKind, ChainId, CHAINS};
use crate::config::tokens::{normalize_symbol, TokenRegistry};
use crate::dex::adapter::{DexAdapter, TokenOnChain};
use crate::dex::concentrated::ConcentratedLiquidityAdapter;
use crate::dex::constant_product::ConstantProductAdapter;
use crate::rate_limit::RateGovernor;
use crate::rpc::RpcManager;

/// Per-quote bundle timeout. Public RPCs need headroom but a stuck
/// endpoint must not stall the scan join point.
const QUOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// A DEX quote tagged with its pair and venue identity.
///
/// bid/ask are pre-fee; the engine folds the router fee in when the quote
/// enters the matrix.
#[derive(Debug, Clone)]
pub struct DexQuote {
    pub dex_name: String,
    pub chain: ChainId,
    pub kind: AdapterKind,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub fee_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl DexQuote {
    pub fn normalized_symbol(&self) -> String {
        format!(
            "{}/{}",
            normalize_symbol(&self.base_symbol),
            normalize_symbol(&self.quote_symbol)
        )
    }
}

pub struct DexAggregator {
    adapters: Vec<Arc<dyn DexAdapter>>,
    registry: Arc<TokenRegistry>,
    semaphore: Arc<Semaphore>,
    default_trade_size_usd: f64,
}

impl DexAggregator {
    /// Build adapter instances from the static chain tables. Routers with
    /// unparseable addresses are skipped with a warning rather than
    /// aborting startup.
    pub fn new(
        rpc: Arc<RpcManager>,
        governor: Arc<RateGovernor>,
        registry: Arc<TokenRegistry>,
        dex_concurrency: usize,
        default_trade_size_usd: f64,
    ) -> Self {
        let mut adapters: Vec<Arc<dyn DexAdapter>> = Vec::new();

        for chain in CHAINS {
            for router in chain.routers {
                let address = match router.address.parse() {
                    Ok(a) => a,
                    Err(e) => {
                        warn!(
                            "Skipping {} on {}: bad router address: {e}",
                            router.name, chain.name
                        );
                        continue;
                    }
                };
                match router.kind {
                    AdapterKind::ConstantProduct => {
                        adapters.push(Arc::new(ConstantProductAdapter::new(
                            router.name,
                            chain.chain_id,
                            address,
                            router.fee_percent,
                            Arc::clone(&rpc),
                            Arc::clone(&governor),
                        )));
                    }
                    AdapterKind::ConcentratedLiquidity => {
                        adapters.push(Arc::new(ConcentratedLiquidityAdapter::new(
                            router.name,
                            chain.chain_id,
                            address,
                            Arc::clone(&rpc),
                            Arc::clone(&governor),
                        )));
                    }
                }
            }
        }

        info!(
            "DEX aggregator ready: {} adapters across {} chains",
            adapters.len(),
            CHAINS.len()
        );

        Self {
            adapters,
            registry,
            semaphore: Arc::new(Semaphore::new(dex_concurrency.max(1))),
            default_trade_size_usd,
        }
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Resolve a token onto an adapter's chain, with per-chain decimal
    /// override applied.
    fn resolve(&self, symbol: &str, chain: ChainId) -> Option<TokenOnChain> {
        let token = self.registry.get(symbol)?;
        let address = token.address(chain)?.parse().ok()?;
        Some(TokenOnChain {
            symbol: token.symbol,
            address,
            decimals: token.decimals_on(chain),
        })
    }

    /// Size the quoting input to roughly the default trade value, floored
    /// to one whole base token so shallow prices never yield a zero call.
    fn sized_amount_in(&self, base: &TokenOnChain) -> U256 {
        let approx = self.registry.approx_price(base.symbol).max(1e-9);
        let target_units = self.default_trade_size_usd / approx;
        let raw = target_units * 10f64.powi(base.decimals as i32);

        if raw < 1.0 || !raw.is_finite() {
            U256::from(10u128.pow(base.decimals as u32))
        } else {
            U256::from(raw as u128)
        }
    }

    /// Fetch quotes for all pairs from all adapters concurrently.
    /// Returns normalized symbol -> quotes.
    pub async fn fetch_all(&self, pairs: &[(String, String)]) -> HashMap<String, Vec<DexQuote>> {
        let mut tasks = Vec::new();

        for (base_symbol, quote_symbol) in pairs {
            for adapter in &self.adapters {
                let chain = adapter.chain();
                let Some(base) = self.resolve(base_symbol, chain) else {
                    continue;
                };
                let Some(quote_token) = self.resolve(quote_symbol, chain) else {
                    continue;
                };

                let adapter = Arc::clone(adapter);
                let semaphore = Arc::clone(&self.semaphore);
                let amount_in = self.sized_amount_in(&base);

                tasks.push(async move {
                    let _permit = semaphore.acquire().await.ok()?;

                    let result =
                        tokio::time::timeout(QUOTE_TIMEOUT, adapter.quote(&base, &quote_token, amount_in))
                            .await;

                    match result {
                        Ok(Ok(Some(pool_quote))) => Some(DexQuote {
                            dex_name: adapter.name().to_string(),
                            chain,
                            kind: adapter.kind(),
                            base_symbol: base.symbol.to_string(),
                            quote_symbol: quote_token.symbol.to_string(),
                            bid: pool_quote.bid,
                            ask: pool_quote.ask,
                            fee_percent: pool_quote.fee_percent,
                            timestamp: Utc::now(),
                        }),
                        Ok(Ok(None)) => None,
                        Ok(Err(e)) => {
                            debug!(
                                "{} {}/{} quote failed: {e:#}",
                                adapter.name(),
                                base.symbol,
                                quote_token.symbol
                            );
                            None
                        }
                        Err(_) => {
                            debug!(
                                "{} {}/{} quote timed out",
                                adapter.name(),
                                base.symbol,
                                quote_token.symbol
                            );
                            None
                        }
                    }
                });
            }
        }

        let mut results: HashMap<String, Vec<DexQuote>> = HashMap::new();
        for quote in join_all(tasks).await.into_iter().flatten() {
            results.entry(quote.normalized_symbol()).or_default().push(quote);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;

    fn aggregator() -> DexAggregator {
        let settings = Settings::default();
        DexAggregator::new(
            Arc::new(RpcManager::new()),
            Arc::new(RateGovernor::new()),
            Arc::new(TokenRegistry::new()),
            settings.dex_concurrency,
            settings.default_trade_size_usd,
        )
    }

    #[test]
    fn adapters_built_from_chain_tables() {
        let aggregator = aggregator();
        // Every chain carries at least one router in the static table
        assert!(aggregator.adapter_count() >= CHAINS.len());
    }

    #[test]
    fn resolve_skips_chains_without_the_token() {
        let aggregator = aggregator();
        // ARB only exists on Arbitrum
        assert!(aggregator.resolve("ARB", ChainId::Arbitrum).is_some());
        assert!(aggregator.resolve("ARB", ChainId::Polygon).is_none());
    }

    #[test]
    fn sizing_targets_default_trade_value() {
        let aggregator = aggregator();
        let eth = aggregator.resolve("ETH", ChainId::Ethereum).unwrap();

        // ~1000 USD of ETH at the 3000 seed price = 1/3 ETH
        let amount = aggregator.sized_amount_in(&eth);
        let units = u128::try_from(amount).unwrap() as f64 / 1e18;
        assert!((units - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn sizing_floors_at_one_whole_token() {
        let aggregator = aggregator();
        // Fake an absurdly high price so the sized amount rounds to zero
        aggregator.registry.set_approx_price("BTC", 1e30);
        let btc = aggregator.resolve("BTC", ChainId::Ethereum).unwrap();

        let amount = aggregator.sized_amount_in(&btc);
        assert_eq!(u128::try_from(amount).unwrap(), 10u128.pow(8));
    }

    #[test]
    fn normalized_symbol_collapses_wrapped() {
        let quote = DexQuote {
            dex_name: "QuickSwap".into(),
            chain: ChainId::Polygon,
            kind: AdapterKind::ConstantProduct,
            base_symbol: "WETH".into(),
            quote_symbol: "USDT".into(),
            bid: 3000.0,
            ask: 3001.0,
            fee_percent: 0.3,
            timestamp: Utc::now(),
        };
        assert_eq!(quote.normalized_symbol(), "ETH/USDT");
    }
}
