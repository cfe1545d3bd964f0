//! Scan orchestration: one `scan()` fans out CEX REST, DEX, and gas
//! fetches concurrently, merges streamed quotes, filters for reliability,
//! builds the unified price matrix, and enumerates profitable directed
//! pairs net of costs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::cex::rest::RestFetcher;
use crate::cex::stream::StreamSubscriber;
use crate::config::chains::ChainId;
use crate::config::fees::withdrawal_fee_usd;
use crate::config::settings::{ProfitTier, Settings};
use crate::config::tokens::{normalize_symbol, TokenRegistry, TOKENS, TRADING_PAIRS};
use crate::config::EXCHANGES;
use crate::dex::aggregator::{DexAggregator, DexQuote};
use crate::gas::{fallback_swap_cost_usd, GasEstimate, GasEstimator};
use crate::rate_limit::RateGovernor;
use crate::rpc::RpcManager;
use crate::triangular::TriangularStrategy;
use crate::types::{Opportunity, PriceMatrix, Quote, Venue};

/// Backoff after a failed scan; the loop never exits on scan failure.
const SCAN_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Flat CEX taker fee applied per CEX side of a trade.
const CEX_TRADING_FEE: f64 = 0.001;

/// Average CEX-to-CEX transfer cost.
const CEX_BRIDGE_FEE_USD: f64 = 5.0;

/// Spreads beyond this are bad data, not opportunities.
const MAX_SPREAD_PCT: f64 = 100.0;

pub struct ScanEngine {
    settings: Settings,
    registry: Arc<TokenRegistry>,
    rest: Arc<RestFetcher>,
    stream: StreamSubscriber,
    dex: DexAggregator,
    gas: GasEstimator,
    triangular: TriangularStrategy,

    universe: Vec<(String, String)>,
    last_harvest: Option<Instant>,
    triangular_opps: Vec<crate::types::TriangularOpportunity>,
}

impl ScanEngine {
    /// Bring up every collaborator: venue handshakes, the initial market
    /// harvest, stream subscriptions, DEX adapters. Venues and chains
    /// that fail to come up are logged and omitted; the scan always
    /// runs with whatever subset succeeded.
    pub async fn initialize(settings: Settings) -> Result<Self> {
        info!("Initializing scan engine...");

        let governor = Arc::new(RateGovernor::new());
        let rpc = Arc::new(RpcManager::new());
        let registry = Arc::new(TokenRegistry::new());

        let mut rest = RestFetcher::new(Arc::clone(&governor));
        rest.initialize().await;
        let rest = Arc::new(rest);

        // Initial harvest seeds the universe before streams subscribe
        let universe = harvest_universe(&rest, &settings);
        info!("Scanning {} pairs", universe.len());

        // Stream the top of the universe on the top-tier venues; REST
        // covers everything past the cap
        let mut stream = StreamSubscriber::new();
        let streamed_slice =
            &universe[..universe.len().min(settings.stream_symbol_cap)];
        let mut watch_lists = HashMap::new();
        for exchange in EXCHANGES.iter().filter(|e| e.streamed) {
            let resolved = rest.resolve_for_venue(exchange.id, streamed_slice);
            if !resolved.is_empty() {
                watch_lists.insert(exchange.id, resolved);
            }
        }
        stream.start(watch_lists);

        let dex = DexAggregator::new(
            Arc::clone(&rpc),
            Arc::clone(&governor),
            Arc::clone(&registry),
            settings.dex_concurrency,
            settings.default_trade_size_usd,
        );
        let gas = GasEstimator::new(Arc::clone(&rpc), Arc::clone(&governor));

        info!("Scan engine ready");

        Ok(Self {
            settings,
            registry,
            rest,
            stream,
            dex,
            gas,
            triangular: TriangularStrategy::new(),
            universe,
            last_harvest: Some(Instant::now()),
            triangular_opps: Vec::new(),
        })
    }

    /// Triangular results from the most recent scan.
    pub fn triangular_opportunities(&self) -> &[crate::types::TriangularOpportunity] {
        &self.triangular_opps
    }

    /// One full scan across all sources.
    pub async fn scan(&mut self) -> Result<Vec<Opportunity>> {
        let scan_start = Instant::now();

        // 1. Universe refresh on the harvest interval
        let needs_harvest = self
            .last_harvest
            .map(|at| at.elapsed().as_secs_f64() > self.settings.harvest_interval_secs)
            .unwrap_or(true);
        if needs_harvest {
            self.universe = harvest_universe(&self.rest, &self.settings);
            self.last_harvest = Some(Instant::now());
            info!("Universe refreshed: {} pairs", self.universe.len());
        }

        // DEX fetches only make sense for pairs with token mappings
        let dex_pairs: Vec<(String, String)> = self
            .universe
            .iter()
            .filter(|(base, quote)| {
                self.registry.get(base).is_some() && self.registry.get(quote).is_some()
            })
            .cloned()
            .collect();

        let excluded: HashSet<String> = self
            .stream
            .active_venues()
            .iter()
            .map(|v| v.to_string())
            .collect();

        // 2. Concurrent fetch: REST CEX (minus streamed venues), DEX, gas
        let (mut cex_quotes, dex_quotes, gas_estimates) = tokio::join!(
            self.rest.fetch_all(&self.universe, &excluded),
            self.dex.fetch_all(&dex_pairs),
            async {
                self.gas.update_native_prices(&self.rest).await;
                self.gas.estimate_all().await
            }
        );

        // 3. Merge the latest streamed quotes into the CEX snapshot
        for venue_id in self.stream.active_venues() {
            for (base, quote) in &self.universe {
                let symbol = format!(
                    "{}/{}",
                    normalize_symbol(base),
                    normalize_symbol(quote)
                );
                if let Some(ws_quote) = self.stream.latest(venue_id, &symbol) {
                    cex_quotes.entry(symbol).or_default().push(ws_quote);
                }
            }
        }

        // 4. Refresh approximate USD prices for next scan's DEX sizing
        refresh_approx_prices(&self.registry, &cex_quotes);

        // 5. Triangular strategy on the same CEX snapshot
        self.triangular_opps = self.triangular.find_opportunities(&cex_quotes);
        if !self.triangular_opps.is_empty() {
            info!(
                "Found {} triangular opportunities",
                self.triangular_opps.len()
            );
        }

        // 6.-8. Filter, enumerate, cost
        let now = Utc::now();
        let matrix = build_matrix(&self.settings, cex_quotes, dex_quotes, now);
        let source_count: usize = matrix.values().map(|quotes| quotes.len()).sum();
        let opportunities = find_opportunities(&self.settings, &gas_estimates, &matrix, now);

        info!(
            "Scan complete in {:.2}s: {} sources, {} opportunities",
            scan_start.elapsed().as_secs_f64(),
            source_count,
            opportunities.len()
        );

        Ok(opportunities)
    }

    /// Scan forever. `on_start` fires before each scan, `on_tick` gets
    /// the sorted opportunities after. Scan failures log and back off 5s;
    /// cancellation (dropping the future) unwinds outstanding fetches and
    /// the subscriber tasks.
    pub async fn run_continuous<S, T>(&mut self, mut on_start: S, mut on_tick: T)
    where
        S: FnMut(),
        T: FnMut(&[Opportunity]),
    {
        let interval = Duration::from_secs_f64(self.settings.scan_interval_secs);
        loop {
            on_start();
            match self.scan().await {
                Ok(opportunities) => {
                    on_tick(&opportunities);
                    tokio::time::sleep(interval).await;
                }
                Err(e) => {
                    error!("Scan error: {e:#}");
                    tokio::time::sleep(SCAN_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

/// Seed pairs plus everything the harvester found, most-listed first so a
/// downstream cap keeps the widely traded names.
fn harvest_universe(rest: &RestFetcher, settings: &Settings) -> Vec<(String, String)> {
    let mut universe: Vec<(String, String)> = TRADING_PAIRS
        .iter()
        .map(|(base, quote)| (base.to_string(), quote.to_string()))
        .collect();
    let mut seen: HashSet<(String, String)> = universe.iter().cloned().collect();

    for pair in rest.harvest(settings.harvest_min_venues) {
        if seen.insert(pair.clone()) {
            universe.push(pair);
        }
    }
    universe
}

/// Update token sizing prices from averaged CEX mids of their stablecoin
/// markets.
fn refresh_approx_prices(registry: &TokenRegistry, cex_quotes: &HashMap<String, Vec<Quote>>) {
    let mut mids: HashMap<&str, f64> = HashMap::new();
    for (symbol, quotes) in cex_quotes {
        let valid: Vec<f64> = quotes.iter().map(Quote::mid).filter(|m| *m > 0.0).collect();
        if !valid.is_empty() {
            mids.insert(symbol.as_str(), valid.iter().sum::<f64>() / valid.len() as f64);
        }
    }

    let mut updated = 0;
    for token in TOKENS {
        for pair in [
            format!("{}/USDT", token.symbol),
            format!("{}/USDC", token.symbol),
        ] {
            if let Some(mid) = mids.get(pair.as_str()) {
                registry.set_approx_price(token.symbol, *mid);
                updated += 1;
                break;
            }
        }
    }
    if updated > 0 {
        debug!("Updated {updated} token prices from CEX data");
    }
}

/// Build the unified matrix, applying the reliability filter. CEX quotes
/// pass through as-is; DEX quotes get the router fee folded symmetrically
/// around the pool price. Missing fields never cause a drop on their own.
pub(crate) fn build_matrix(
    settings: &Settings,
    cex_quotes: HashMap<String, Vec<Quote>>,
    dex_quotes: HashMap<String, Vec<DexQuote>>,
    now: DateTime<Utc>,
) -> PriceMatrix {
    let mut matrix: PriceMatrix = HashMap::new();

    for (symbol, quotes) in cex_quotes {
        let entry = matrix.entry(symbol).or_default();
        for quote in quotes {
            let age = quote.age_secs(now);
            if age > settings.cex_stale_secs {
                debug!("Dropping stale CEX quote from {} ({age:.0}s)", quote.venue);
                continue;
            }
            if let Some(volume) = quote.volume_24h {
                if volume < settings.min_volume_24h_usd {
                    debug!(
                        "Dropping zombie pair on {} (24h volume ${volume:.0})",
                        quote.venue
                    );
                    continue;
                }
            }
            entry.push(quote);
        }
    }

    for (symbol, quotes) in dex_quotes {
        let entry = matrix.entry(symbol).or_default();
        for quote in quotes {
            let age = (now - quote.timestamp).num_milliseconds() as f64 / 1000.0;
            if age > settings.dex_stale_secs {
                debug!(
                    "Dropping stale DEX quote from {}@{} ({age:.0}s)",
                    quote.dex_name, quote.chain
                );
                continue;
            }

            let fee_fraction = quote.fee_percent / 100.0;
            entry.push(Quote {
                venue: Venue::Dex {
                    venue: quote.dex_name,
                    chain: quote.chain,
                    kind: quote.kind,
                    fee_percent: quote.fee_percent,
                },
                bid: quote.bid * (1.0 - fee_fraction),
                ask: quote.ask * (1.0 + fee_fraction),
                timestamp: quote.timestamp,
                volume_24h: None,
            });
        }
    }

    matrix.retain(|_, quotes| !quotes.is_empty());
    matrix
}

/// Gas contribution of one trade: per-DEX-side chain swap cost (by pool
/// kind, falling back to the conservative table) plus the flat trading
/// fee per CEX side.
fn trade_gas_cost(
    settings: &Settings,
    gas_estimates: &HashMap<ChainId, GasEstimate>,
    buy: &Venue,
    sell: &Venue,
) -> f64 {
    let mut cost = 0.0;
    for venue in [buy, sell] {
        match venue {
            Venue::Dex { chain, kind, .. } => {
                cost += gas_estimates
                    .get(chain)
                    .map(|estimate| match kind {
                        crate::config::chains::AdapterKind::ConstantProduct => {
                            estimate.swap_cost_usd
                        }
                        crate::config::chains::AdapterKind::ConcentratedLiquidity => {
                            estimate.v3_swap_cost_usd
                        }
                    })
                    .unwrap_or_else(|| fallback_swap_cost_usd(*chain));
            }
            Venue::Cex { .. } => {
                cost += settings.default_trade_size_usd * CEX_TRADING_FEE;
            }
        }
    }
    cost
}

/// Withdrawal fee: only funds leaving a CEX cost anything. CEX->DEX pays
/// the destination chain's fee; CEX->CEX pays the average bridge fee.
fn trade_withdrawal_fee(buy: &Venue, sell: &Venue) -> f64 {
    match (buy, sell) {
        (Venue::Cex { .. }, Venue::Dex { .. }) => withdrawal_fee_usd(sell.chain()),
        (Venue::Cex { .. }, Venue::Cex { .. }) => CEX_BRIDGE_FEE_USD,
        _ => 0.0,
    }
}

/// Enumerate every ordered (buy, sell) pair per symbol, apply slippage
/// and the cost model, and keep profitable survivors sorted by net
/// profit descending.
pub(crate) fn find_opportunities(
    settings: &Settings,
    gas_estimates: &HashMap<ChainId, GasEstimate>,
    matrix: &PriceMatrix,
    now: DateTime<Utc>,
) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();

    for (symbol, sources) in matrix {
        if sources.len() < 2 {
            continue;
        }

        for (i, buy_source) in sources.iter().enumerate() {
            for (j, sell_source) in sources.iter().enumerate() {
                if i == j {
                    continue;
                }

                // Effective prices: pay more than the ask buying, receive
                // less than the bid selling
                let buy_price =
                    buy_source.ask * (1.0 + buy_source.venue.slippage_factor());
                let sell_price =
                    sell_source.bid * (1.0 - sell_source.venue.slippage_factor());
                if buy_price <= 1e-6 || sell_price <= 1e-6 {
                    continue;
                }

                let spread_pct = (sell_price - buy_price) / buy_price * 100.0;
                if spread_pct <= 0.0 {
                    continue;
                }
                if spread_pct > MAX_SPREAD_PCT {
                    debug!(
                        "Rejecting {symbol} {} -> {}: {spread_pct:.1}% spread is bad data",
                        buy_source.venue, sell_source.venue
                    );
                    continue;
                }

                let gross_profit_usd =
                    spread_pct / 100.0 * settings.default_trade_size_usd;
                let gas_cost_usd = trade_gas_cost(
                    settings,
                    gas_estimates,
                    &buy_source.venue,
                    &sell_source.venue,
                );
                let withdrawal_fee_usd =
                    trade_withdrawal_fee(&buy_source.venue, &sell_source.venue);
                let net_profit_usd = gross_profit_usd - gas_cost_usd - withdrawal_fee_usd;

                if net_profit_usd < settings.min_profit_usd {
                    continue;
                }

                opportunities.push(Opportunity {
                    symbol: symbol.clone(),
                    buy: buy_source.clone(),
                    sell: sell_source.clone(),
                    buy_price,
                    sell_price,
                    spread_pct,
                    gross_profit_usd,
                    gas_cost_usd,
                    withdrawal_fee_usd,
                    net_profit_usd,
                    tier: ProfitTier::for_profit(net_profit_usd),
                    timestamp: now,
                });
            }
        }
    }

    opportunities.sort_by(|a, b| {
        b.net_profit_usd
            .partial_cmp(&a.net_profit_usd)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    opportunities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::chains::AdapterKind;
    use chrono::Duration as ChronoDuration;

    fn cex(venue: &str, bid: f64, ask: f64) -> Quote {
        Quote {
            venue: Venue::Cex {
                venue: venue.to_string(),
            },
            bid,
            ask,
            timestamp: Utc::now(),
            volume_24h: Some(10_000_000.0),
        }
    }

    fn dex_raw(name: &str, chain: ChainId, bid: f64, ask: f64, fee_percent: f64) -> DexQuote {
        DexQuote {
            dex_name: name.to_string(),
            chain,
            kind: AdapterKind::ConstantProduct,
            base_symbol: "ETH".into(),
            quote_symbol: "USDT".into(),
            bid,
            ask,
            fee_percent,
            timestamp: Utc::now(),
        }
    }

    fn matrix_of(symbol: &str, quotes: Vec<Quote>) -> PriceMatrix {
        let mut matrix = PriceMatrix::new();
        matrix.insert(symbol.to_string(), quotes);
        matrix
    }

    #[test]
    fn stale_cex_quote_never_enters_the_matrix() {
        let settings = Settings::default();
        let now = Utc::now();

        let mut fresh = cex("binance", 3000.0, 3001.0);
        fresh.timestamp = now - ChronoDuration::seconds(30);
        let mut stale = cex("okx", 3000.0, 3001.0);
        stale.timestamp = now - ChronoDuration::seconds(700);

        let mut cex_quotes = HashMap::new();
        cex_quotes.insert("ETH/USDT".to_string(), vec![fresh, stale]);

        let matrix = build_matrix(&settings, cex_quotes, HashMap::new(), now);
        assert_eq!(matrix["ETH/USDT"].len(), 1);
        assert!(matches!(
            &matrix["ETH/USDT"][0].venue,
            Venue::Cex { venue } if venue == "binance"
        ));
    }

    #[test]
    fn dex_staleness_is_strict() {
        let settings = Settings::default();
        let now = Utc::now();

        let mut quote = dex_raw("QuickSwap", ChainId::Polygon, 3000.0, 3001.0, 0.3);
        quote.timestamp = now - ChronoDuration::seconds(15);

        let mut dex_quotes = HashMap::new();
        dex_quotes.insert("ETH/USDT".to_string(), vec![quote]);

        let matrix = build_matrix(&settings, HashMap::new(), dex_quotes, now);
        assert!(matrix.is_empty());
    }

    #[test]
    fn low_volume_quote_dropped_missing_volume_kept() {
        let settings = Settings::default();
        let now = Utc::now();

        let mut thin = cex("gateio", 3000.0, 3001.0);
        thin.volume_24h = Some(10_000.0);
        let mut unknown = cex("coinbase", 3000.0, 3001.0);
        unknown.volume_24h = None;

        let mut cex_quotes = HashMap::new();
        cex_quotes.insert("ETH/USDT".to_string(), vec![thin, unknown]);

        let matrix = build_matrix(&settings, cex_quotes, HashMap::new(), now);
        assert_eq!(matrix["ETH/USDT"].len(), 1);
        assert!(matches!(
            &matrix["ETH/USDT"][0].venue,
            Venue::Cex { venue } if venue == "coinbase"
        ));
    }

    #[test]
    fn dex_fee_folds_symmetrically_into_matrix_quote() {
        let settings = Settings::default();
        let now = Utc::now();

        let mut dex_quotes = HashMap::new();
        dex_quotes.insert(
            "ETH/USDT".to_string(),
            vec![dex_raw("QuickSwap", ChainId::Polygon, 3000.0, 3000.0, 0.3)],
        );

        let matrix = build_matrix(&settings, HashMap::new(), dex_quotes, now);
        let quote = &matrix["ETH/USDT"][0];
        // bid = spot * (1 - f), ask = spot * (1 + f)
        assert!((quote.bid - 3000.0 * 0.997).abs() < 1e-9);
        assert!((quote.ask - 3000.0 * 1.003).abs() < 1e-9);
        assert!(quote.bid > 0.0 && quote.ask > 0.0);
    }

    #[test]
    fn enumeration_considers_all_ordered_pairs() {
        // k sources -> k*(k-1) ordered pairs. Make every pair profitable
        // with ascending bids and a tiny ask so each direction clears.
        let settings = Settings {
            min_profit_usd: 0.0,
            ..Settings::default()
        };
        let now = Utc::now();

        let quotes: Vec<Quote> = (0..4)
            .map(|i| {
                let venue = format!("venue{i}");
                let mut quote = cex(&venue, 3000.0 + 100.0 * i as f64, 2000.0);
                quote.volume_24h = Some(10_000_000.0);
                quote
            })
            .collect();

        let matrix = matrix_of("ETH/USDT", quotes);
        let opportunities = find_opportunities(&settings, &HashMap::new(), &matrix, now);

        // All 12 ordered pairs have sell.bid > buy.ask here
        assert_eq!(opportunities.len(), 4 * 3);
    }

    #[test]
    fn opportunities_sorted_by_net_profit_descending() {
        let settings = Settings {
            min_profit_usd: 0.0,
            ..Settings::default()
        };
        let now = Utc::now();

        let matrix = matrix_of(
            "ETH/USDT",
            vec![
                cex("a", 3000.0, 3001.0),
                cex("b", 3020.0, 3021.0),
                cex("c", 3050.0, 3051.0),
            ],
        );
        let opportunities = find_opportunities(&settings, &HashMap::new(), &matrix, now);

        assert!(!opportunities.is_empty());
        for window in opportunities.windows(2) {
            assert!(window[0].net_profit_usd >= window[1].net_profit_usd);
        }
    }

    #[test]
    fn two_cex_spread_below_threshold_emits_nothing() {
        // X quotes 3000/3001, Y quotes 3020/3021. After slippage and two
        // 0.1% trading fees plus the bridge fee, net lands under 5 USD.
        let settings = Settings::default();
        let now = Utc::now();

        let matrix = matrix_of(
            "ETH/USDT",
            vec![cex("venue-x", 3000.0, 3001.0), cex("venue-y", 3020.0, 3021.0)],
        );
        let opportunities = find_opportunities(&settings, &HashMap::new(), &matrix, now);
        assert!(opportunities.is_empty());
    }

    #[test]
    fn cex_to_dex_costs_sink_small_spreads() {
        // DEX ask 3000 vs CEX bid 3020: ~0.6% gross (~6 USD) against the
        // 25 USD Ethereum gas fallback is deep red in both directions.
        let settings = Settings::default();
        let now = Utc::now();

        let dex_quote = Quote {
            venue: Venue::Dex {
                venue: "Uniswap V2".into(),
                chain: ChainId::Ethereum,
                kind: AdapterKind::ConstantProduct,
                fee_percent: 0.3,
            },
            bid: 2990.0,
            ask: 3000.0,
            timestamp: now,
            volume_24h: None,
        };
        let matrix = matrix_of("ETH/USDT", vec![cex("venue-x", 3020.0, 3021.0), dex_quote]);

        let opportunities = find_opportunities(&settings, &HashMap::new(), &matrix, now);
        assert!(opportunities.is_empty());
    }

    #[test]
    fn wide_cex_spread_emits_with_tier() {
        // 3000 ask vs 3100 bid: ~3.3% gross (~33 USD), minus 2 USD fees
        // and 5 USD bridge -> ~26 USD net, HIGH tier
        let settings = Settings::default();
        let now = Utc::now();

        let matrix = matrix_of(
            "ETH/USDT",
            vec![cex("venue-x", 2999.0, 3000.0), cex("venue-y", 3100.0, 3101.0)],
        );
        let opportunities = find_opportunities(&settings, &HashMap::new(), &matrix, now);

        assert_eq!(opportunities.len(), 1);
        let opp = &opportunities[0];
        assert_eq!(opp.tier, Some(ProfitTier::High));
        assert!(opp.net_profit_usd > 20.0 && opp.net_profit_usd < 50.0);
        assert!((opp.withdrawal_fee_usd - 5.0).abs() < 1e-9);
        assert!((opp.gas_cost_usd - 2.0).abs() < 1e-9);
    }

    #[test]
    fn absurd_spread_is_rejected_as_bad_data() {
        let settings = Settings {
            min_profit_usd: 0.0,
            ..Settings::default()
        };
        let now = Utc::now();

        // Sell bid is 5x the buy ask: decode garbage, not an opportunity
        let matrix = matrix_of(
            "ETH/USDT",
            vec![cex("venue-x", 2999.0, 3000.0), cex("venue-y", 15_000.0, 15_001.0)],
        );
        let opportunities = find_opportunities(&settings, &HashMap::new(), &matrix, now);
        assert!(opportunities.is_empty());
    }

    #[test]
    fn dex_gas_cost_uses_pool_kind() {
        let settings = Settings::default();
        let mut gas_estimates = HashMap::new();
        gas_estimates.insert(
            ChainId::Polygon,
            GasEstimate {
                chain_id: ChainId::Polygon,
                gas_price_gwei: 50.0,
                native_token_price_usd: 0.8,
                swap_cost_usd: 0.10,
                v3_swap_cost_usd: 0.15,
            },
        );

        let cp = Venue::Dex {
            venue: "QuickSwap".into(),
            chain: ChainId::Polygon,
            kind: AdapterKind::ConstantProduct,
            fee_percent: 0.3,
        };
        let cl = Venue::Dex {
            venue: "Uniswap V3".into(),
            chain: ChainId::Polygon,
            kind: AdapterKind::ConcentratedLiquidity,
            fee_percent: 0.05,
        };
        let cex_venue = Venue::Cex {
            venue: "binance".into(),
        };

        // CEX fee (1.0) + CP swap (0.10)
        let cost = trade_gas_cost(&settings, &gas_estimates, &cex_venue, &cp);
        assert!((cost - 1.10).abs() < 1e-9);
        // CEX fee (1.0) + CL swap (0.15)
        let cost = trade_gas_cost(&settings, &gas_estimates, &cex_venue, &cl);
        assert!((cost - 1.15).abs() < 1e-9);

        // Unknown chain falls back to the conservative table
        let unknown = Venue::Dex {
            venue: "Ubeswap".into(),
            chain: ChainId::Celo,
            kind: AdapterKind::ConstantProduct,
            fee_percent: 0.3,
        };
        let cost = trade_gas_cost(&settings, &gas_estimates, &cex_venue, &unknown);
        assert!((cost - 1.20).abs() < 1e-9);
    }

    #[test]
    fn withdrawal_fee_by_direction() {
        let cex_venue = Venue::Cex {
            venue: "binance".into(),
        };
        let dex_venue = Venue::Dex {
            venue: "Uniswap V2".into(),
            chain: ChainId::Ethereum,
            kind: AdapterKind::ConstantProduct,
            fee_percent: 0.3,
        };

        // CEX -> DEX pays the destination chain fee
        assert_eq!(trade_withdrawal_fee(&cex_venue, &dex_venue), 15.0);
        // CEX -> CEX pays the bridge fee
        assert_eq!(trade_withdrawal_fee(&cex_venue, &cex_venue), 5.0);
        // DEX -> anything is free
        assert_eq!(trade_withdrawal_fee(&dex_venue, &cex_venue), 0.0);
        assert_eq!(trade_withdrawal_fee(&dex_venue, &dex_venue), 0.0);
    }

    #[test]
    fn approx_prices_refresh_from_cex_mids() {
        let registry = TokenRegistry::new();
        let mut cex_quotes = HashMap::new();
        cex_quotes.insert(
            "ETH/USDT".to_string(),
            vec![cex("binance", 3100.0, 3102.0), cex("okx", 3098.0, 3100.0)],
        );

        refresh_approx_prices(&registry, &cex_quotes);
        // Average of mids (3101 + 3099) / 2
        assert!((registry.approx_price("ETH") - 3100.0).abs() < 1e-9);
    }
}
