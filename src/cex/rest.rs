//! REST ticker polling across centralized exchanges.
//!
//! Public market-data endpoints only. Each venue sits behind the
//! `Exchange` trait; batch ticker endpoints are preferred, venues without
//! one fall back to per-symbol calls gated by the rate governor.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::exchanges::{ExchangeConfig, EXCHANGES};
use crate::config::tokens::normalize_symbol;
use crate::rate_limit::RateGovernor;
use crate::types::{Quote, Venue};

/// Venue handshake limits: timeout per attempt, retries, and how many
/// venues initialize at once (bursts trip exchange anti-abuse checks).
const INIT_TIMEOUT: Duration = Duration::from_secs(25);
const INIT_ATTEMPTS: u32 = 3;
const INIT_CONCURRENCY: usize = 3;

/// One listed market on a venue.
#[derive(Debug, Clone)]
pub struct MarketInfo {
    pub base: String,
    pub quote: String,
    /// Symbol in the venue's own spelling, used on the wire
    pub native_symbol: String,
}

/// Raw ticker row as a venue reports it.
#[derive(Debug, Clone)]
pub struct TickerQuote {
    pub native_symbol: String,
    pub bid: f64,
    pub ask: f64,
    /// Venue-reported time; acquisition time is substituted when absent
    pub timestamp_ms: Option<i64>,
    /// 24h volume in quote units; not all venues report one
    pub quote_volume_24h: Option<f64>,
}

/// A venue's public market-data API.
#[async_trait]
pub trait Exchange: Send + Sync {
    fn id(&self) -> &'static str;

    /// Whether one request can return tickers for many symbols.
    fn supports_batch_tickers(&self) -> bool {
        true
    }

    async fn load_markets(&self, client: &reqwest::Client) -> Result<Vec<MarketInfo>>;

    /// Batch fetch. Implementations typically pull the venue's full
    /// ticker table and filter to `wanted`.
    async fn fetch_tickers(
        &self,
        client: &reqwest::Client,
        wanted: &HashSet<String>,
    ) -> Result<Vec<TickerQuote>>;

    /// Single-symbol fetch for venues without a batch endpoint.
    async fn fetch_ticker(
        &self,
        _client: &reqwest::Client,
        _native_symbol: &str,
    ) -> Result<Option<TickerQuote>> {
        Ok(None)
    }
}

struct VenueState {
    config: &'static ExchangeConfig,
    adapter: Box<dyn Exchange>,
    /// normalized "BASE/QUOTE" -> market
    markets: HashMap<String, MarketInfo>,
    /// native spellings for canonical-form fallback resolution
    native_symbols: HashSet<String>,
}

/// Fetches prices from all initialized venues.
pub struct RestFetcher {
    client: reqwest::Client,
    governor: Arc<RateGovernor>,
    venues: HashMap<&'static str, VenueState>,
}

impl RestFetcher {
    /// Shared HTTP client: pooled connections, bounded timeouts, and
    /// hickory-dns so a slow local resolver never serializes venue
    /// handshakes.
    pub fn new(governor: Arc<RateGovernor>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(600))
            .pool_max_idle_per_host(50)
            .hickory_dns(true)
            .build()
            .expect("reqwest client construction cannot fail with static config");

        Self {
            client,
            governor,
            venues: HashMap::new(),
        }
    }

    /// Handshake with every configured venue in parallel. Venues that
    /// fail all attempts are logged and omitted; the scan runs with
    /// whatever subset came up.
    pub async fn initialize(&mut self) {
        let semaphore = Arc::new(Semaphore::new(INIT_CONCURRENCY));

        let tasks: Vec<_> = EXCHANGES
            .iter()
            .map(|config| {
                let client = self.client.clone();
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let adapter = venue_adapter(config.id)?;
                    let _permit = semaphore.acquire().await.ok()?;

                    for attempt in 1..=INIT_ATTEMPTS {
                        match tokio::time::timeout(INIT_TIMEOUT, adapter.load_markets(&client))
                            .await
                        {
                            Ok(Ok(markets)) => {
                                info!("Initialized {} ({} markets)", config.name, markets.len());
                                return Some((config, adapter, markets));
                            }
                            Ok(Err(e)) if attempt == INIT_ATTEMPTS => {
                                warn!("Failed to initialize {}: {e:#}", config.name);
                            }
                            Err(_) if attempt == INIT_ATTEMPTS => {
                                warn!("Failed to initialize {}: handshake timeout", config.name);
                            }
                            _ => {
                                debug!("Retrying {} ({attempt}/{INIT_ATTEMPTS})", config.name);
                                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                            }
                        }
                    }
                    None
                }
            })
            .collect();

        for result in join_all(tasks).await.into_iter().flatten() {
            let (config, adapter, markets) = result;
            let mut by_normalized = HashMap::with_capacity(markets.len());
            let mut native_symbols = HashSet::with_capacity(markets.len());
            for market in markets {
                native_symbols.insert(market.native_symbol.clone());
                let key = format!(
                    "{}/{}",
                    normalize_symbol(&market.base),
                    normalize_symbol(&market.quote)
                );
                by_normalized.insert(key, market);
            }
            self.venues.insert(
                config.id,
                VenueState {
                    config,
                    adapter,
                    markets: by_normalized,
                    native_symbols,
                },
            );
        }

        info!("CEX fetcher ready: {} venues", self.venues.len());
    }

    pub fn available_venues(&self) -> Vec<&'static str> {
        self.venues.keys().copied().collect()
    }

    /// Resolve a (base, quote) pair to the venue's native symbol: the
    /// structured market map first, then canonical string forms.
    fn resolve(&self, venue: &VenueState, base: &str, quote: &str) -> Option<String> {
        let base = normalize_symbol(base);
        let quote = normalize_symbol(quote);

        if let Some(market) = venue.markets.get(&format!("{base}/{quote}")) {
            return Some(market.native_symbol.clone());
        }

        let variations = [
            format!("{base}/{quote}"),
            format!("{base}-{quote}"),
            format!("{base}{quote}"),
            format!("{base}_{quote}"),
        ];
        variations
            .into_iter()
            .find(|v| venue.native_symbols.contains(v))
    }

    /// Native/normalized symbol pairs a venue can serve, in input order.
    /// Used to hand the stream subscriber its watch list.
    pub fn resolve_for_venue(
        &self,
        venue_id: &str,
        pairs: &[(String, String)],
    ) -> Vec<(String, String)> {
        let Some(venue) = self.venues.get(venue_id) else {
            return Vec::new();
        };
        pairs
            .iter()
            .filter_map(|(base, quote)| {
                let native = self.resolve(venue, base, quote)?;
                let normalized =
                    format!("{}/{}", normalize_symbol(base), normalize_symbol(quote));
                Some((native, normalized))
            })
            .collect()
    }

    /// Fetch tickers for all pairs from all venues except `exclude`
    /// (venues already served by the stream subscriber).
    /// Returns normalized symbol -> quotes. Unresolvable symbols are
    /// silently dropped per venue; invalid tickers (bid or ask <= 0) are
    /// dropped per quote.
    pub async fn fetch_all(
        &self,
        pairs: &[(String, String)],
        exclude: &HashSet<String>,
    ) -> HashMap<String, Vec<Quote>> {
        let tasks: Vec<_> = self
            .venues
            .values()
            .filter(|v| !exclude.contains(v.config.id))
            .map(|venue| self.fetch_venue(venue, pairs))
            .collect();

        let mut results: HashMap<String, Vec<Quote>> = HashMap::new();
        for venue_quotes in join_all(tasks).await {
            for (symbol, quote) in venue_quotes {
                results.entry(symbol).or_default().push(quote);
            }
        }
        results
    }

    async fn fetch_venue(
        &self,
        venue: &VenueState,
        pairs: &[(String, String)],
    ) -> Vec<(String, Quote)> {
        // native symbol -> normalized symbol
        let mut symbol_map: HashMap<String, String> = HashMap::new();
        for (base, quote) in pairs {
            if let Some(native) = self.resolve(venue, base, quote) {
                let normalized =
                    format!("{}/{}", normalize_symbol(base), normalize_symbol(quote));
                symbol_map.insert(native, normalized);
            }
        }
        if symbol_map.is_empty() {
            return Vec::new();
        }

        let key = format!("cex:{}", venue.config.id);
        let mut tickers = Vec::new();

        if venue.adapter.supports_batch_tickers() {
            self.governor.acquire(&key).await;
            let wanted: HashSet<String> = symbol_map.keys().cloned().collect();
            match venue.adapter.fetch_tickers(&self.client, &wanted).await {
                Ok(batch) => tickers = batch,
                Err(e) => {
                    debug!("Batch ticker fetch failed for {}: {e:#}", venue.config.id);
                }
            }
        } else {
            for native in symbol_map.keys() {
                self.governor.acquire(&key).await;
                match venue.adapter.fetch_ticker(&self.client, native).await {
                    Ok(Some(ticker)) => tickers.push(ticker),
                    Ok(None) => {}
                    Err(e) => {
                        debug!(
                            "Ticker fetch failed for {} on {}: {e:#}",
                            native, venue.config.id
                        );
                    }
                }
            }
        }

        tickers
            .into_iter()
            .filter_map(|ticker| {
                let normalized = symbol_map.get(&ticker.native_symbol)?;
                let quote = quote_from_ticker(venue.config.id, &ticker)?;
                Some((normalized.clone(), quote))
            })
            .collect()
    }

    /// Averaged mid price for one pair on one venue. Used by the gas
    /// estimator for native-token USD pricing.
    pub async fn fetch_mid(&self, venue_id: &str, base: &str, quote: &str) -> Option<f64> {
        let venue = self.venues.get(venue_id)?;
        let native = self.resolve(venue, base, quote)?;

        self.governor.acquire(&format!("cex:{venue_id}")).await;

        // Prefer the venue's single-symbol endpoint; fall back to the
        // batch table for venues that only expose one
        let mut ticker = venue
            .adapter
            .fetch_ticker(&self.client, &native)
            .await
            .ok()
            .flatten();
        if ticker.is_none() && venue.adapter.supports_batch_tickers() {
            let wanted: HashSet<String> = [native.clone()].into();
            ticker = venue
                .adapter
                .fetch_tickers(&self.client, &wanted)
                .await
                .ok()?
                .into_iter()
                .find(|t| t.native_symbol == native);
        }

        let ticker = ticker?;
        if ticker.bid <= 0.0 || ticker.ask <= 0.0 {
            return None;
        }
        Some((ticker.bid + ticker.ask) / 2.0)
    }

    /// Pairs listed on at least `min_venues` venues against a stable
    /// quote, ordered by venue count descending so a downstream cap keeps
    /// the most widely traded pairs.
    pub fn harvest(&self, min_venues: usize) -> Vec<(String, String)> {
        let mut counts: HashMap<(String, String), usize> = HashMap::new();

        for venue in self.venues.values() {
            for market in venue.markets.values() {
                let base = normalize_symbol(&market.base).to_string();
                let quote = normalize_symbol(&market.quote).to_string();
                if quote == "USDT" || quote == "USDC" {
                    *counts.entry((base, quote)).or_insert(0) += 1;
                }
            }
        }

        let mut pairs: Vec<_> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_venues)
            .collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        pairs.into_iter().map(|(pair, _)| pair).collect()
    }
}

/// Validate a raw ticker into a matrix quote. Zero or negative bid/ask
/// means the venue has no real book for the symbol.
fn quote_from_ticker(venue_id: &str, ticker: &TickerQuote) -> Option<Quote> {
    if ticker.bid <= 0.0 || ticker.ask <= 0.0 {
        return None;
    }
    let timestamp = ticker
        .timestamp_ms
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now);
    Some(Quote {
        venue: Venue::Cex {
            venue: venue_id.to_string(),
        },
        bid: ticker.bid,
        ask: ticker.ask,
        timestamp,
        volume_24h: ticker.quote_volume_24h,
    })
}

/// Adapter registry. A config id without an adapter is a configuration
/// error surfaced at startup.
fn venue_adapter(id: &str) -> Option<Box<dyn Exchange>> {
    use crate::cex::venues::*;
    match id {
        "binance" => Some(Box::new(Binance)),
        "okx" => Some(Box::new(Okx)),
        "bybit" => Some(Box::new(Bybit)),
        "kucoin" => Some(Box::new(Kucoin)),
        "gateio" => Some(Box::new(Gateio)),
        "coinbase" => Some(Box::new(Coinbase)),
        other => {
            warn!("No adapter for configured exchange '{other}'");
            None
        }
    }
}

/// Parse a DateTime out of an exchange timestamp in ms, for reuse by the
/// stream subscriber.
pub(crate) fn timestamp_from_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue_with_markets(markets: Vec<MarketInfo>) -> VenueState {
        let mut by_normalized = HashMap::new();
        let mut native_symbols = HashSet::new();
        for market in markets {
            native_symbols.insert(market.native_symbol.clone());
            by_normalized.insert(
                format!(
                    "{}/{}",
                    normalize_symbol(&market.base),
                    normalize_symbol(&market.quote)
                ),
                market,
            );
        }
        VenueState {
            config: &EXCHANGES[0],
            adapter: Box::new(crate::cex::venues::Binance),
            markets: by_normalized,
            native_symbols,
        }
    }

    fn fetcher() -> RestFetcher {
        RestFetcher::new(Arc::new(RateGovernor::new()))
    }

    #[test]
    fn resolve_prefers_structured_market_map() {
        let fetcher = fetcher();
        let venue = venue_with_markets(vec![MarketInfo {
            base: "ETH".into(),
            quote: "USDT".into(),
            native_symbol: "ETHUSDT".into(),
        }]);

        assert_eq!(
            fetcher.resolve(&venue, "ETH", "USDT"),
            Some("ETHUSDT".into())
        );
        // Wrapped spelling resolves to the same market
        assert_eq!(
            fetcher.resolve(&venue, "WETH", "USDT"),
            Some("ETHUSDT".into())
        );
        assert_eq!(fetcher.resolve(&venue, "DOGE", "USDT"), None);
    }

    #[test]
    fn resolve_falls_back_to_canonical_forms() {
        let fetcher = fetcher();
        // Market list carries a native symbol but no parsed base/quote
        // match (e.g. the venue lists it under a different base name)
        let venue = venue_with_markets(vec![MarketInfo {
            base: "XETH".into(),
            quote: "USDT".into(),
            native_symbol: "ETH-USDT".into(),
        }]);

        assert_eq!(
            fetcher.resolve(&venue, "ETH", "USDT"),
            Some("ETH-USDT".into())
        );
    }

    #[test]
    fn invalid_tickers_are_dropped() {
        let good = TickerQuote {
            native_symbol: "ETHUSDT".into(),
            bid: 3000.0,
            ask: 3001.0,
            timestamp_ms: Some(1_700_000_000_000),
            quote_volume_24h: Some(5_000_000.0),
        };
        let zero_bid = TickerQuote { bid: 0.0, ..good.clone() };
        let negative_ask = TickerQuote { ask: -1.0, ..good.clone() };

        assert!(quote_from_ticker("binance", &good).is_some());
        assert!(quote_from_ticker("binance", &zero_bid).is_none());
        assert!(quote_from_ticker("binance", &negative_ask).is_none());
    }

    #[test]
    fn missing_timestamp_defaults_to_acquisition_time() {
        let ticker = TickerQuote {
            native_symbol: "ETHUSDT".into(),
            bid: 3000.0,
            ask: 3001.0,
            timestamp_ms: None,
            quote_volume_24h: None,
        };
        let before = Utc::now();
        let quote = quote_from_ticker("binance", &ticker).unwrap();
        assert!(quote.timestamp >= before);
        assert!(quote.volume_24h.is_none());
    }
}
