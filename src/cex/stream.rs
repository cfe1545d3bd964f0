//! WebSocket ticker streams for top-tier venues.
//!
//! One long-lived task per venue maintains a latest-quote cache. The
//! cache is written only by the owning task and read lock-free by the
//! scan engine; entries are replaced whole, and the reliability filter
//! re-checks freshness downstream, so readers never need coordination.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::cex::rest::timestamp_from_ms;
use crate::types::{Quote, Venue};

/// Reconnect backoff after any stream error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Per-venue cap on watched symbols; streams degrade when oversubscribed.
const MAX_SYMBOLS_PER_VENUE: usize = 250;

/// Keep-alive cadence for venues that drop idle connections.
const PING_INTERVAL: Duration = Duration::from_secs(20);

/// Streaming venues and their wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamVenue {
    Binance,
    Okx,
    Bybit,
}

impl StreamVenue {
    pub fn id(&self) -> &'static str {
        match self {
            StreamVenue::Binance => "binance",
            StreamVenue::Okx => "okx",
            StreamVenue::Bybit => "bybit",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "binance" => Some(StreamVenue::Binance),
            "okx" => Some(StreamVenue::Okx),
            "bybit" => Some(StreamVenue::Bybit),
            _ => None,
        }
    }

    fn url(&self) -> &'static str {
        match self {
            StreamVenue::Binance => "wss://stream.binance.com:9443/ws",
            StreamVenue::Okx => "wss://ws.okx.com:8443/ws/v5/public",
            StreamVenue::Bybit => "wss://stream.bybit.com/v5/public/spot",
        }
    }

    /// Subscription frames for a batch of native symbols. Chunked to the
    /// venue's per-request argument limits.
    fn subscribe_frames(&self, native_symbols: &[String]) -> Vec<Message> {
        match self {
            StreamVenue::Binance => native_symbols
                .chunks(100)
                .enumerate()
                .map(|(i, chunk)| {
                    let params: Vec<String> = chunk
                        .iter()
                        .map(|s| format!("{}@bookTicker", s.to_lowercase()))
                        .collect();
                    Message::Text(
                        json!({"method": "SUBSCRIBE", "params": params, "id": i + 1})
                            .to_string()
                            .into(),
                    )
                })
                .collect(),
            StreamVenue::Okx => native_symbols
                .chunks(100)
                .map(|chunk| {
                    let args: Vec<Value> = chunk
                        .iter()
                        .map(|s| json!({"channel": "tickers", "instId": s}))
                        .collect();
                    Message::Text(json!({"op": "subscribe", "args": args}).to_string().into())
                })
                .collect(),
            StreamVenue::Bybit => native_symbols
                .chunks(10)
                .map(|chunk| {
                    let args: Vec<String> =
                        chunk.iter().map(|s| format!("tickers.{s}")).collect();
                    Message::Text(json!({"op": "subscribe", "args": args}).to_string().into())
                })
                .collect(),
        }
    }

    fn ping_frame(&self) -> Option<Message> {
        match self {
            // Binance answers protocol-level pings itself
            StreamVenue::Binance => None,
            StreamVenue::Okx => Some(Message::Text("ping".into())),
            StreamVenue::Bybit => Some(Message::Text(json!({"op": "ping"}).to_string().into())),
        }
    }

    /// Parse one text frame into (native_symbol, bid, ask, timestamp_ms).
    fn parse_ticker(&self, raw: &str) -> Option<(String, f64, f64, Option<i64>)> {
        let value: Value = serde_json::from_str(raw).ok()?;
        match self {
            StreamVenue::Binance => {
                // bookTicker: {"s":"ETHUSDT","b":"...","a":"..."}
                let symbol = value.get("s")?.as_str()?.to_string();
                let bid = value.get("b")?.as_str()?.parse().ok()?;
                let ask = value.get("a")?.as_str()?.parse().ok()?;
                Some((symbol, bid, ask, None))
            }
            StreamVenue::Okx => {
                let data = value.get("data")?.as_array()?.first()?;
                let symbol = data.get("instId")?.as_str()?.to_string();
                let bid = data.get("bidPx")?.as_str()?.parse().ok()?;
                let ask = data.get("askPx")?.as_str()?.parse().ok()?;
                let ts = data
                    .get("ts")
                    .and_then(|t| t.as_str())
                    .and_then(|t| t.parse().ok());
                Some((symbol, bid, ask, ts))
            }
            StreamVenue::Bybit => {
                let data = value.get("data")?;
                let symbol = data.get("symbol")?.as_str()?.to_string();
                let bid = data.get("bid1Price")?.as_str()?.parse().ok()?;
                let ask = data.get("ask1Price")?.as_str()?.parse().ok()?;
                let ts = value.get("ts").and_then(|t| t.as_i64());
                Some((symbol, bid, ask, ts))
            }
        }
    }
}

/// Latest-quote cache, (venue id, normalized symbol) -> quote.
/// Last-writer-wins; each entry is replaced whole.
pub type StreamBook = DashMap<(String, String), Quote>;

/// Long-lived subscription tasks feeding the stream book.
pub struct StreamSubscriber {
    book: Arc<StreamBook>,
    tasks: Vec<JoinHandle<()>>,
    active: Vec<&'static str>,
}

impl StreamSubscriber {
    pub fn new() -> Self {
        Self {
            book: Arc::new(DashMap::new()),
            tasks: Vec::new(),
            active: Vec::new(),
        }
    }

    pub fn book(&self) -> Arc<StreamBook> {
        Arc::clone(&self.book)
    }

    /// Venue ids with a running subscription task; the REST poller
    /// excludes these.
    pub fn active_venues(&self) -> &[&'static str] {
        &self.active
    }

    /// Latest cached quote for a venue/symbol, if any update arrived.
    pub fn latest(&self, venue_id: &str, normalized_symbol: &str) -> Option<Quote> {
        self.book
            .get(&(venue_id.to_string(), normalized_symbol.to_string()))
            .map(|entry| entry.clone())
    }

    /// Spawn one watcher task per venue. `symbols` maps a venue id to
    /// (native, normalized) symbol pairs, already resolved against that
    /// venue's market list and capped upstream.
    pub fn start(&mut self, symbols: HashMap<&'static str, Vec<(String, String)>>) {
        for (venue_id, pairs) in symbols {
            let Some(venue) = StreamVenue::from_id(venue_id) else {
                warn!("No stream support for venue '{venue_id}'");
                continue;
            };
            if pairs.is_empty() {
                continue;
            }

            let mut pairs = pairs;
            pairs.truncate(MAX_SYMBOLS_PER_VENUE);

            let book = Arc::clone(&self.book);
            self.active.push(venue.id());
            self.tasks
                .push(tokio::spawn(watch_venue(venue, pairs, book)));
        }

        info!("Stream subscriber started for {} venues", self.active.len());
    }

    /// Abort all watcher tasks. The cache retains its last state; the
    /// reliability filter ages it out.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.active.clear();
    }
}

impl Default for StreamSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StreamSubscriber {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Connect-subscribe-read loop with 5s reconnect backoff.
async fn watch_venue(
    venue: StreamVenue,
    pairs: Vec<(String, String)>,
    book: Arc<StreamBook>,
) {
    // native -> normalized for cache keying
    let symbol_map: HashMap<String, String> = pairs.iter().cloned().collect();
    let native_symbols: Vec<String> = pairs.into_iter().map(|(native, _)| native).collect();

    loop {
        match connect_async(venue.url()).await {
            Ok((ws, _)) => {
                info!(
                    "Stream connected: {} ({} symbols)",
                    venue.id(),
                    native_symbols.len()
                );
                let (mut write, mut read) = ws.split();

                let mut subscribed = true;
                for frame in venue.subscribe_frames(&native_symbols) {
                    if let Err(e) = write.send(frame).await {
                        warn!("Subscribe failed on {}: {e}", venue.id());
                        subscribed = false;
                        break;
                    }
                }

                if subscribed {
                    let mut ping_timer = tokio::time::interval(PING_INTERVAL);
                    ping_timer.set_missed_tick_behavior(
                        tokio::time::MissedTickBehavior::Delay,
                    );

                    loop {
                        tokio::select! {
                            message = read.next() => {
                                match message {
                                    Some(Ok(Message::Text(text))) => {
                                        handle_frame(venue, &text, &symbol_map, &book);
                                    }
                                    Some(Ok(Message::Ping(payload))) => {
                                        let _ = write.send(Message::Pong(payload)).await;
                                    }
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        warn!("Stream error on {}: {e}", venue.id());
                                        break;
                                    }
                                    None => {
                                        warn!("Stream closed by {}", venue.id());
                                        break;
                                    }
                                }
                            }
                            _ = ping_timer.tick() => {
                                if let Some(frame) = venue.ping_frame() {
                                    if write.send(frame).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Stream connect failed for {}: {e}", venue.id());
            }
        }

        debug!("Reconnecting {} in {:?}", venue.id(), RECONNECT_DELAY);
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

fn handle_frame(
    venue: StreamVenue,
    raw: &str,
    symbol_map: &HashMap<String, String>,
    book: &StreamBook,
) {
    let Some((native, bid, ask, ts_ms)) = venue.parse_ticker(raw) else {
        return;
    };
    if bid <= 0.0 || ask <= 0.0 {
        return;
    }
    let Some(normalized) = symbol_map.get(&native) else {
        return;
    };

    let quote = Quote {
        venue: Venue::Cex {
            venue: venue.id().to_string(),
        },
        bid,
        ask,
        timestamp: ts_ms.map(timestamp_from_ms).unwrap_or_else(Utc::now),
        // Ticker streams carry no 24h volume
        volume_24h: None,
    };
    book.insert((venue.id().to_string(), normalized.clone()), quote);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binance_book_ticker_parses() {
        let raw = r#"{"u":400900217,"s":"ETHUSDT","b":"3000.10","B":"10","a":"3000.50","A":"7"}"#;
        let (symbol, bid, ask, ts) = StreamVenue::Binance.parse_ticker(raw).unwrap();
        assert_eq!(symbol, "ETHUSDT");
        assert_eq!(bid, 3000.10);
        assert_eq!(ask, 3000.50);
        assert!(ts.is_none());
    }

    #[test]
    fn okx_ticker_parses() {
        let raw = r#"{"arg":{"channel":"tickers","instId":"ETH-USDT"},"data":[{"instId":"ETH-USDT","bidPx":"2999.9","askPx":"3000.1","ts":"1700000000000"}]}"#;
        let (symbol, bid, ask, ts) = StreamVenue::Okx.parse_ticker(raw).unwrap();
        assert_eq!(symbol, "ETH-USDT");
        assert_eq!(bid, 2999.9);
        assert_eq!(ask, 3000.1);
        assert_eq!(ts, Some(1_700_000_000_000));
    }

    #[test]
    fn bybit_ticker_parses() {
        let raw = r#"{"topic":"tickers.ETHUSDT","ts":1700000000000,"type":"snapshot","data":{"symbol":"ETHUSDT","bid1Price":"2999.9","ask1Price":"3000.1"}}"#;
        let (symbol, bid, ask, ts) = StreamVenue::Bybit.parse_ticker(raw).unwrap();
        assert_eq!(symbol, "ETHUSDT");
        assert_eq!(bid, 2999.9);
        assert_eq!(ask, 3000.1);
        assert_eq!(ts, Some(1_700_000_000_000));
    }

    #[test]
    fn subscription_acks_are_ignored() {
        // OKX subscribe confirmation has no data array
        let raw = r#"{"event":"subscribe","arg":{"channel":"tickers","instId":"ETH-USDT"}}"#;
        assert!(StreamVenue::Okx.parse_ticker(raw).is_none());

        // Bybit op response has no data object
        let raw = r#"{"success":true,"op":"subscribe"}"#;
        assert!(StreamVenue::Bybit.parse_ticker(raw).is_none());
    }

    #[test]
    fn frames_land_in_the_book_keyed_by_normalized_symbol() {
        let book: StreamBook = DashMap::new();
        let mut symbol_map = HashMap::new();
        symbol_map.insert("ETH-USDT".to_string(), "ETH/USDT".to_string());

        let raw = r#"{"arg":{"channel":"tickers","instId":"ETH-USDT"},"data":[{"instId":"ETH-USDT","bidPx":"2999.9","askPx":"3000.1","ts":"1700000000000"}]}"#;
        handle_frame(StreamVenue::Okx, raw, &symbol_map, &book);

        let quote = book
            .get(&("okx".to_string(), "ETH/USDT".to_string()))
            .unwrap();
        assert_eq!(quote.bid, 2999.9);
        assert!(quote.volume_24h.is_none());
    }

    #[test]
    fn zero_prices_never_enter_the_book() {
        let book: StreamBook = DashMap::new();
        let mut symbol_map = HashMap::new();
        symbol_map.insert("ETHUSDT".to_string(), "ETH/USDT".to_string());

        let raw = r#"{"s":"ETHUSDT","b":"0","a":"3000.5"}"#;
        handle_frame(StreamVenue::Binance, raw, &symbol_map, &book);
        assert!(book.is_empty());
    }

    #[test]
    fn bybit_chunks_subscriptions_to_ten_args() {
        let symbols: Vec<String> = (0..25).map(|i| format!("SYM{i}USDT")).collect();
        let frames = StreamVenue::Bybit.subscribe_frames(&symbols);
        assert_eq!(frames.len(), 3);
    }
}
