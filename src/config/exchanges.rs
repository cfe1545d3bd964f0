//! Centralized exchange configurations.
//!
//! Only public market-data endpoints are used, no API keys. The
//! `streamed` flag marks top-tier venues served by the WebSocket
//! subscriber; the REST poller excludes those to avoid duplicate work.

#[derive(Debug, Clone, Copy)]
pub struct ExchangeConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub rate_limit_per_second: f64,
    /// Served by the stream subscriber instead of REST polling
    pub streamed: bool,
}

pub static EXCHANGES: &[ExchangeConfig] = &[
    ExchangeConfig {
        id: "binance",
        name: "Binance",
        rate_limit_per_second: 20.0,
        streamed: true,
    },
    ExchangeConfig {
        id: "okx",
        name: "OKX",
        rate_limit_per_second: 10.0,
        streamed: true,
    },
    ExchangeConfig {
        id: "bybit",
        name: "Bybit",
        rate_limit_per_second: 2.0,
        streamed: true,
    },
    ExchangeConfig {
        id: "kucoin",
        name: "KuCoin",
        rate_limit_per_second: 10.0,
        streamed: false,
    },
    ExchangeConfig {
        id: "gateio",
        name: "Gate.io",
        rate_limit_per_second: 15.0,
        streamed: false,
    },
    ExchangeConfig {
        id: "coinbase",
        name: "Coinbase",
        rate_limit_per_second: 10.0,
        streamed: false,
    },
];

pub fn exchange_by_id(id: &str) -> Option<&'static ExchangeConfig> {
    EXCHANGES.iter().find(|e| e.id == id)
}

/// Venues with sub-cent spreads where the fixed CEX slippage factor is
/// tightened (0.02% instead of the 0.05% default).
pub fn is_top_tier(id: &str) -> bool {
    matches!(id, "binance" | "coinbase")
}
