//! Coinbase Exchange public API.
//!
//! No batch ticker endpoint: the fetcher issues one request per product,
//! each gated by the rate governor.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::cex::rest::{Exchange, MarketInfo, TickerQuote};
use crate::cex::venues::parse_price;

const BASE_URL: &str = "https://api.exchange.coinbase.com";

#[derive(Deserialize)]
struct Product {
    id: String,
    base_currency: String,
    quote_currency: String,
    status: String,
}

#[derive(Deserialize)]
struct ProductTicker {
    bid: String,
    ask: String,
    time: Option<DateTime<Utc>>,
}

pub struct Coinbase;

#[async_trait]
impl Exchange for Coinbase {
    fn id(&self) -> &'static str {
        "coinbase"
    }

    fn supports_batch_tickers(&self) -> bool {
        false
    }

    async fn load_markets(&self, client: &reqwest::Client) -> Result<Vec<MarketInfo>> {
        let products: Vec<Product> = client
            .get(format!("{BASE_URL}/products"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("coinbase products decode")?;

        Ok(products
            .into_iter()
            .filter(|p| p.status == "online")
            .map(|p| MarketInfo {
                base: p.base_currency,
                quote: p.quote_currency,
                native_symbol: p.id,
            })
            .collect())
    }

    async fn fetch_tickers(
        &self,
        _client: &reqwest::Client,
        _wanted: &HashSet<String>,
    ) -> Result<Vec<TickerQuote>> {
        // Per-symbol venue; the fetcher routes through fetch_ticker
        Ok(Vec::new())
    }

    async fn fetch_ticker(
        &self,
        client: &reqwest::Client,
        native_symbol: &str,
    ) -> Result<Option<TickerQuote>> {
        let response = client
            .get(format!("{BASE_URL}/products/{native_symbol}/ticker"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let ticker: ProductTicker = response.json().await.context("coinbase ticker decode")?;

        let (Some(bid), Some(ask)) = (parse_price(&ticker.bid), parse_price(&ticker.ask)) else {
            return Ok(None);
        };

        Ok(Some(TickerQuote {
            native_symbol: native_symbol.to_string(),
            bid,
            ask,
            timestamp_ms: ticker.time.map(|t| t.timestamp_millis()),
            // The ticker reports base volume only; leave quote volume
            // unset so the reliability filter skips the check
            quote_volume_24h: None,
        }))
    }
}
