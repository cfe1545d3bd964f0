//! Binance spot public API.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::cex::rest::{Exchange, MarketInfo, TickerQuote};
use crate::cex::venues::parse_price;

const BASE_URL: &str = "https://api.binance.com";

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    symbol: String,
    bid_price: String,
    ask_price: String,
    quote_volume: String,
    close_time: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTicker {
    bid_price: String,
    ask_price: String,
}

pub struct Binance;

#[async_trait]
impl Exchange for Binance {
    fn id(&self) -> &'static str {
        "binance"
    }

    async fn load_markets(&self, client: &reqwest::Client) -> Result<Vec<MarketInfo>> {
        let info: ExchangeInfo = client
            .get(format!("{BASE_URL}/api/v3/exchangeInfo"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("binance exchangeInfo decode")?;

        Ok(info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| MarketInfo {
                base: s.base_asset,
                quote: s.quote_asset,
                native_symbol: s.symbol,
            })
            .collect())
    }

    async fn fetch_tickers(
        &self,
        client: &reqwest::Client,
        wanted: &HashSet<String>,
    ) -> Result<Vec<TickerQuote>> {
        // The full 24h table in one request; filtering locally beats
        // encoding hundreds of symbols into the query string.
        let tickers: Vec<Ticker24h> = client
            .get(format!("{BASE_URL}/api/v3/ticker/24hr"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("binance ticker/24hr decode")?;

        Ok(tickers
            .into_iter()
            .filter(|t| wanted.contains(&t.symbol))
            .filter_map(|t| {
                Some(TickerQuote {
                    bid: parse_price(&t.bid_price)?,
                    ask: parse_price(&t.ask_price)?,
                    quote_volume_24h: parse_price(&t.quote_volume),
                    timestamp_ms: Some(t.close_time),
                    native_symbol: t.symbol,
                })
            })
            .collect())
    }

    async fn fetch_ticker(
        &self,
        client: &reqwest::Client,
        native_symbol: &str,
    ) -> Result<Option<TickerQuote>> {
        let response = client
            .get(format!(
                "{BASE_URL}/api/v3/ticker/bookTicker?symbol={native_symbol}"
            ))
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let ticker: BookTicker = response.json().await.context("binance bookTicker decode")?;

        let (Some(bid), Some(ask)) = (parse_price(&ticker.bid_price), parse_price(&ticker.ask_price))
        else {
            return Ok(None);
        };

        Ok(Some(TickerQuote {
            native_symbol: native_symbol.to_string(),
            bid,
            ask,
            timestamp_ms: None,
            quote_volume_24h: None,
        }))
    }
}
