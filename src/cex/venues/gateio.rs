//! Gate.io spot public API (v4).

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::cex::rest::{Exchange, MarketInfo, TickerQuote};
use crate::cex::venues::parse_price;

const BASE_URL: &str = "https://api.gateio.ws";

#[derive(Deserialize)]
struct CurrencyPair {
    id: String,
    base: String,
    quote: String,
    trade_status: String,
}

#[derive(Deserialize)]
struct GateTicker {
    currency_pair: String,
    highest_bid: String,
    lowest_ask: String,
    quote_volume: String,
}

pub struct Gateio;

#[async_trait]
impl Exchange for Gateio {
    fn id(&self) -> &'static str {
        "gateio"
    }

    async fn load_markets(&self, client: &reqwest::Client) -> Result<Vec<MarketInfo>> {
        let pairs: Vec<CurrencyPair> = client
            .get(format!("{BASE_URL}/api/v4/spot/currency_pairs"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("gateio currency_pairs decode")?;

        Ok(pairs
            .into_iter()
            .filter(|p| p.trade_status == "tradable")
            .map(|p| MarketInfo {
                base: p.base,
                quote: p.quote,
                native_symbol: p.id,
            })
            .collect())
    }

    async fn fetch_tickers(
        &self,
        client: &reqwest::Client,
        wanted: &HashSet<String>,
    ) -> Result<Vec<TickerQuote>> {
        let tickers: Vec<GateTicker> = client
            .get(format!("{BASE_URL}/api/v4/spot/tickers"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("gateio tickers decode")?;

        Ok(tickers
            .into_iter()
            .filter(|t| wanted.contains(&t.currency_pair))
            .filter_map(|t| {
                Some(TickerQuote {
                    bid: parse_price(&t.highest_bid)?,
                    ask: parse_price(&t.lowest_ask)?,
                    quote_volume_24h: parse_price(&t.quote_volume),
                    // Gate's ticker table carries no per-row timestamp
                    timestamp_ms: None,
                    native_symbol: t.currency_pair,
                })
            })
            .collect())
    }
}
