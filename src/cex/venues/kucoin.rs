//! KuCoin spot public API.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::cex::rest::{Exchange, MarketInfo, TickerQuote};
use crate::cex::venues::parse_price;

const BASE_URL: &str = "https://api.kucoin.com";

#[derive(Deserialize)]
struct KucoinEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KucoinSymbol {
    symbol: String,
    base_currency: String,
    quote_currency: String,
    enable_trading: bool,
}

#[derive(Deserialize)]
struct AllTickers {
    time: i64,
    ticker: Vec<KucoinTicker>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KucoinTicker {
    symbol: String,
    /// best bid
    buy: Option<String>,
    /// best ask
    sell: Option<String>,
    /// 24h volume in quote currency
    vol_value: Option<String>,
}

pub struct Kucoin;

#[async_trait]
impl Exchange for Kucoin {
    fn id(&self) -> &'static str {
        "kucoin"
    }

    async fn load_markets(&self, client: &reqwest::Client) -> Result<Vec<MarketInfo>> {
        let envelope: KucoinEnvelope<Vec<KucoinSymbol>> = client
            .get(format!("{BASE_URL}/api/v2/symbols"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("kucoin symbols decode")?;

        Ok(envelope
            .data
            .into_iter()
            .filter(|s| s.enable_trading)
            .map(|s| MarketInfo {
                base: s.base_currency,
                quote: s.quote_currency,
                native_symbol: s.symbol,
            })
            .collect())
    }

    async fn fetch_tickers(
        &self,
        client: &reqwest::Client,
        wanted: &HashSet<String>,
    ) -> Result<Vec<TickerQuote>> {
        let envelope: KucoinEnvelope<AllTickers> = client
            .get(format!("{BASE_URL}/api/v1/market/allTickers"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("kucoin allTickers decode")?;

        let server_time = envelope.data.time;
        Ok(envelope
            .data
            .ticker
            .into_iter()
            .filter(|t| wanted.contains(&t.symbol))
            .filter_map(|t| {
                Some(TickerQuote {
                    bid: parse_price(t.buy.as_deref()?)?,
                    ask: parse_price(t.sell.as_deref()?)?,
                    quote_volume_24h: t.vol_value.as_deref().and_then(parse_price),
                    timestamp_ms: Some(server_time),
                    native_symbol: t.symbol,
                })
            })
            .collect())
    }
}
