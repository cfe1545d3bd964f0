//! Bybit spot public API (v5).

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::cex::rest::{Exchange, MarketInfo, TickerQuote};
use crate::cex::venues::parse_price;

const BASE_URL: &str = "https://api.bybit.com";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitEnvelope<T> {
    ret_code: i64,
    result: BybitList<T>,
    time: i64,
}

#[derive(Deserialize)]
struct BybitList<T> {
    list: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentInfo {
    symbol: String,
    base_coin: String,
    quote_coin: String,
    status: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitTicker {
    symbol: String,
    bid1_price: String,
    ask1_price: String,
    /// 24h turnover in quote currency
    turnover24h: String,
}

pub struct Bybit;

#[async_trait]
impl Exchange for Bybit {
    fn id(&self) -> &'static str {
        "bybit"
    }

    async fn load_markets(&self, client: &reqwest::Client) -> Result<Vec<MarketInfo>> {
        let envelope: BybitEnvelope<InstrumentInfo> = client
            .get(format!(
                "{BASE_URL}/v5/market/instruments-info?category=spot&limit=1000"
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("bybit instruments decode")?;
        if envelope.ret_code != 0 {
            bail!("bybit instruments error code {}", envelope.ret_code);
        }

        Ok(envelope
            .result
            .list
            .into_iter()
            .filter(|i| i.status == "Trading")
            .map(|i| MarketInfo {
                base: i.base_coin,
                quote: i.quote_coin,
                native_symbol: i.symbol,
            })
            .collect())
    }

    async fn fetch_tickers(
        &self,
        client: &reqwest::Client,
        wanted: &HashSet<String>,
    ) -> Result<Vec<TickerQuote>> {
        let envelope: BybitEnvelope<BybitTicker> = client
            .get(format!("{BASE_URL}/v5/market/tickers?category=spot"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("bybit tickers decode")?;
        if envelope.ret_code != 0 {
            bail!("bybit tickers error code {}", envelope.ret_code);
        }

        let server_time = envelope.time;
        Ok(envelope
            .result
            .list
            .into_iter()
            .filter(|t| wanted.contains(&t.symbol))
            .filter_map(|t| {
                Some(TickerQuote {
                    bid: parse_price(&t.bid1_price)?,
                    ask: parse_price(&t.ask1_price)?,
                    quote_volume_24h: parse_price(&t.turnover24h),
                    timestamp_ms: Some(server_time),
                    native_symbol: t.symbol,
                })
            })
            .collect())
    }
}
