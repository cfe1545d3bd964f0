//! OKX spot public API.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::cex::rest::{Exchange, MarketInfo, TickerQuote};
use crate::cex::venues::parse_price;

const BASE_URL: &str = "https://www.okx.com";

#[derive(Deserialize)]
struct OkxEnvelope<T> {
    code: String,
    data: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Instrument {
    inst_id: String,
    base_ccy: String,
    quote_ccy: String,
    state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OkxTicker {
    inst_id: String,
    bid_px: String,
    ask_px: String,
    /// 24h volume in quote currency for spot
    vol_ccy24h: String,
    ts: String,
}

pub struct Okx;

#[async_trait]
impl Exchange for Okx {
    fn id(&self) -> &'static str {
        "okx"
    }

    async fn load_markets(&self, client: &reqwest::Client) -> Result<Vec<MarketInfo>> {
        let envelope: OkxEnvelope<Instrument> = client
            .get(format!("{BASE_URL}/api/v5/public/instruments?instType=SPOT"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("okx instruments decode")?;
        if envelope.code != "0" {
            bail!("okx instruments error code {}", envelope.code);
        }

        Ok(envelope
            .data
            .into_iter()
            .filter(|i| i.state == "live")
            .map(|i| MarketInfo {
                base: i.base_ccy,
                quote: i.quote_ccy,
                native_symbol: i.inst_id,
            })
            .collect())
    }

    async fn fetch_tickers(
        &self,
        client: &reqwest::Client,
        wanted: &HashSet<String>,
    ) -> Result<Vec<TickerQuote>> {
        let envelope: OkxEnvelope<OkxTicker> = client
            .get(format!("{BASE_URL}/api/v5/market/tickers?instType=SPOT"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("okx tickers decode")?;
        if envelope.code != "0" {
            bail!("okx tickers error code {}", envelope.code);
        }

        Ok(envelope
            .data
            .into_iter()
            .filter(|t| wanted.contains(&t.inst_id))
            .filter_map(|t| {
                Some(TickerQuote {
                    bid: parse_price(&t.bid_px)?,
                    ask: parse_price(&t.ask_px)?,
                    quote_volume_24h: parse_price(&t.vol_ccy24h),
                    timestamp_ms: t.ts.parse().ok(),
                    native_symbol: t.inst_id,
                })
            })
            .collect())
    }

    async fn fetch_ticker(
        &self,
        client: &reqwest::Client,
        native_symbol: &str,
    ) -> Result<Option<TickerQuote>> {
        let envelope: OkxEnvelope<OkxTicker> = client
            .get(format!("{BASE_URL}/api/v5/market/ticker?instId={native_symbol}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("okx ticker decode")?;
        if envelope.code != "0" {
            return Ok(None);
        }

        Ok(envelope.data.into_iter().next().and_then(|t| {
            Some(TickerQuote {
                bid: parse_price(&t.bid_px)?,
                ask: parse_price(&t.ask_px)?,
                quote_volume_24h: parse_price(&t.vol_ccy24h),
                timestamp_ms: t.ts.parse().ok(),
                native_symbol: t.inst_id,
            })
        }))
    }
}
