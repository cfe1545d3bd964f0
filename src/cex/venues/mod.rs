//! Per-venue REST API adapters. Public market-data endpoints only.

mod binance;
mod bybit;
mod coinbase;
mod gateio;
mod kucoin;
mod okx;

pub use binance::Binance;
pub use bybit::Bybit;
pub use coinbase::Coinbase;
pub use gateio::Gateio;
pub use kucoin::Kucoin;
pub use okx::Okx;

/// Exchanges report numbers as strings; absent or malformed fields
/// surface as `None` rather than failing the whole batch.
pub(crate) fn parse_price(s: &str) -> Option<f64> {
    let value: f64 = s.parse().ok()?;
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}
