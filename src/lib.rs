//! Cross-venue crypto arbitrage scanner.
//!
//! Unifies CEX order-book tickers (REST + WebSocket) and on-chain DEX
//! pool quotes across EVM chains into one price matrix, then enumerates
//! profitable directed pairs net of gas, trading fees, slippage, and
//! withdrawal costs. Detection only; nothing here submits transactions.

pub mod cex;
pub mod config;
pub mod contracts;
pub mod dex;
pub mod engine;
pub mod gas;
pub mod rate_limit;
pub mod report;
pub mod rpc;
pub mod triangular;
pub mod types;

// Re-export commonly used types
pub use config::{ProfitTier, Settings};
pub use engine::ScanEngine;
pub use types::{Opportunity, PriceMatrix, Quote, TriangularOpportunity, Venue};
