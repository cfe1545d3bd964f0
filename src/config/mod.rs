//! Static configuration tables and runtime settings.
//!
//! Chains, tokens, exchanges and fee schedules are compile-time tables;
//! tunables are loaded from the environment in `settings`.

pub mod chains;
pub mod exchanges;
pub mod fees;
pub mod settings;
pub mod tokens;

pub use chains::{ChainConfig, ChainId, RouterConfig, CHAINS};
pub use exchanges::{ExchangeConfig, EXCHANGES};
pub use fees::withdrawal_fee_usd;
pub use settings::{ProfitTier, Settings};
pub use tokens::{normalize_symbol, Token, TokenRegistry, TRADING_PAIRS};
