//! Centralized-exchange price acquisition: REST polling for the wide
//! venue set, WebSocket streaming for the top tier.

pub mod rest;
pub mod stream;
pub mod venues;

pub use rest::{MarketInfo, RestFetcher, TickerQuote};
pub use stream::{StreamBook, StreamSubscriber};
