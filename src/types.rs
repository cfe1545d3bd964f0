//! Core data structures: unified quotes, the per-scan price matrix, and
//! emitted opportunities.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::chains::{AdapterKind, ChainId};
use crate::config::exchanges::is_top_tier;
use crate::config::settings::ProfitTier;

/// Where a quote came from. Per-kind behavior (slippage factor, gas and
/// withdrawal-fee contribution) hangs off this variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Venue {
    Cex {
        venue: String,
    },
    Dex {
        venue: String,
        chain: ChainId,
        /// Pool protocol, drives the gas-cost contribution
        kind: AdapterKind,
        /// Router fee as a percentage, already folded into bid/ask
        fee_percent: f64,
    },
}

impl Venue {
    pub fn is_cex(&self) -> bool {
        matches!(self, Venue::Cex { .. })
    }

    pub fn is_dex(&self) -> bool {
        matches!(self, Venue::Dex { .. })
    }

    pub fn chain(&self) -> Option<ChainId> {
        match self {
            Venue::Cex { .. } => None,
            Venue::Dex { chain, .. } => Some(*chain),
        }
    }

    /// Fixed top-of-book slippage factor for a 1k-sized trade.
    /// DEX quotes already embed reserve-based impact, so no extra factor.
    pub fn slippage_factor(&self) -> f64 {
        match self {
            Venue::Cex { venue } => {
                if is_top_tier(venue) {
                    0.0002
                } else {
                    0.0005
                }
            }
            Venue::Dex { .. } => 0.0,
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Venue::Cex { venue } => write!(f, "{venue}"),
            Venue::Dex { venue, chain, .. } => write!(f, "{venue}@{chain}"),
        }
    }
}

/// Unified price source entry in the matrix.
///
/// Invariant: bid > 0 and ask > 0 (enforced at the fetch boundary). The
/// timestamp is the source's reported time when present, else acquisition
/// time. DEX quotes have the router fee applied symmetrically around pool
/// spot before they land here.
#[derive(Debug, Clone)]
pub struct Quote {
    pub venue: Venue,
    /// Quote units received per base unit sold
    pub bid: f64,
    /// Quote units paid per base unit bought
    pub ask: f64,
    pub timestamp: DateTime<Utc>,
    /// 24h volume in quote units; streams don't report one
    pub volume_24h: Option<f64>,
}

impl Quote {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn age_secs(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_milliseconds() as f64 / 1000.0
    }
}

/// Symbol (normalized `BASE/QUOTE`) to all quotes seen this scan.
/// Rebuilt from scratch every scan; never carries state across scans.
pub type PriceMatrix = HashMap<String, Vec<Quote>>;

/// A profitable directed pair: buy on one venue, sell on another.
/// Immutable once emitted.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub symbol: String,
    pub buy: Quote,
    pub sell: Quote,
    /// Effective buy price after slippage adjustment
    pub buy_price: f64,
    /// Effective sell price after slippage adjustment
    pub sell_price: f64,
    pub spread_pct: f64,
    pub gross_profit_usd: f64,
    pub gas_cost_usd: f64,
    pub withdrawal_fee_usd: f64,
    pub net_profit_usd: f64,
    pub tier: Option<ProfitTier>,
    pub timestamp: DateTime<Utc>,
}

impl Opportunity {
    pub fn is_cross_chain(&self) -> bool {
        match (self.buy.venue.chain(), self.sell.venue.chain()) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }

    pub fn involves_dex(&self) -> bool {
        self.buy.venue.is_dex() || self.sell.venue.is_dex()
    }
}

/// Leg direction in a triangular loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Single-venue A->B->C->A loop through hub assets.
#[derive(Debug, Clone)]
pub struct TriangularOpportunity {
    pub venue: String,
    /// Markets in leg order
    pub symbol_path: [String; 3],
    pub trade_path: [Side; 3],
    /// Return over one loop starting from 1 unit of the first-leg base,
    /// as a percentage
    pub expected_profit_pct: f64,
    pub timestamp: DateTime<Utc>,
}
