//! Intra-exchange triangular arbitrage.
//!
//! Walks A->B->C->A loops through a fixed hub set on each venue
//! individually, using top-of-book prices from the same CEX snapshot the
//! cross-venue scan consumes. Fees and rate limits are not modeled; the
//! consumer applies its own fee model when ranking.

use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use crate::types::{Quote, Side, TriangularOpportunity};

/// Intermediate assets loops route through. A fixed, highly liquid set
/// keeps the search linear in listed bases instead of a graph traversal.
const HUBS: [&str; 4] = ["USDT", "USDC", "BTC", "ETH"];

/// Minimum loop return over break-even, in percent.
const MIN_PROFIT_PCT: f64 = 0.1;

/// Top-of-book for one market.
#[derive(Debug, Clone, Copy)]
struct Book {
    bid: f64,
    ask: f64,
}

/// One currency conversion through a market. `from_is_base` tells whether
/// we sell the base (hit the bid) or buy it (pay the ask).
fn convert(amount: f64, from_is_base: bool, book: Book) -> (f64, Side) {
    if from_is_base {
        (amount * book.bid, Side::Sell)
    } else {
        (amount / book.ask, Side::Buy)
    }
}

pub struct TriangularStrategy {
    min_profit_pct: f64,
}

impl TriangularStrategy {
    pub fn new() -> Self {
        Self {
            min_profit_pct: MIN_PROFIT_PCT,
        }
    }

    /// Find loops across all venues in the CEX snapshot.
    pub fn find_opportunities(
        &self,
        cex_quotes: &HashMap<String, Vec<Quote>>,
    ) -> Vec<TriangularOpportunity> {
        // Group top-of-book by venue
        let mut venues: HashMap<String, HashMap<String, Book>> = HashMap::new();
        for (symbol, quotes) in cex_quotes {
            for quote in quotes {
                if let crate::types::Venue::Cex { venue } = &quote.venue {
                    venues.entry(venue.clone()).or_default().insert(
                        symbol.clone(),
                        Book {
                            bid: quote.bid,
                            ask: quote.ask,
                        },
                    );
                }
            }
        }

        let mut results = Vec::new();
        for (venue, markets) in &venues {
            self.scan_venue(venue, markets, &mut results);
        }

        if !results.is_empty() {
            debug!("Found {} triangular loops", results.len());
        }
        results
    }

    fn scan_venue(
        &self,
        venue: &str,
        markets: &HashMap<String, Book>,
        results: &mut Vec<TriangularOpportunity>,
    ) {
        // Every listed base that is not itself a hub
        let mut bases: Vec<&str> = markets
            .keys()
            .filter_map(|s| s.split_once('/').map(|(base, _)| base))
            .filter(|base| !HUBS.contains(base))
            .collect();
        bases.sort_unstable();
        bases.dedup();

        for base in bases {
            for i in 0..HUBS.len() {
                for j in (i + 1)..HUBS.len() {
                    let (h1, h2) = (HUBS[i], HUBS[j]);

                    let p1_sym = format!("{base}/{h1}");
                    let p3_sym = format!("{base}/{h2}");
                    let (Some(&p1), Some(&p3)) = (markets.get(&p1_sym), markets.get(&p3_sym))
                    else {
                        continue;
                    };

                    // The hub cross trades in whichever orientation the
                    // venue lists it
                    let (hub_sym, hub_book, h1_is_base) =
                        match markets.get(&format!("{h1}/{h2}")) {
                            Some(&book) => (format!("{h1}/{h2}"), book, true),
                            None => match markets.get(&format!("{h2}/{h1}")) {
                                Some(&book) => (format!("{h2}/{h1}"), book, false),
                                None => continue,
                            },
                        };

                    // Forward: base -> h1 -> h2 -> base
                    self.check_loop(
                        venue,
                        [&p1_sym, &hub_sym, &p3_sym],
                        [p1, hub_book, p3],
                        h1_is_base,
                        results,
                    );
                    // Reverse: base -> h2 -> h1 -> base
                    self.check_loop(
                        venue,
                        [&p3_sym, &hub_sym, &p1_sym],
                        [p3, hub_book, p1],
                        !h1_is_base,
                        results,
                    );
                }
            }
        }
    }

    /// Value one loop starting from 1 unit of the first market's base.
    /// `mid_from_is_base` is whether the asset entering the hub cross is
    /// that market's base currency.
    fn check_loop(
        &self,
        venue: &str,
        symbols: [&String; 3],
        books: [Book; 3],
        mid_from_is_base: bool,
        results: &mut Vec<TriangularOpportunity>,
    ) {
        // Leg 1: sell base into the first hub
        let (after_first, side1) = convert(1.0, true, books[0]);
        // Leg 2: cross between hubs
        let (after_mid, side2) = convert(after_first, mid_from_is_base, books[1]);
        // Leg 3: buy base back with the second hub
        let (final_amount, side3) = convert(after_mid, false, books[2]);

        if !final_amount.is_finite() {
            return;
        }
        let profit_pct = (final_amount - 1.0) * 100.0;
        if profit_pct > self.min_profit_pct {
            results.push(TriangularOpportunity {
                venue: venue.to_string(),
                symbol_path: [symbols[0].clone(), symbols[1].clone(), symbols[2].clone()],
                trade_path: [side1, side2, side3],
                expected_profit_pct: profit_pct,
                timestamp: Utc::now(),
            });
        }
    }
}

impl Default for TriangularStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Venue;

    fn quote(venue: &str, bid: f64, ask: f64) -> Quote {
        Quote {
            venue: Venue::Cex {
                venue: venue.to_string(),
            },
            bid,
            ask,
            timestamp: Utc::now(),
            volume_24h: None,
        }
    }

    fn snapshot(venue: &str, markets: &[(&str, f64, f64)]) -> HashMap<String, Vec<Quote>> {
        markets
            .iter()
            .map(|(symbol, bid, ask)| (symbol.to_string(), vec![quote(venue, *bid, *ask)]))
            .collect()
    }

    #[test]
    fn eth_hub_loop_detected() {
        // Selling SOL into ETH, ETH into USDT, and buying SOL back with
        // USDT returns 0.0502 * 2000 / 100 = 1.004 per SOL
        let quotes = snapshot(
            "binance",
            &[
                ("SOL/USDT", 100.0, 100.0),
                ("ETH/USDT", 2000.0, 2000.0),
                ("SOL/ETH", 0.0502, 0.0502),
            ],
        );

        let opportunities = TriangularStrategy::new().find_opportunities(&quotes);
        assert_eq!(opportunities.len(), 1);

        let opp = &opportunities[0];
        assert_eq!(opp.venue, "binance");
        assert!((opp.expected_profit_pct - 0.398).abs() < 0.01);
        assert_eq!(
            opp.symbol_path,
            ["SOL/ETH".to_string(), "ETH/USDT".into(), "SOL/USDT".into()]
        );
        assert_eq!(opp.trade_path, [Side::Sell, Side::Sell, Side::Buy]);
    }

    #[test]
    fn balanced_prices_yield_nothing() {
        // Perfectly consistent pricing: 0.05 * 2000 = 100, no loop value
        let quotes = snapshot(
            "binance",
            &[
                ("SOL/USDT", 100.0, 100.0),
                ("ETH/USDT", 2000.0, 2000.0),
                ("SOL/ETH", 0.05, 0.05),
            ],
        );
        assert!(TriangularStrategy::new()
            .find_opportunities(&quotes)
            .is_empty());
    }

    #[test]
    fn sub_threshold_profit_is_dropped() {
        // Loop value 1.0008 (0.08%) stays below the 0.1% floor
        let quotes = snapshot(
            "binance",
            &[
                ("SOL/USDT", 100.0, 100.0),
                ("ETH/USDT", 2000.0, 2000.0),
                ("SOL/ETH", 0.05004, 0.05004),
            ],
        );
        assert!(TriangularStrategy::new()
            .find_opportunities(&quotes)
            .is_empty());
    }

    #[test]
    fn loops_never_mix_venues() {
        // The discrepancy spans two venues; a single-venue loop must not
        // combine their books
        let mut quotes = snapshot(
            "binance",
            &[("SOL/USDT", 100.0, 100.0), ("ETH/USDT", 2000.0, 2000.0)],
        );
        quotes.insert(
            "SOL/ETH".to_string(),
            vec![quote("okx", 0.0502, 0.0502)],
        );
        assert!(TriangularStrategy::new()
            .find_opportunities(&quotes)
            .is_empty());
    }

    #[test]
    fn missing_hub_cross_is_skipped() {
        let quotes = snapshot(
            "binance",
            &[("SOL/USDT", 100.0, 100.0), ("SOL/ETH", 0.0502, 0.0502)],
        );
        assert!(TriangularStrategy::new()
            .find_opportunities(&quotes)
            .is_empty());
    }

    #[test]
    fn wide_spreads_erase_the_edge() {
        // Same mids as the profitable case but spreads eat the 0.4%
        let quotes = snapshot(
            "binance",
            &[
                ("SOL/USDT", 99.5, 100.5),
                ("ETH/USDT", 1995.0, 2005.0),
                ("SOL/ETH", 0.0500, 0.0504),
            ],
        );
        assert!(TriangularStrategy::new()
            .find_opportunities(&quotes)
            .is_empty());
    }
}
