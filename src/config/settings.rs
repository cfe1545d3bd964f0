//! Runtime settings loaded from the environment (.env supported).
//! Every knob has a sane default so the scanner runs with no config at all.

use std::fmt;

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Minimum net profit (USD, after all costs) to emit an opportunity
    pub min_profit_usd: f64,
    /// Trade size used for profit calculations and DEX quote sizing
    pub default_trade_size_usd: f64,
    /// Sleep between scans
    pub scan_interval_secs: f64,
    /// CEX quotes older than this are dropped (tolerant; REST polling
    /// cadence dominates the age)
    pub cex_stale_secs: f64,
    /// DEX quotes older than this are dropped (strict; chain state moves
    /// per block)
    pub dex_stale_secs: f64,
    /// CEX quotes with a reported 24h quote volume below this are dropped
    pub min_volume_24h_usd: f64,
    /// Re-harvest the CEX market universe this often
    pub harvest_interval_secs: f64,
    /// A harvested pair must trade on at least this many venues
    pub harvest_min_venues: usize,
    /// Cap on symbols handed to the stream subscriber
    pub stream_symbol_cap: usize,
    /// Concurrent DEX quote tasks (bounds RPC fan-out)
    pub dex_concurrency: usize,
    /// Never submit transactions; this scanner only observes
    pub dry_run: bool,
    /// Append opportunities to this CSV file ("" disables)
    pub csv_path: String,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            min_profit_usd: env_f64("MIN_PROFIT_USD", 5.0),
            default_trade_size_usd: env_f64("DEFAULT_TRADE_SIZE_USD", 1000.0),
            scan_interval_secs: env_f64("SCAN_INTERVAL_SECONDS", 0.5),
            cex_stale_secs: env_f64("CEX_STALE_SECONDS", 600.0),
            dex_stale_secs: env_f64("DEX_STALE_SECONDS", 10.0),
            min_volume_24h_usd: env_f64("MIN_VOLUME_24H_USD", 50_000.0),
            harvest_interval_secs: env_f64("HARVEST_INTERVAL_SECONDS", 600.0),
            harvest_min_venues: env_usize("HARVEST_MIN_VENUES", 2),
            stream_symbol_cap: env_usize("STREAM_SYMBOL_CAP", 500),
            dex_concurrency: env_usize("DEX_CONCURRENCY", 25),
            dry_run: env_bool("DRY_RUN", true),
            csv_path: std::env::var("OPPORTUNITY_CSV")
                .unwrap_or_else(|_| "arbitrage_opportunities.csv".to_string()),
        }
    }

    /// How many scans the headless binary runs by default.
    pub fn default_headless_scans() -> u64 {
        env_u64("HEADLESS_SCANS", 3)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_profit_usd: 5.0,
            default_trade_size_usd: 1000.0,
            scan_interval_secs: 0.5,
            cex_stale_secs: 600.0,
            dex_stale_secs: 10.0,
            min_volume_24h_usd: 50_000.0,
            harvest_interval_secs: 600.0,
            harvest_min_venues: 2,
            stream_symbol_cap: 500,
            dex_concurrency: 25,
            dry_run: true,
            csv_path: String::new(),
        }
    }
}

/// Profit tiers for alerting, highest threshold first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfitTier {
    Critical,
    High,
    Medium,
}

impl ProfitTier {
    /// Tier thresholds in USD, descending.
    const TABLE: &'static [(f64, ProfitTier)] = &[
        (50.0, ProfitTier::Critical),
        (20.0, ProfitTier::High),
        (5.0, ProfitTier::Medium),
    ];

    /// Highest tier whose threshold the profit meets, if any.
    pub fn for_profit(net_profit_usd: f64) -> Option<ProfitTier> {
        Self::TABLE
            .iter()
            .find(|(threshold, _)| net_profit_usd >= *threshold)
            .map(|(_, tier)| *tier)
    }
}

impl fmt::Display for ProfitTier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProfitTier::Critical => write!(f, "CRITICAL"),
            ProfitTier::High => write!(f, "HIGH"),
            ProfitTier::Medium => write!(f, "MEDIUM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_assignment_descending() {
        assert_eq!(ProfitTier::for_profit(120.0), Some(ProfitTier::Critical));
        assert_eq!(ProfitTier::for_profit(50.0), Some(ProfitTier::Critical));
        assert_eq!(ProfitTier::for_profit(21.0), Some(ProfitTier::High));
        assert_eq!(ProfitTier::for_profit(5.0), Some(ProfitTier::Medium));
        assert_eq!(ProfitTier::for_profit(4.99), None);
    }

    #[test]
    fn defaults_match_operational_values() {
        let settings = Settings::default();
        assert_eq!(settings.min_profit_usd, 5.0);
        assert_eq!(settings.default_trade_size_usd, 1000.0);
        assert_eq!(settings.stream_symbol_cap, 500);
        assert!(settings.dry_run);
    }
}
