//! Opportunity CSV logging.
//!
//! Appends one row per emitted opportunity for offline analysis. The file
//! is created with a header on first open and appended to thereafter.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::types::Opportunity;

const CSV_HEADER: &str = "timestamp,tier,symbol,buy_venue,buy_price,sell_venue,sell_price,spread_pct,gross_profit,gas_cost,fee_cost,net_profit";

pub struct OpportunityCsvLogger {
    path: PathBuf,
    file: Option<File>,
}

impl OpportunityCsvLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = open_with_header(&path);
        if file.is_some() {
            info!("Opportunity CSV: {}", path.display());
        }
        Self { path, file }
    }

    /// Append one row per opportunity. Write failures are logged and the
    /// scan continues; CSV output is best-effort.
    pub fn log(&mut self, opportunities: &[Opportunity]) {
        if opportunities.is_empty() {
            return;
        }
        let Some(file) = self.file.as_mut() else {
            return;
        };

        for opp in opportunities {
            let tier = opp
                .tier
                .map(|t| t.to_string())
                .unwrap_or_else(|| "LOW".to_string());
            let line = format!(
                "{},{},{},{},{:.6},{},{:.6},{:.2}%,${:.2},${:.2},${:.2},${:.2}\n",
                opp.timestamp.format("%Y-%m-%d %H:%M:%S"),
                tier,
                opp.symbol,
                opp.buy.venue,
                opp.buy_price,
                opp.sell.venue,
                opp.sell_price,
                opp.spread_pct,
                opp.gross_profit_usd,
                opp.gas_cost_usd,
                opp.withdrawal_fee_usd,
                opp.net_profit_usd,
            );
            if let Err(e) = file.write_all(line.as_bytes()) {
                warn!("CSV write failed for {}: {e}", self.path.display());
                return;
            }
        }

        if let Err(e) = file.flush() {
            warn!("CSV flush failed for {}: {e}", self.path.display());
        }
    }
}

fn open_with_header(path: &Path) -> Option<File> {
    let exists = path.exists();
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut file) => {
            if !exists {
                if let Err(e) = writeln!(file, "{CSV_HEADER}") {
                    warn!("Failed to write CSV header to {}: {e}", path.display());
                    return None;
                }
            }
            Some(file)
        }
        Err(e) => {
            warn!("Failed to open {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Quote, Venue};
    use chrono::Utc;

    fn sample_opportunity() -> Opportunity {
        let buy = Quote {
            venue: Venue::Cex {
                venue: "okx".into(),
            },
            bid: 3000.0,
            ask: 3001.0,
            timestamp: Utc::now(),
            volume_24h: Some(1_000_000.0),
        };
        let sell = Quote {
            venue: Venue::Cex {
                venue: "kucoin".into(),
            },
            bid: 3100.0,
            ask: 3101.0,
            timestamp: Utc::now(),
            volume_24h: Some(1_000_000.0),
        };
        Opportunity {
            symbol: "ETH/USDT".into(),
            buy_price: 3002.5,
            sell_price: 3098.4,
            spread_pct: 3.19,
            gross_profit_usd: 31.9,
            gas_cost_usd: 2.0,
            withdrawal_fee_usd: 5.0,
            net_profit_usd: 24.9,
            tier: Some(crate::config::settings::ProfitTier::High),
            timestamp: Utc::now(),
            buy,
            sell,
        }
    }

    #[test]
    fn header_written_once_and_rows_appended() {
        let dir = std::env::temp_dir().join("arbscan-csv-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("opps-{}.csv", std::process::id()));
        let _ = std::fs::remove_file(&path);

        {
            let mut logger = OpportunityCsvLogger::new(&path);
            logger.log(&[sample_opportunity()]);
        }
        {
            let mut logger = OpportunityCsvLogger::new(&path);
            logger.log(&[sample_opportunity()]);
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("ETH/USDT"));
        assert!(lines[1].contains("HIGH"));
        assert!(lines[1].contains("okx"));

        let _ = std::fs::remove_file(&path);
    }
}
