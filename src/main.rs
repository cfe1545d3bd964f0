//! Continuous scanner entry point: runs the scan loop forever, prints a
//! ranked table each tick, and appends opportunities to the CSV log.
//! Ctrl-C shuts down cleanly.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arbscan::report::OpportunityCsvLogger;
use arbscan::types::Opportunity;
use arbscan::{ScanEngine, Settings};

fn print_ranked(opportunities: &[Opportunity]) {
    if opportunities.is_empty() {
        return;
    }

    println!(
        "{:<4} {:<6} {:<12} {:<24} {:>12} {:<24} {:>12} {:>8} {:>8}",
        "#", "TIER", "SYMBOL", "BUY", "PRICE", "SELL", "PRICE", "SPREAD", "NET"
    );
    for (i, opp) in opportunities.iter().take(15).enumerate() {
        let tier = opp
            .tier
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<6} {:<12} {:<24} {:>12.4} {:<24} {:>12.4} {:>7.2}% {:>7.2}$",
            i + 1,
            tier,
            opp.symbol,
            opp.buy.venue.to_string(),
            opp.buy_price,
            opp.sell.venue.to_string(),
            opp.sell_price,
            opp.spread_pct,
            opp.net_profit_usd,
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let settings = Settings::from_env();
    info!("Starting arbitrage scanner (dry_run={})", settings.dry_run);

    let mut csv = (!settings.csv_path.is_empty())
        .then(|| OpportunityCsvLogger::new(settings.csv_path.clone()));

    let mut engine = ScanEngine::initialize(settings).await?;

    let scan_loop = engine.run_continuous(
        || {},
        move |opportunities| {
            print_ranked(opportunities);
            if let Some(csv) = csv.as_mut() {
                csv.log(opportunities);
            }
        },
    );

    tokio::select! {
        _ = scan_loop => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
