//! Headless entry point: perform N scans, print the top opportunities
//! from each, and exit. Useful for smoke-testing venue and chain
//! connectivity without the long-running loop.

use anyhow::Result;
use clap::Parser;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

use arbscan::{ScanEngine, Settings};

#[derive(Parser)]
#[command(about = "Run a fixed number of arbitrage scans and exit")]
struct Args {
    /// Number of scans to perform
    #[arg(long, default_value_t = Settings::default_headless_scans())]
    scans: u64,

    /// Top opportunities to print per scan
    #[arg(long, default_value_t = 5)]
    top: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let args = Args::parse();
    let settings = Settings::from_env();

    info!("Starting headless scanner ({} scans)", args.scans);
    let mut engine = ScanEngine::initialize(settings).await?;

    for i in 1..=args.scans {
        info!("--- SCAN {i} ---");
        let started = Instant::now();
        let opportunities = engine.scan().await?;

        info!(
            "Scan {i} complete in {:.2}s, found {} opportunities",
            started.elapsed().as_secs_f64(),
            opportunities.len()
        );

        for (rank, opp) in opportunities.iter().take(args.top).enumerate() {
            info!(
                "OPP #{}: {} | Spread: {:.2}% | Profit: ${:.2} | {} -> {}",
                rank + 1,
                opp.symbol,
                opp.spread_pct,
                opp.net_profit_usd,
                opp.buy.venue,
                opp.sell.venue,
            );
        }

        for opp in engine.triangular_opportunities().iter().take(2) {
            info!(
                "TRI: {} | {} | Profit: {:.2}%",
                opp.venue,
                opp.symbol_path.join(" -> "),
                opp.expected_profit_pct,
            );
        }

        if i < args.scans {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    Ok(())
}
