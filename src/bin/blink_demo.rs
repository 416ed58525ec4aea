//! Blink demo: cycles one or more indicators for a fixed time each.
//!
//! With no arguments it blinks green, red, then green again for five seconds apiece, which is a
//! quick way to check the wiring on a fresh board (`INDICATOR_BACKEND=gpio`).
use anyhow::{Context, Result};
use clap::Parser;
use drillbot::{
    config::Config,
    indicator::{self, Color, Indicator},
    logging,
    metrics::IndicatorMetrics,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "blink-demo", about = "Blink status indicators one after another")]
struct Cli {
    /// Colors to blink, in order.
    #[arg(long = "color", default_values = ["green", "red", "green"])]
    colors: Vec<String>,
    /// Seconds per half-cycle; 0 blinks once per second.
    #[arg(long, default_value_t = 0.0)]
    speed: f64,
    /// How long each color blinks.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Failed to load config from environment")?;
    logging::init_tracing(&config.log_file);

    let backend = indicator::build_backend(&config);
    backend
        .setup()
        .context("Failed to initialize the output system")?;
    let metrics = Arc::new(IndicatorMetrics::new());

    let mut indicators: Vec<Indicator> = Vec::new();
    for name in &cli.colors {
        let color: Color = name
            .parse()
            .with_context(|| format!("Invalid --color {name}"))?;
        if indicators.iter().all(|existing| existing.color() != color) {
            indicators.push(Indicator::new(color, backend.clone(), metrics.clone())?);
        }
    }

    for name in &cli.colors {
        let color: Color = name.parse()?;
        let Some(light) = indicators.iter().find(|existing| existing.color() == color) else {
            continue;
        };
        light.start(cli.speed).await;
        tokio::time::sleep(Duration::from_secs(cli.seconds)).await;
        light.stop().await;
    }

    backend.cleanup().context("Failed to release outputs")?;
    let snapshot = metrics.snapshot();
    tracing::info!(
        loops = snapshot.loops_started,
        toggles = snapshot.toggles,
        "Blink demo finished"
    );
    Ok(())
}
