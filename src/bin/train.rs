//! Offline training for the shipment risk model
//!
//! Reads a shipment CSV, manufactures an anomaly-percent target with an
//! isolation forest over the environmental columns, fits the feature encoder
//! and the random-forest regressor, then writes both artifacts.
//!
//! Usage:
//!   cargo run --release --bin train -- --data data/shipments.csv

use anyhow::{Context, Result};
use cargo_guard::config::{TrainingConfig, DEFAULT_ENCODER_PATH, DEFAULT_MODEL_PATH};
use cargo_guard::training::{train, write_artifacts, TrainingSet};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(about = "Train the risk encoder and regressor from a shipment CSV")]
struct Args {
    /// Training CSV path
    #[arg(long, default_value = "data/shipments.csv")]
    data: PathBuf,

    /// Training config (JSON); defaults when omitted
    #[arg(long, env = "CARGOGUARD_TRAINING_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for both the detector and the regressor
    #[arg(long)]
    seed: Option<u64>,

    /// Encoder artifact output path
    #[arg(long, default_value = DEFAULT_ENCODER_PATH)]
    encoder_out: PathBuf,

    /// Model artifact output path
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    model_out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let set = TrainingSet::from_path(&args.data).with_context(|| format!("loading {}", args.data.display()))?;
    let artifacts = train(&set, &config)?;
    write_artifacts(&artifacts, &args.encoder_out, &args.model_out)?;

    let percent = &artifacts.calibration.percent;
    let mean = percent.iter().sum::<f64>() / percent.len() as f64;
    info!(
        flagged = artifacts.calibration.flagged_count(),
        mean_anomaly_pct = mean,
        "calibration summary"
    );

    println!();
    println!("=== Training Complete ===");
    println!("  Model version:   {}", artifacts.model.version);
    println!("  Rows:            {}", artifacts.model.training_rows);
    println!("  Encoded columns: {}", artifacts.encoder.width());
    println!("  Trees:           {}", artifacts.model.forest.trees.len());
    println!(
        "  Anomalies:       {} ({:.1}%)",
        artifacts.calibration.flagged_count(),
        artifacts.calibration.flagged_count() as f64 / percent.len() as f64 * 100.0
    );
    println!("  Encoder:         {}", args.encoder_out.display());
    println!("  Model:           {}", args.model_out.display());

    Ok(())
}
