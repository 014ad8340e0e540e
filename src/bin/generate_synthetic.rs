//! Synthetic shipment dataset generator
//!
//! Writes a training CSV over the known ship types, cargo categories and
//! ports, with a small share of environmentally stressed voyages.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --rows <N>           Number of shipments (default: 18000)
//!   --stress-rate <F>    Share of stressed voyages (default: 0.06)
//!   --missing-rate <F>   Share of blanked cells (default: 0.0)
//!   --seed <N>           Random seed (default: 42)
//!   --output <PATH>      Output CSV path (default: data/shipments.csv)

use anyhow::{Context, Result};
use cargo_guard::synthetic::{write_csv, SyntheticParams};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Synthetic data generator for the shipment risk model
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate a synthetic shipment training dataset")]
struct Args {
    /// Number of rows to generate
    #[arg(long, default_value = "18000")]
    rows: usize,

    /// Probability of a stressed voyage (0.0 - 1.0)
    #[arg(long, default_value = "0.06")]
    stress_rate: f64,

    /// Probability of blanking a nullable cell (0.0 - 1.0)
    #[arg(long, default_value = "0.0")]
    missing_rate: f64,

    /// Random seed for reproducibility
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output CSV path
    #[arg(long, default_value = "data/shipments.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.stress_rate) && (0.0..=1.0).contains(&args.missing_rate),
        "rates must be within [0, 1]"
    );

    println!("🔧 Synthetic Shipment Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Output:           {}", args.output.display());
    println!("Rows:             {}", args.rows);
    println!("Stress rate:      {:.1}%", args.stress_rate * 100.0);
    println!("Missing rate:     {:.1}%", args.missing_rate * 100.0);
    println!("Random seed:      {}", args.seed);
    println!();

    // Ensure output directory exists
    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let params = SyntheticParams {
        rows: args.rows,
        stress_rate: args.stress_rate,
        missing_rate: args.missing_rate,
        seed: args.seed,
    };
    let file = File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    let written = write_csv(&params, BufWriter::new(file))?;

    println!("✅ Wrote {} shipments to {}", written, args.output.display());
    Ok(())
}
