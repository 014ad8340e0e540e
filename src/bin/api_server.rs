//! REST API Server for shipment risk analysis
//!
//! Loads the encoder and model artifacts once at startup and serves analyses
//! from them. A missing or mismatched artifact stops the server before it
//! binds.
//!
//! Usage:
//!   ./target/release/api_server [options]
//!
//! Options:
//!   --port PORT       Port to listen on (default: 8080, env PORT)
//!   --config PATH     Engine config JSON (env CARGOGUARD_CONFIG)
//!
//! REST endpoints:
//!   GET  /api/v1/health               - Health check
//!   GET  /api/v1/model                - Loaded model metadata
//!   GET  /api/v1/routes/profiles      - Route profile table
//!   POST /api/v1/analyze              - Full shipment analysis
//!   POST /api/v1/delay/estimate       - Rule-based delay estimate
//!   GET  /api/v1/environment/suggest?route_risk=X - Suggested conditions

use anyhow::Result;
use cargo_guard::api::{create_rest_router, AnalysisService};
use cargo_guard::config::EngineConfig;
use cargo_guard::RiskEngine;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "api_server")]
#[command(about = "Serve shipment risk analysis over REST")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Engine config (JSON); defaults when omitted
    #[arg(long, env = "CARGOGUARD_CONFIG")]
    config: Option<PathBuf>,
}

fn print_banner(port: u16, config: &EngineConfig, engine: &RiskEngine) {
    println!("============================================================");
    println!("         CARGO GUARD SHIPMENT RISK API SERVER");
    println!("============================================================");
    println!();
    println!("  Port:     {}", port);
    println!("  REST:     http://localhost:{}/api/v1/", port);
    println!("  Encoder:  {}", config.encoder_path.display());
    println!("  Model:    {} ({})", config.model_path.display(), engine.model().version);
    println!();
    println!("REST Endpoints:");
    println!("  GET  /api/v1/health                Health check");
    println!("  GET  /api/v1/model                 Model metadata");
    println!("  GET  /api/v1/routes/profiles       Route profiles");
    println!("  POST /api/v1/analyze               Shipment analysis");
    println!("  POST /api/v1/delay/estimate        Delay estimate");
    println!("  GET  /api/v1/environment/suggest   Suggested conditions");
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();

    let config = EngineConfig::load_or_default(args.config.as_deref())?;
    let engine = RiskEngine::from_config(&config)?;
    print_banner(args.port, &config, &engine);

    let service = Arc::new(AnalysisService::new(engine));
    let app = create_rest_router(service);

    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
