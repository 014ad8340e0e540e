//! One-shot shipment analysis from the command line
//!
//! Usage:
//!   cargo run --release -- --origin "Mumbai Port" --destination Rotterdam \
//!     --ship-type "Container Ship" --product Electronics --route-risk 0.4
//!
//! Weather, congestion and traffic are suggested from the route risk when not
//! given. Distance falls back to the sea-route table and the port count to an
//! estimate from distance.

use anyhow::{anyhow, Context, Result};
use cargo_guard::advisory::SuggestedEnvironment;
use cargo_guard::catalog::{estimate_ports, route_distance_km};
use cargo_guard::config::EngineConfig;
use cargo_guard::models::{ShipmentPriority, ShipmentRequest};
use cargo_guard::{RiskEngine, ShipmentAnalysis};
use chrono::{NaiveDateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cargo_guard")]
#[command(about = "Score a shipment's risk and compare route variants")]
struct Args {
    /// Engine config (JSON); defaults when omitted
    #[arg(long, env = "CARGOGUARD_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    origin: String,

    #[arg(long)]
    destination: String,

    #[arg(long)]
    ship_type: String,

    #[arg(long)]
    product: String,

    /// Route risk score (0.0 - 1.0)
    #[arg(long)]
    route_risk: f64,

    /// Shipment distance in km
    #[arg(long)]
    distance_km: Option<f64>,

    /// Ports on the voyage (default: estimated from distance)
    #[arg(long)]
    total_ports: Option<u32>,

    #[arg(long, default_value = "0")]
    ports_crossed: u32,

    /// Port congestion (0.0 - 1.0)
    #[arg(long)]
    congestion: Option<f64>,

    /// Sea traffic index (0.0 - 1.0)
    #[arg(long)]
    traffic: Option<f64>,

    /// Weather severity (1 - 5)
    #[arg(long)]
    weather: Option<u8>,

    /// Shipment priority (1 = high, 3 = low)
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(1..=3))]
    priority: u8,

    /// Departure time, e.g. 2026-03-01T08:00:00 (default: now, UTC)
    #[arg(long)]
    departure: Option<NaiveDateTime>,

    /// Print the analysis as JSON
    #[arg(long)]
    json: bool,
}

fn build_request(args: &Args) -> Result<ShipmentRequest> {
    let suggested = SuggestedEnvironment::from_route_risk(args.route_risk.clamp(0.0, 1.0));
    let distance_km = args
        .distance_km
        .unwrap_or_else(|| route_distance_km(&args.origin, &args.destination));

    Ok(ShipmentRequest {
        distance_km,
        route_risk_score: args.route_risk,
        total_ports: args.total_ports.unwrap_or_else(|| estimate_ports(distance_km)),
        ports_crossed: args.ports_crossed,
        port_congestion: args.congestion.unwrap_or(suggested.port_congestion),
        sea_traffic_index: args.traffic.unwrap_or(suggested.sea_traffic_index),
        weather_severity: args.weather.unwrap_or(suggested.weather_severity),
        shipment_priority: ShipmentPriority::try_from(args.priority).map_err(|e| anyhow!(e))?,
        ship_type: args.ship_type.clone(),
        product_category: args.product.clone(),
        origin_port: args.origin.clone(),
        destination_port: args.destination.clone(),
    })
}

fn print_analysis(request: &ShipmentRequest, analysis: &ShipmentAnalysis) {
    println!("=== Shipment ===");
    println!(
        "  {} -> {}  ({:.0} km, {} / {})",
        request.origin_port, request.destination_port, request.distance_km, request.ship_type, request.product_category
    );
    println!(
        "  Voyage progress: {:.0}% ({} of {} ports)",
        analysis.progress * 100.0,
        request.ports_crossed,
        request.total_ports
    );
    println!();

    println!("=== Risk ===");
    println!("  Risk:            {:.2}%  [{}]", analysis.risk_pct, analysis.tier.label());
    println!("  Delay outlook:   {}", analysis.delay_outlook.label());
    println!(
        "  Expected delay:  {} days ({:.1}% probability)",
        analysis.delay.days, analysis.delay.probability
    );
    println!("  Why:             {}", analysis.explanation);
    println!("  Action:          {}", analysis.recommendation);
    println!("  Model:           {}", analysis.model_version);
    println!();

    println!("=== Route Comparison ===");
    println!(
        "  {:<8} {:>10} {:>8} {:>7} {:>17} {:>12} {:>9} {:>12}",
        "Route", "Dist km", "Risk %", "Delay", "ETA", "Cost", "CO2 t", "Insurance"
    );
    for route in &analysis.routes {
        println!(
            "  {:<8} {:>10.0} {:>8.2} {:>7.1} {:>17} {:>12.2} {:>9.2} {:>12.2}",
            route.route_name,
            route.distance_km,
            route.risk_pct,
            route.delay_days,
            route.eta.format("%Y-%m-%d %H:%M"),
            route.cost,
            route.co2_tons,
            route.insurance
        );
    }
    println!();
    println!(
        "  Safest: {}   Fastest: {}   Cheapest: {}   Balanced: {}",
        analysis.ranking.safest, analysis.ranking.fastest, analysis.ranking.cheapest, analysis.ranking.balanced
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .init();

    let args = Args::parse();
    let config = EngineConfig::load_or_default(args.config.as_deref())?;
    let engine = RiskEngine::from_config(&config).context("loading risk engine")?;

    let request = build_request(&args)?;
    let departure = args.departure.unwrap_or_else(|| Utc::now().naive_utc());
    let analysis = engine.analyze(&request, departure)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&request, &analysis);
    }
    Ok(())
}
