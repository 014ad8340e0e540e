//! Synthetic shipment dataset generator
//!
//! Produces training CSVs over the catalog vocabularies with controlled random
//! variation. A small share of rows gets stressed environmental signals so the
//! anomaly detector has something to find.

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::io::Write;

use crate::catalog::{
    estimate_ports, great_circle_km, port_names, DEFAULT_ROUTE_DISTANCE_KM, PRODUCT_CATEGORIES, SHIP_TYPES,
};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct SyntheticParams {
    pub rows: usize,
    /// Share of rows with stressed weather/congestion/traffic
    pub stress_rate: f64,
    /// Share of cells blanked out to exercise imputation
    pub missing_rate: f64,
    pub seed: u64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            rows: 18_000,
            stress_rate: 0.06,
            missing_rate: 0.0,
            seed: 42,
        }
    }
}

/// One row of the training CSV (column names match the training schema)
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentRow {
    pub shipment_distance_km: Option<f64>,
    pub route_risk_score: Option<f64>,
    pub total_ports: Option<u32>,
    pub ports_crossed: Option<u32>,
    pub port_congestion: f64,
    pub sea_traffic_index: f64,
    pub weather_severity: u8,
    pub ship_type: Option<String>,
    pub product_category: Option<String>,
    pub origin_port: String,
    pub destination_port: String,
    pub shipment_priority: u8,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Sea distance is longer than great-circle; unknown pairs get a typical leg
fn sea_distance(origin: &str, destination: &str, rng: &mut impl Rng) -> f64 {
    let direct = great_circle_km(origin, destination).unwrap_or(DEFAULT_ROUTE_DISTANCE_KM);
    (direct * rng.gen_range(1.2..1.6)).max(150.0).round()
}

/// Blank out a value with the configured probability
fn maybe_blank<T>(value: T, rate: f64, rng: &mut impl Rng) -> Option<T> {
    if rate > 0.0 && rng.gen_bool(rate) {
        None
    } else {
        Some(value)
    }
}

fn generate_row(params: &SyntheticParams, ports: &[&str], rng: &mut impl Rng) -> ShipmentRow {
    let origin = *ports.choose(rng).unwrap_or(&"Mumbai Port");
    let destination = loop {
        let candidate = *ports.choose(rng).unwrap_or(&"Rotterdam");
        if candidate != origin || ports.len() < 2 {
            break candidate;
        }
    };

    let distance = sea_distance(origin, destination, rng);
    let total_ports = estimate_ports(distance) + rng.gen_range(0..3);
    let ports_crossed = rng.gen_range(0..=total_ports);
    let route_risk = round2(rng.gen_range(0.05..0.85));

    let stressed = rng.gen_bool(params.stress_rate.clamp(0.0, 1.0));
    let (port_congestion, sea_traffic_index, weather_severity) = if stressed {
        (
            round2(rng.gen_range(0.8..1.0)),
            round2(rng.gen_range(0.8..1.0)),
            rng.gen_range(4..=5),
        )
    } else {
        (
            round2((0.2 + route_risk * 0.5 + rng.gen_range(-0.1..0.1)).clamp(0.0, 0.85)),
            round2(rng.gen_range(0.1..0.75)),
            rng.gen_range(1..=3),
        )
    };

    let missing = params.missing_rate;
    ShipmentRow {
        shipment_distance_km: maybe_blank(distance, missing, rng),
        route_risk_score: maybe_blank(route_risk, missing, rng),
        total_ports: maybe_blank(total_ports, missing, rng),
        ports_crossed: maybe_blank(ports_crossed, missing, rng),
        port_congestion,
        sea_traffic_index,
        weather_severity,
        ship_type: maybe_blank(SHIP_TYPES.choose(rng).unwrap_or(&SHIP_TYPES[0]).to_string(), missing, rng),
        product_category: maybe_blank(
            PRODUCT_CATEGORIES.choose(rng).unwrap_or(&PRODUCT_CATEGORIES[0]).to_string(),
            missing,
            rng,
        ),
        origin_port: origin.to_string(),
        destination_port: destination.to_string(),
        shipment_priority: rng.gen_range(1..=3),
    }
}

pub fn generate(params: &SyntheticParams) -> Vec<ShipmentRow> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let ports = port_names();
    (0..params.rows).map(|_| generate_row(params, &ports, &mut rng)).collect()
}

/// Generate and write a CSV dataset, returning the row count
pub fn write_csv<W: Write>(params: &SyntheticParams, out: W) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(out);
    let rows = generate(params);
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}
