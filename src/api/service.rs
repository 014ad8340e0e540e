//! Shared analysis logic for the REST adapter
//!
//! Holds the risk engine built at startup; every method only reads it.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::advisory::SuggestedEnvironment;
use crate::delay::{estimate_delay, DelayEstimate};
use crate::engine::{RiskEngine, ShipmentAnalysis};
use crate::error::{EngineError, Result};
use crate::models::ShipmentRequest;
use crate::routes::RouteProfile;

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub version: String,
    pub trained_at: NaiveDateTime,
    pub training_rows: usize,
    pub encoder_schema_version: u32,
    pub feature_count: usize,
    pub tree_count: usize,
}

/// Inputs for a standalone delay estimate
#[derive(Debug, Clone, Deserialize)]
pub struct DelayQuery {
    pub risk_pct: f64,
    pub weather_severity: u8,
    pub port_congestion: f64,
    pub sea_traffic_index: f64,
}

impl DelayQuery {
    fn validate(&self) -> Result<()> {
        if !self.risk_pct.is_finite() || !(0.0..=100.0).contains(&self.risk_pct) {
            return Err(EngineError::schema("risk_pct", "must be within [0, 100]"));
        }
        if !(1..=5).contains(&self.weather_severity) {
            return Err(EngineError::schema("weather_severity", "must be within 1..=5"));
        }
        for (field, value) in [
            ("port_congestion", self.port_congestion),
            ("sea_traffic_index", self.sea_traffic_index),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::schema(field, "must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

pub struct AnalysisService {
    engine: RiskEngine,
}

impl AnalysisService {
    pub fn new(engine: RiskEngine) -> Self {
        Self { engine }
    }

    /// Analyse a shipment; departure defaults to now (UTC)
    pub fn analyze(&self, shipment: &ShipmentRequest, departure: Option<NaiveDateTime>) -> Result<ShipmentAnalysis> {
        let departure = departure.unwrap_or_else(|| Utc::now().naive_utc());
        self.engine.analyze(shipment, departure)
    }

    pub fn model_info(&self) -> ModelInfo {
        let model = self.engine.model();
        ModelInfo {
            version: model.version.clone(),
            trained_at: model.trained_at,
            training_rows: model.training_rows,
            encoder_schema_version: self.engine.encoder().schema_version,
            feature_count: model.forest.n_features,
            tree_count: model.forest.trees.len(),
        }
    }

    pub fn route_profiles(&self) -> Vec<RouteProfile> {
        self.engine.routes().profiles().to_vec()
    }

    pub fn estimate_delay(&self, query: &DelayQuery) -> Result<DelayEstimate> {
        query.validate()?;
        Ok(estimate_delay(
            query.risk_pct,
            query.weather_severity,
            query.port_congestion,
            query.sea_traffic_index,
        ))
    }

    pub fn suggest_environment(&self, route_risk: f64) -> Result<SuggestedEnvironment> {
        if !(0.0..=1.0).contains(&route_risk) {
            return Err(EngineError::schema("route_risk", "must be within [0, 1]"));
        }
        Ok(SuggestedEnvironment::from_route_risk(route_risk))
    }
}
