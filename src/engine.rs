//! Risk engine: the single analysis chain every adapter goes through
//!
//! validate -> encode -> predict -> project -> rank -> estimate delay.
//! Artifacts are loaded once and only read afterwards, so one engine can be
//! shared across threads without locking.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use crate::advisory::{explain, recommend_action, DelayOutlook, RiskTier};
use crate::config::EngineConfig;
use crate::delay::{estimate_delay, DelayEstimate};
use crate::encoder::FeatureEncoder;
use crate::error::{EngineError, Result};
use crate::models::ShipmentRequest;
use crate::risk_model::RiskModel;
use crate::routes::{project, rank, ProjectionParams, RouteProjection, RouteRanking, RouteTable};

/// Full result of one shipment analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentAnalysis {
    pub model_version: String,
    pub risk_pct: f64,
    pub tier: RiskTier,
    pub anomalous: bool,
    pub delay_outlook: DelayOutlook,
    pub delay: DelayEstimate,
    pub recommendation: String,
    pub explanation: String,
    /// Fraction of the voyage completed
    pub progress: f64,
    pub routes: Vec<RouteProjection>,
    pub ranking: RouteRanking,
}

impl ShipmentAnalysis {
    /// Projection for the route the request describes
    pub fn primary(&self) -> Option<&RouteProjection> {
        self.routes.iter().find(|r| r.route_name == "Primary")
    }
}

#[derive(Debug, Clone)]
pub struct RiskEngine {
    encoder: FeatureEncoder,
    model: RiskModel,
    routes: RouteTable,
    projection: ProjectionParams,
}

impl RiskEngine {
    pub fn new(
        encoder: FeatureEncoder,
        model: RiskModel,
        routes: RouteTable,
        projection: ProjectionParams,
    ) -> Result<Self> {
        encoder.validate()?;
        model.validate_against(&encoder)?;
        projection.validate()?;
        Ok(Self {
            encoder,
            model,
            routes,
            projection,
        })
    }

    /// Load artifacts and the route table named by `config`. Any problem is
    /// fatal so a misconfigured process never starts serving.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let encoder = FeatureEncoder::load(&config.encoder_path)?;
        let model = RiskModel::load(&config.model_path)?;
        let routes = match &config.route_profiles_path {
            Some(path) => RouteTable::load(path)?,
            None => RouteTable::default(),
        };

        let engine = Self::new(encoder, model, routes, config.projection.clone())?;
        info!(
            model = %engine.model.version,
            features = engine.encoder.width(),
            routes = engine.routes.profiles().len(),
            "risk engine ready"
        );
        Ok(engine)
    }

    pub fn model(&self) -> &RiskModel {
        &self.model
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn projection(&self) -> &ProjectionParams {
        &self.projection
    }

    /// Risk percent for a request, without route projection
    pub fn score(&self, request: &ShipmentRequest) -> Result<f64> {
        request.validate()?;
        let features = self.encoder.encode(&request.to_record())?;
        self.model.predict(&features)
    }

    pub fn analyze(&self, request: &ShipmentRequest, departure: NaiveDateTime) -> Result<ShipmentAnalysis> {
        let risk_pct = self.score(request)?;
        let routes = project(
            risk_pct,
            request.distance_km,
            departure,
            &self.routes,
            &self.projection,
        )?;
        let ranking = rank(&routes).ok_or_else(|| EngineError::config("route table is empty"))?;
        let delay = estimate_delay(
            risk_pct,
            request.weather_severity,
            request.port_congestion,
            request.sea_traffic_index,
        );

        let tier = RiskTier::from_risk(risk_pct);
        debug!(
            origin = %request.origin_port,
            destination = %request.destination_port,
            risk_pct,
            tier = tier.label(),
            delay_days = delay.days,
            "analysed shipment"
        );

        Ok(ShipmentAnalysis {
            model_version: self.model.version.clone(),
            risk_pct,
            tier,
            anomalous: tier.is_anomalous(),
            delay_outlook: DelayOutlook::from_risk(risk_pct),
            delay,
            recommendation: recommend_action(risk_pct).to_string(),
            explanation: explain(
                request.weather_severity,
                request.port_congestion,
                request.sea_traffic_index,
            ),
            progress: request.progress(),
            routes,
            ranking,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{sample_request, FieldValue};
    use crate::risk_model::constant_model;
    use crate::routes::RouteProfile;
    use chrono::{Duration, NaiveDate};

    pub(crate) fn test_encoder() -> FeatureEncoder {
        let mut other = sample_request();
        other.distance_km = 4200.0;
        other.port_congestion = 0.3;
        other.ship_type = "Bulk Carrier".to_string();
        other.origin_port = "Chennai Port".to_string();
        let mut records = vec![sample_request().to_record(), other.to_record()];
        records[1].set("ports_crossed", FieldValue::Missing);
        FeatureEncoder::fit(&records).unwrap()
    }

    pub(crate) fn constant_engine(value: f64) -> RiskEngine {
        let encoder = test_encoder();
        let model = constant_model(&encoder, value);
        RiskEngine::new(encoder, model, RouteTable::default(), ProjectionParams::default()).unwrap()
    }

    fn departure() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn test_analyze_scenario() {
        let engine = constant_engine(42.0);
        let analysis = engine.analyze(&sample_request(), departure()).unwrap();

        assert_eq!(analysis.risk_pct, 42.0);
        assert_eq!(analysis.tier, RiskTier::Suspicious);
        assert!(analysis.anomalous);
        assert_eq!(analysis.delay_outlook, DelayOutlook::PossibleDelay);
        assert_eq!(analysis.progress, 0.5);

        let risks: Vec<f64> = analysis.routes.iter().map(|r| r.risk_pct).collect();
        assert_eq!(risks, vec![42.0, 29.4, 52.5]);

        let primary = analysis.primary().unwrap();
        assert_eq!(primary.delay_days, 1.7);
        assert_eq!(primary.cost, 170_000.0);
        let offset_secs = ((8500.0 / 30.0 + 1.7 * 24.0) * 3600.0_f64).round() as i64;
        assert_eq!(primary.eta, departure() + Duration::seconds(offset_secs));

        assert_eq!(analysis.ranking.safest, "Safer");
        assert_eq!(analysis.ranking.fastest, "Safer");
        assert_eq!(analysis.ranking.cheapest, "Faster");
        assert_eq!(analysis.ranking.balanced, "Faster");

        // calm conditions: no environmental triggers, baseline probability
        assert_eq!(analysis.delay.days, 0);
        assert_eq!(analysis.delay.probability, 10.0);
        assert_eq!(analysis.recommendation, "Proceed as planned.");
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let engine = constant_engine(67.5);
        let a = engine.analyze(&sample_request(), departure()).unwrap();
        let b = engine.analyze(&sample_request(), departure()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.tier, RiskTier::HighRisk);
        assert_eq!(a.delay.days, 2);
    }

    #[test]
    fn test_unknown_category_is_scored() {
        let engine = constant_engine(12.0);
        let mut request = sample_request();
        request.destination_port = "Port of Atlantis".to_string();
        let analysis = engine.analyze(&request, departure()).unwrap();
        assert_eq!(analysis.tier, RiskTier::Safe);
        assert!(!analysis.anomalous);
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        let engine = constant_engine(42.0);
        let mut request = sample_request();
        request.port_congestion = 1.4;
        let err = engine.analyze(&request, departure()).unwrap_err();
        assert_eq!(err.field(), Some("port_congestion"));
    }

    #[test]
    fn test_oversized_distance_is_an_error_not_a_panic() {
        let engine = constant_engine(42.0);
        let mut request = sample_request();
        request.distance_km = 1e14;
        assert!(request.validate().is_ok());
        let err = engine.analyze(&request, departure()).unwrap_err();
        assert!(matches!(err, EngineError::Computation(_)));
    }

    #[test]
    fn test_mismatched_model_is_rejected() {
        let encoder = test_encoder();
        let mut model = constant_model(&encoder, 10.0);
        model.feature_names.pop();
        let err = RiskEngine::new(encoder, model, RouteTable::default(), ProjectionParams::default()).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_custom_route_table_order() {
        let encoder = test_encoder();
        let model = constant_model(&encoder, 50.0);
        let routes = RouteTable::new(vec![
            RouteProfile::new("Faster", 0.9, 1.25),
            RouteProfile::new("Primary", 1.0, 1.0),
            RouteProfile::new("Safer", 1.0, 1.0),
        ])
        .unwrap();
        let engine = RiskEngine::new(encoder, model, routes, ProjectionParams::default()).unwrap();
        let analysis = engine.analyze(&sample_request(), departure()).unwrap();
        // Primary and Safer tie on every key; the earlier entry wins
        assert_eq!(analysis.ranking.safest, "Primary");
        assert_eq!(analysis.ranking.cheapest, "Faster");
    }
}
