//! Operator-facing interpretation of a risk score: tier, delay outlook,
//! recommended action and a plain-language explanation.

use serde::Serialize;

use crate::delay::{CONGESTION_THRESHOLD, SEVERE_WEATHER, TRAFFIC_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    Suspicious,
    HighRisk,
}

impl RiskTier {
    pub fn from_risk(risk: f64) -> Self {
        if risk <= 30.0 {
            RiskTier::Safe
        } else if risk <= 60.0 {
            RiskTier::Suspicious
        } else {
            RiskTier::HighRisk
        }
    }

    /// Whether the shipment is flagged as an anomaly
    pub fn is_anomalous(self) -> bool {
        self != RiskTier::Safe
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Safe => "Safe",
            RiskTier::Suspicious => "Suspicious",
            RiskTier::HighRisk => "High Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayOutlook {
    NoDelay,
    PossibleDelay,
    DelayLikely,
}

impl DelayOutlook {
    pub fn from_risk(risk: f64) -> Self {
        if risk <= 30.0 {
            DelayOutlook::NoDelay
        } else if risk <= 60.0 {
            DelayOutlook::PossibleDelay
        } else {
            DelayOutlook::DelayLikely
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DelayOutlook::NoDelay => "NO DELAY",
            DelayOutlook::PossibleDelay => "POSSIBLE DELAY",
            DelayOutlook::DelayLikely => "DELAY LIKELY",
        }
    }
}

pub fn recommend_action(risk: f64) -> &'static str {
    if risk >= 75.0 {
        "Reroute or delay shipment by 48 hours."
    } else if risk >= 45.0 {
        "Add buffer days and monitor conditions."
    } else {
        "Proceed as planned."
    }
}

pub fn explain(weather: u8, congestion: f64, traffic: f64) -> String {
    let mut reasons = Vec::new();
    if weather >= SEVERE_WEATHER {
        reasons.push("severe weather conditions");
    }
    if congestion > CONGESTION_THRESHOLD {
        reasons.push("high port congestion");
    }
    if traffic > TRAFFIC_THRESHOLD {
        reasons.push("dense sea traffic");
    }

    if reasons.is_empty() {
        return "Shipment conditions are stable with minimal operational risk.".to_string();
    }
    format!("High risk is primarily due to {}.", reasons.join(", "))
}

/// Environmental conditions suggested from route risk alone, for callers
/// without live weather/port feeds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuggestedEnvironment {
    pub weather_severity: u8,
    pub port_congestion: f64,
    pub sea_traffic_index: f64,
}

impl SuggestedEnvironment {
    pub fn from_route_risk(route_risk: f64) -> Self {
        let weather_severity = if route_risk > 0.65 {
            4
        } else if route_risk > 0.45 {
            3
        } else {
            2
        };
        let port_congestion = ((0.3 + route_risk).min(0.9) * 100.0).round() / 100.0;
        let sea_traffic_index = ((port_congestion + 0.1).min(0.9) * 100.0).round() / 100.0;
        Self {
            weather_severity,
            port_congestion,
            sea_traffic_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(RiskTier::from_risk(30.0), RiskTier::Safe);
        assert_eq!(RiskTier::from_risk(30.01), RiskTier::Suspicious);
        assert_eq!(RiskTier::from_risk(60.0), RiskTier::Suspicious);
        assert_eq!(RiskTier::from_risk(60.5), RiskTier::HighRisk);
        assert!(!RiskTier::Safe.is_anomalous());
        assert!(RiskTier::Suspicious.is_anomalous());
        assert_eq!(DelayOutlook::from_risk(42.0), DelayOutlook::PossibleDelay);
        assert_eq!(DelayOutlook::from_risk(61.0).label(), "DELAY LIKELY");
    }

    #[test]
    fn test_recommendation() {
        assert_eq!(recommend_action(80.0), "Reroute or delay shipment by 48 hours.");
        assert_eq!(recommend_action(45.0), "Add buffer days and monitor conditions.");
        assert_eq!(recommend_action(44.99), "Proceed as planned.");
    }

    #[test]
    fn test_explanation() {
        assert_eq!(
            explain(2, 0.3, 0.3),
            "Shipment conditions are stable with minimal operational risk."
        );
        assert_eq!(
            explain(5, 0.9, 0.3),
            "High risk is primarily due to severe weather conditions, high port congestion."
        );
    }

    #[test]
    fn test_suggested_environment() {
        let env = SuggestedEnvironment::from_route_risk(0.4);
        assert_eq!(env.weather_severity, 2);
        assert_eq!(env.port_congestion, 0.7);
        assert_eq!(env.sea_traffic_index, 0.8);

        let env = SuggestedEnvironment::from_route_risk(0.9);
        assert_eq!(env.weather_severity, 4);
        assert_eq!(env.port_congestion, 0.9);
        assert_eq!(env.sea_traffic_index, 0.9);

        assert_eq!(SuggestedEnvironment::from_route_risk(0.5).weather_severity, 3);
    }
}
