use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{EngineError, Result};

/// Numeric model inputs, in encoded-column order
pub const NUMERIC_FIELDS: [&str; 7] = [
    "shipment_distance_km",
    "route_risk_score",
    "total_ports",
    "ports_crossed",
    "port_congestion",
    "sea_traffic_index",
    "weather_severity",
];

/// Categorical model inputs, in encoded-column order
pub const CATEGORICAL_FIELDS: [&str; 5] = [
    "ship_type",
    "product_category",
    "origin_port",
    "destination_port",
    "shipment_priority",
];

/// Environmental stress signals seen by the anomaly detector
pub const DETECTOR_FIELDS: [&str; 3] = ["port_congestion", "sea_traffic_index", "weather_severity"];

/// Shipment priority level (1 = highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ShipmentPriority {
    High,
    Standard,
    Low,
}

impl TryFrom<u8> for ShipmentPriority {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(ShipmentPriority::High),
            2 => Ok(ShipmentPriority::Standard),
            3 => Ok(ShipmentPriority::Low),
            other => Err(format!("shipment priority must be 1, 2 or 3 (got {})", other)),
        }
    }
}

impl From<ShipmentPriority> for u8 {
    fn from(p: ShipmentPriority) -> u8 {
        match p {
            ShipmentPriority::High => 1,
            ShipmentPriority::Standard => 2,
            ShipmentPriority::Low => 3,
        }
    }
}

impl fmt::Display for ShipmentPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// A shipment submitted for analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    #[serde(alias = "shipment_distance_km")]
    pub distance_km: f64,
    pub route_risk_score: f64,
    pub total_ports: u32,
    pub ports_crossed: u32,
    pub port_congestion: f64,
    pub sea_traffic_index: f64,
    pub weather_severity: u8,
    pub shipment_priority: ShipmentPriority,
    pub ship_type: String,
    pub product_category: String,
    pub origin_port: String,
    pub destination_port: String,
}

fn check_unit_interval(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::schema(field, format!("must be within [0, 1] (got {})", value)));
    }
    Ok(())
}

impl ShipmentRequest {
    /// Boundary validation, run before anything reaches the encoder.
    ///
    /// `ports_crossed <= total_ports` and `origin != destination` are left to
    /// the caller.
    pub fn validate(&self) -> Result<()> {
        if !self.distance_km.is_finite() || self.distance_km <= 0.0 {
            return Err(EngineError::schema(
                "shipment_distance_km",
                format!("must be a positive number (got {})", self.distance_km),
            ));
        }
        check_unit_interval("route_risk_score", self.route_risk_score)?;
        check_unit_interval("port_congestion", self.port_congestion)?;
        check_unit_interval("sea_traffic_index", self.sea_traffic_index)?;

        if self.total_ports < 1 {
            return Err(EngineError::schema("total_ports", "must be at least 1"));
        }
        if !(1..=5).contains(&self.weather_severity) {
            return Err(EngineError::schema(
                "weather_severity",
                format!("must be within 1..=5 (got {})", self.weather_severity),
            ));
        }

        for (field, value) in [
            ("ship_type", &self.ship_type),
            ("product_category", &self.product_category),
            ("origin_port", &self.origin_port),
            ("destination_port", &self.destination_port),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::schema(field, "must not be empty"));
            }
        }
        Ok(())
    }

    /// Fraction of the voyage completed, by ports crossed
    pub fn progress(&self) -> f64 {
        (self.ports_crossed as f64 / self.total_ports.max(1) as f64).min(1.0)
    }

    pub fn to_record(&self) -> FeatureRecord {
        let mut record = FeatureRecord::new();
        record.set("shipment_distance_km", FieldValue::Number(self.distance_km));
        record.set("route_risk_score", FieldValue::Number(self.route_risk_score));
        record.set("total_ports", FieldValue::Number(self.total_ports as f64));
        record.set("ports_crossed", FieldValue::Number(self.ports_crossed as f64));
        record.set("port_congestion", FieldValue::Number(self.port_congestion));
        record.set("sea_traffic_index", FieldValue::Number(self.sea_traffic_index));
        record.set("weather_severity", FieldValue::Number(self.weather_severity as f64));
        record.set("ship_type", FieldValue::Text(self.ship_type.clone()));
        record.set("product_category", FieldValue::Text(self.product_category.clone()));
        record.set("origin_port", FieldValue::Text(self.origin_port.clone()));
        record.set("destination_port", FieldValue::Text(self.destination_port.clone()));
        record.set(
            "shipment_priority",
            FieldValue::Number(u8::from(self.shipment_priority) as f64),
        );
        record
    }
}

/// A single cell of a loosely-typed shipment record
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    /// Interpret a raw CSV cell. Blank cells are missing; numeric-looking
    /// cells become numbers.
    pub fn from_cell(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
            return FieldValue::Missing;
        }
        match cell.parse::<f64>() {
            Ok(v) => FieldValue::Number(v),
            Err(_) => FieldValue::Text(cell.to_string()),
        }
    }
}

/// Render a numeric category the way it is stored in the vocabulary
/// (`1.0` -> `"1"`).
pub fn category_label(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Named record fed to the feature encoder. Absent keys are schema errors,
/// `Missing` values are imputed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &str, value: FieldValue) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    fn get(&self, field: &str) -> Result<&FieldValue> {
        self.fields
            .get(field)
            .ok_or_else(|| EngineError::schema(field, "required field is absent"))
    }

    /// Numeric value, `None` when missing
    pub fn number(&self, field: &str) -> Result<Option<f64>> {
        match self.get(field)? {
            FieldValue::Number(v) if v.is_finite() => Ok(Some(*v)),
            FieldValue::Number(v) => Err(EngineError::schema(field, format!("non-finite value {}", v))),
            FieldValue::Text(t) => Err(EngineError::schema(field, format!("expected a number, got `{}`", t))),
            FieldValue::Missing => Ok(None),
        }
    }

    /// Categorical value as a vocabulary label, `None` when missing
    pub fn category(&self, field: &str) -> Result<Option<String>> {
        match self.get(field)? {
            FieldValue::Text(t) => Ok(Some(t.clone())),
            FieldValue::Number(v) if v.is_finite() => Ok(Some(category_label(*v))),
            FieldValue::Number(v) => Err(EngineError::schema(field, format!("non-finite value {}", v))),
            FieldValue::Missing => Ok(None),
        }
    }
}

/// Fixed-width numeric vector consumed by the risk model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedFeatures(Vec<f64>);

impl EncodedFeatures {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample_request() -> ShipmentRequest {
    ShipmentRequest {
        distance_km: 8500.0,
        route_risk_score: 0.4,
        total_ports: 6,
        ports_crossed: 3,
        port_congestion: 0.6,
        sea_traffic_index: 0.5,
        weather_severity: 3,
        shipment_priority: ShipmentPriority::High,
        ship_type: "Container Ship".to_string(),
        product_category: "Electronics".to_string(),
        origin_port: "Mumbai Port".to_string(),
        destination_port: "Rotterdam".to_string(),
    }
}
