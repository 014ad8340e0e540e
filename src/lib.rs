//! Shipment risk scoring and route comparison engine
//!
//! A trained encoder + regressor pair turns a shipment into a risk percent,
//! which is then projected across the Primary/Safer/Faster route variants.

pub mod advisory;
pub mod anomaly;
pub mod api;
pub mod catalog;
pub mod config;
pub mod delay;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod forest;
pub mod models;
pub mod risk_model;
pub mod routes;
pub mod synthetic;
pub mod training;

pub use engine::{RiskEngine, ShipmentAnalysis};
pub use error::{EngineError, Result};
