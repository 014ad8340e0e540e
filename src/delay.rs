//! Rule-based delay estimator
//!
//! Each rule contributes independently, so several triggers stack.

use serde::{Deserialize, Serialize};

/// Weather severity at or above which +2 days apply
pub const SEVERE_WEATHER: u8 = 4;
pub const WEATHER_DELAY_DAYS: u32 = 2;
pub const CONGESTION_THRESHOLD: f64 = 0.7;
pub const TRAFFIC_THRESHOLD: f64 = 0.8;
pub const HIGH_RISK_THRESHOLD: f64 = 60.0;
/// Extra days when risk exceeds [`HIGH_RISK_THRESHOLD`]
pub const HIGH_RISK_DELAY_DAYS: u32 = 2;
/// Probability reported when no rule fires
pub const BASELINE_DELAY_PROBABILITY: f64 = 10.0;
pub const MAX_DELAY_PROBABILITY: f64 = 99.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayEstimate {
    pub days: u32,
    /// Percent chance of delay
    pub probability: f64,
}

pub fn estimate_delay(risk: f64, weather: u8, congestion: f64, traffic: f64) -> DelayEstimate {
    let mut days = 0;
    if weather >= SEVERE_WEATHER {
        days += WEATHER_DELAY_DAYS;
    }
    if congestion > CONGESTION_THRESHOLD {
        days += 1;
    }
    if traffic > TRAFFIC_THRESHOLD {
        days += 1;
    }
    if risk > HIGH_RISK_THRESHOLD {
        days += HIGH_RISK_DELAY_DAYS;
    }

    let probability = if days > 0 {
        let p = (risk.max(0.0) + days as f64 * 10.0).min(MAX_DELAY_PROBABILITY);
        (p * 100.0).round() / 100.0
    } else {
        BASELINE_DELAY_PROBABILITY
    };

    DelayEstimate { days, probability }
}
