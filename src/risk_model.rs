//! Versioned risk model artifact: encoded features -> risk percent

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::encoder::FeatureEncoder;
use crate::error::{EngineError, Result};
use crate::forest::RandomForest;
use crate::models::EncodedFeatures;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    /// Training run identifier
    pub version: String,
    pub trained_at: NaiveDateTime,
    pub training_rows: usize,
    /// Encoded column layout the forest was trained on
    pub feature_names: Vec<String>,
    pub forest: RandomForest,
}

impl RiskModel {
    /// Predict a risk percent in [0, 100], rounded to 2 decimals.
    pub fn predict(&self, features: &EncodedFeatures) -> Result<f64> {
        let raw = self.forest.predict(features.as_slice())?;
        if !raw.is_finite() {
            return Err(EngineError::computation(format!(
                "model {} produced a non-finite score",
                self.version
            )));
        }
        Ok((raw.clamp(0.0, 100.0) * 100.0).round() / 100.0)
    }

    /// Check the artifact is internally sound and aligned with `encoder`.
    pub fn validate_against(&self, encoder: &FeatureEncoder) -> Result<()> {
        self.forest.validate()?;
        if self.feature_names.len() != self.forest.n_features {
            return Err(EngineError::config(format!(
                "model {} lists {} features but its forest expects {}",
                self.version,
                self.feature_names.len(),
                self.forest.n_features
            )));
        }
        let expected = encoder.feature_names();
        if self.feature_names != expected {
            let first_diff = self
                .feature_names
                .iter()
                .zip(&expected)
                .position(|(a, b)| a != b)
                .unwrap_or(self.feature_names.len().min(expected.len()));
            return Err(EngineError::config(format!(
                "model {} feature layout differs from encoder at column {} ({} vs {} columns)",
                self.version,
                first_diff,
                self.feature_names.len(),
                expected.len()
            )));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&raw)
            .map_err(|e| EngineError::config(format!("corrupt model artifact {}: {}", path.display(), e)))?;
        info!(
            path = %path.display(),
            version = %model.version,
            trees = model.forest.trees.len(),
            "loaded risk model"
        );
        Ok(model)
    }
}

#[cfg(test)]
pub(crate) fn constant_model(encoder: &FeatureEncoder, value: f64) -> RiskModel {
    RiskModel {
        version: "test".to_string(),
        trained_at: chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap(),
        training_rows: 0,
        feature_names: encoder.feature_names(),
        forest: RandomForest::constant(encoder.width(), value),
    }
}
