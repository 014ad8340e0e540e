//! Engine and training configuration
//!
//! Both configs deserialize from JSON with every field defaulted, so a config
//! file only needs to name what it overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::anomaly::IsolationParams;
use crate::error::{EngineError, Result};
use crate::forest::ForestParams;
use crate::routes::ProjectionParams;

pub const DEFAULT_ENCODER_PATH: &str = "models/pipeline.json";
pub const DEFAULT_MODEL_PATH: &str = "models/risk_model.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub encoder_path: PathBuf,
    pub model_path: PathBuf,
    /// JSON array of route profiles; built-in table when absent
    pub route_profiles_path: Option<PathBuf>,
    pub projection: ProjectionParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            encoder_path: PathBuf::from(DEFAULT_ENCODER_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            route_profiles_path: None,
            projection: ProjectionParams::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| EngineError::config(format!("invalid engine config {}: {}", path.display(), e)))
    }

    /// Config file when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub isolation: IsolationParams,
    pub forest: ForestParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            isolation: IsolationParams::default(),
            forest: ForestParams::default(),
        }
    }
}

impl TrainingConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| EngineError::config(format!("invalid training config {}: {}", path.display(), e)))
    }

    /// Use one seed for both the detector and the forest
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.isolation.seed = seed;
        self.forest.seed = seed;
        self
    }
}
