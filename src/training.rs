//! Offline training pipeline
//!
//! CSV -> anomaly calibration (synthetic target) -> encoder fit -> forest fit
//! -> artifacts. Nothing is written unless every stage succeeds.

use chrono::{NaiveDateTime, Utc};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::anomaly::{calibrate, AnomalyCalibration};
use crate::config::TrainingConfig;
use crate::encoder::FeatureEncoder;
use crate::error::{EngineError, Result};
use crate::forest::RandomForest;
use crate::models::{FeatureRecord, FieldValue, CATEGORICAL_FIELDS, DETECTOR_FIELDS, NUMERIC_FIELDS};
use crate::risk_model::RiskModel;

/// Parsed training dataset
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub records: Vec<FeatureRecord>,
}

impl TrainingSet {
    pub fn from_path(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "reading training CSV");
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read CSV rows; headers are matched case-insensitively after trimming.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let mut columns = Vec::with_capacity(NUMERIC_FIELDS.len() + CATEGORICAL_FIELDS.len());
        for field in NUMERIC_FIELDS.iter().chain(CATEGORICAL_FIELDS.iter()) {
            let position = headers
                .iter()
                .position(|h| h == field)
                .ok_or_else(|| EngineError::schema(*field, "required column is absent from the dataset"))?;
            columns.push((*field, position));
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = FeatureRecord::new();
            for (field, position) in &columns {
                let value = row.get(*position).map(FieldValue::from_cell).unwrap_or(FieldValue::Missing);
                record.set(field, value);
            }
            records.push(record);
        }

        info!(rows = records.len(), "parsed training rows");
        Ok(Self { records })
    }

    /// Detector inputs per row. The detector cannot impute, so every value must
    /// be present.
    fn detector_rows(&self) -> Result<Vec<Vec<f64>>> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                DETECTOR_FIELDS
                    .iter()
                    .map(|field| {
                        record.number(field)?.ok_or_else(|| {
                            EngineError::schema(*field, format!("row {} is missing a detector input", i + 1))
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

/// Everything one training run produces
#[derive(Debug, Clone)]
pub struct TrainedArtifacts {
    pub encoder: FeatureEncoder,
    pub model: RiskModel,
    pub calibration: AnomalyCalibration,
}

fn run_version(trained_at: NaiveDateTime, seed: u64) -> String {
    format!("{}-s{}", trained_at.format("%Y%m%dT%H%M%S"), seed)
}

pub fn train(set: &TrainingSet, config: &TrainingConfig) -> Result<TrainedArtifacts> {
    if set.records.is_empty() {
        return Err(EngineError::computation("training dataset has no rows"));
    }

    let detector_rows = set.detector_rows()?;
    let calibration = calibrate(&detector_rows, &DETECTOR_FIELDS, &config.isolation)?;

    let encoder = FeatureEncoder::fit(&set.records)?;
    let x: Vec<Vec<f64>> = set
        .records
        .iter()
        .map(|r| encoder.encode(r).map(|f| f.as_slice().to_vec()))
        .collect::<Result<_>>()?;

    info!(
        rows = x.len(),
        features = encoder.width(),
        trees = config.forest.n_trees,
        "fitting risk regressor"
    );
    let forest = RandomForest::fit(&x, &calibration.percent, &config.forest)?;

    let trained_at = Utc::now().naive_utc();
    let model = RiskModel {
        version: run_version(trained_at, config.forest.seed),
        trained_at,
        training_rows: x.len(),
        feature_names: encoder.feature_names(),
        forest,
    };
    model.validate_against(&encoder)?;

    info!(version = %model.version, "training complete");
    Ok(TrainedArtifacts {
        encoder,
        model,
        calibration,
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write both artifacts, renaming into place only after both serialise.
///
/// The two renames are not one atomic step. If the second fails, the new
/// encoder sits beside the old model and `RiskModel::validate_against` makes
/// engine startup refuse the pair.
pub fn write_artifacts(artifacts: &TrainedArtifacts, encoder_path: &Path, model_path: &Path) -> Result<()> {
    for path in [encoder_path, model_path] {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
    }

    let encoder_tmp = tmp_path(encoder_path);
    let model_tmp = tmp_path(model_path);

    let staged = serde_json::to_string_pretty(&artifacts.encoder)
        .map_err(EngineError::from)
        .and_then(|json| std::fs::write(&encoder_tmp, json).map_err(EngineError::from))
        .and_then(|_| serde_json::to_string(&artifacts.model).map_err(EngineError::from))
        .and_then(|json| std::fs::write(&model_tmp, json).map_err(EngineError::from));

    if let Err(e) = staged {
        let _ = std::fs::remove_file(&encoder_tmp);
        let _ = std::fs::remove_file(&model_tmp);
        return Err(e);
    }

    std::fs::rename(&encoder_tmp, encoder_path)?;
    std::fs::rename(&model_tmp, model_path)?;
    info!(
        encoder = %encoder_path.display(),
        model = %model_path.display(),
        "wrote artifacts"
    );
    Ok(())
}
