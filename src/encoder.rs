//! Feature encoder
//!
//! Numeric fields: median imputation then standardisation with frozen
//! training mean/std. Categorical fields: mode imputation then one-hot over
//! the frozen training vocabulary; unseen categories encode as all zeros.
//!
//! Fitting happens once during training; after that the encoder is a pure
//! function of its frozen parameters and is never refit on serving data.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::models::{EncodedFeatures, FeatureRecord, CATEGORICAL_FIELDS, NUMERIC_FIELDS};

pub const ENCODER_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub median: f64,
    pub mean: f64,
    pub std: f64,
}

impl NumericColumn {
    fn encode(&self, record: &FeatureRecord) -> Result<f64> {
        let value = record.number(&self.name)?.unwrap_or(self.median);
        Ok((value - self.mean) / self.std)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub mode: String,
    /// Sorted, de-duplicated training categories; position = one-hot slot
    pub vocabulary: Vec<String>,
}

impl CategoricalColumn {
    fn encode_into(&self, record: &FeatureRecord, out: &mut Vec<f64>) -> Result<()> {
        let value = record.category(&self.name)?.unwrap_or_else(|| self.mode.clone());
        let slot = self.vocabulary.binary_search(&value).ok();
        if slot.is_none() {
            debug!(field = %self.name, value = %value, "unseen category encoded as zeros");
        }
        out.extend((0..self.vocabulary.len()).map(|i| if Some(i) == slot { 1.0 } else { 0.0 }));
        Ok(())
    }
}

/// Frozen feature-encoding pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    pub schema_version: u32,
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

impl FeatureEncoder {
    /// Fit imputation, scaling and vocabulary parameters on training records.
    pub fn fit(records: &[FeatureRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(EngineError::computation("cannot fit encoder on an empty dataset"));
        }

        let mut numeric = Vec::with_capacity(NUMERIC_FIELDS.len());
        for field in NUMERIC_FIELDS {
            let raw: Vec<Option<f64>> = records
                .iter()
                .map(|r| r.number(field))
                .collect::<Result<_>>()?;

            let mut present: Vec<f64> = raw.iter().flatten().copied().collect();
            if present.is_empty() {
                return Err(EngineError::computation(format!(
                    "numeric column `{}` has no observed values",
                    field
                )));
            }
            let median = median(&mut present);

            let n = raw.len() as f64;
            let imputed: Vec<f64> = raw.iter().map(|v| v.unwrap_or(median)).collect();
            let mean = imputed.iter().sum::<f64>() / n;
            let var = imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = if var.sqrt() > f64::EPSILON { var.sqrt() } else { 1.0 };

            numeric.push(NumericColumn {
                name: field.to_string(),
                median,
                mean,
                std,
            });
        }

        let mut categorical = Vec::with_capacity(CATEGORICAL_FIELDS.len());
        for field in CATEGORICAL_FIELDS {
            let raw: Vec<Option<String>> = records
                .iter()
                .map(|r| r.category(field))
                .collect::<Result<_>>()?;

            // BTreeMap iteration is sorted, so ties resolve to the smallest label
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for value in raw.iter().flatten() {
                *counts.entry(value.as_str()).or_insert(0) += 1;
            }
            let mode = counts
                .iter()
                .fold(None::<(&str, usize)>, |best, (label, count)| match best {
                    Some((_, c)) if c >= *count => best,
                    _ => Some((*label, *count)),
                })
                .map(|(label, _)| label.to_string())
                .ok_or_else(|| {
                    EngineError::computation(format!("categorical column `{}` has no observed values", field))
                })?;

            let vocabulary: BTreeSet<String> = raw
                .iter()
                .map(|v| v.clone().unwrap_or_else(|| mode.clone()))
                .collect();

            categorical.push(CategoricalColumn {
                name: field.to_string(),
                mode,
                vocabulary: vocabulary.into_iter().collect(),
            });
        }

        let encoder = Self {
            schema_version: ENCODER_SCHEMA_VERSION,
            numeric,
            categorical,
        };
        info!(
            rows = records.len(),
            width = encoder.width(),
            "fitted feature encoder"
        );
        Ok(encoder)
    }

    /// Encode a record into the frozen feature layout.
    pub fn encode(&self, record: &FeatureRecord) -> Result<EncodedFeatures> {
        let mut values = Vec::with_capacity(self.width());
        for column in &self.numeric {
            values.push(column.encode(record)?);
        }
        for column in &self.categorical {
            column.encode_into(record, &mut values)?;
        }
        Ok(EncodedFeatures::new(values))
    }

    /// Number of encoded columns
    pub fn width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.vocabulary.len()).sum::<usize>()
    }

    /// Expanded column names (`field` for numerics, `field=category` for one-hot slots)
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|c| c.name.clone()).collect();
        for column in &self.categorical {
            names.extend(column.vocabulary.iter().map(|v| format!("{}={}", column.name, v)));
        }
        names
    }

    /// Check a deserialized artifact against the field layout this build expects.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != ENCODER_SCHEMA_VERSION {
            return Err(EngineError::config(format!(
                "encoder schema version {} is not supported (expected {})",
                self.schema_version, ENCODER_SCHEMA_VERSION
            )));
        }

        let numeric: Vec<&str> = self.numeric.iter().map(|c| c.name.as_str()).collect();
        if numeric != NUMERIC_FIELDS {
            return Err(EngineError::config(format!(
                "encoder numeric columns {:?} do not match expected {:?}",
                numeric, NUMERIC_FIELDS
            )));
        }
        let categorical: Vec<&str> = self.categorical.iter().map(|c| c.name.as_str()).collect();
        if categorical != CATEGORICAL_FIELDS {
            return Err(EngineError::config(format!(
                "encoder categorical columns {:?} do not match expected {:?}",
                categorical, CATEGORICAL_FIELDS
            )));
        }

        for column in &self.numeric {
            let finite = column.median.is_finite() && column.mean.is_finite() && column.std.is_finite();
            if !finite || column.std <= 0.0 {
                return Err(EngineError::config(format!(
                    "encoder column `{}` has invalid scaling parameters",
                    column.name
                )));
            }
        }
        for column in &self.categorical {
            let sorted = column.vocabulary.windows(2).all(|w| w[0] < w[1]);
            if column.vocabulary.is_empty() || !sorted {
                return Err(EngineError::config(format!(
                    "encoder column `{}` vocabulary must be non-empty, sorted and unique",
                    column.name
                )));
            }
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let encoder: Self = serde_json::from_str(&raw)
            .map_err(|e| EngineError::config(format!("corrupt encoder artifact {}: {}", path.display(), e)))?;
        encoder.validate()?;
        info!(path = %path.display(), width = encoder.width(), "loaded feature encoder");
        Ok(encoder)
    }
}
