//! Anomaly calibrator (training only)
//!
//! An isolation forest is fit on the standardised environmental signals and
//! each shipment's decision score is min-max normalised into an anomaly
//! percent (more anomalous = higher). That percent is the synthetic target the
//! risk model is trained on.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EngineError, Result};

/// Anomaly percent assigned to every row when all decision scores are equal
pub const DEGENERATE_ANOMALY_PERCENT: f64 = 50.0;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationParams {
    pub n_trees: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile of an ascending slice, `q` in [0, 100]
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone)]
enum INode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<INode>,
}

impl IsolationTree {
    fn grow(x: &[Vec<f64>], idx: &mut [usize], max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build(x, idx, 0, max_depth, rng);
        tree
    }

    fn build(&mut self, x: &[Vec<f64>], idx: &mut [usize], depth: usize, max_depth: usize, rng: &mut StdRng) -> usize {
        let id = self.nodes.len();
        self.nodes.push(INode::Leaf { size: idx.len() });
        if idx.len() <= 1 || depth >= max_depth {
            return id;
        }

        let width = x[idx[0]].len();
        let splittable: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|f| {
                let (lo, hi) = idx.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(x[i][f]), hi.max(x[i][f]))
                });
                (lo < hi).then_some((f, lo, hi))
            })
            .collect();
        if splittable.is_empty() {
            return id;
        }

        let (feature, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
        let threshold = rng.gen_range(lo..hi);

        let mut mid = 0;
        for k in 0..idx.len() {
            if x[idx[k]][feature] < threshold {
                idx.swap(k, mid);
                mid += 1;
            }
        }
        // a threshold drawn at exactly `lo` isolates nothing on the left
        if mid == 0 {
            return id;
        }

        let (left_idx, right_idx) = idx.split_at_mut(mid);
        let left = self.build(x, left_idx, depth + 1, max_depth, rng);
        let right = self.build(x, right_idx, depth + 1, max_depth, rng);
        self.nodes[id] = INode::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[id] {
                INode::Leaf { size } => return depth + average_path_length(*size),
                INode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Unsupervised outlier detector
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    pub fn fit(x: &[Vec<f64>], params: &IsolationParams) -> Result<Self> {
        if x.is_empty() {
            return Err(EngineError::computation("cannot fit isolation forest on an empty dataset"));
        }
        if params.n_trees == 0 || params.max_samples == 0 {
            return Err(EngineError::config("isolation forest needs trees and a positive sample size"));
        }
        if !(0.0..=0.5).contains(&params.contamination) {
            return Err(EngineError::config(format!(
                "contamination must be within [0, 0.5] (got {})",
                params.contamination
            )));
        }

        let sample_size = params.max_samples.min(x.len());
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_trees)
            .map(|_| {
                let mut idx = sample(&mut rng, x.len(), sample_size).into_vec();
                IsolationTree::grow(x, &mut idx, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: 0.0,
        };

        let mut scores: Vec<f64> = x.iter().map(|row| forest.score_sample(row)).collect();
        scores.sort_by(|a, b| a.total_cmp(b));
        forest.offset = percentile(&scores, 100.0 * params.contamination);
        Ok(forest)
    }

    /// Opposite of the anomaly score; lower is more abnormal, in [-1, 0]
    pub fn score_sample(&self, row: &[f64]) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm == 0.0 {
            return -1.0;
        }
        -(2f64.powf(-mean_path / norm))
    }

    /// Signed distance from the contamination boundary; negative = outlier
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.score_sample(row) - self.offset
    }
}

/// Min-max normalise decision scores into anomaly percents:
/// `(1 - (s - min) / (max - min)) * 100`, rounded to 2 decimals.
///
/// Equal scores (`max == min`) map every row to
/// [`DEGENERATE_ANOMALY_PERCENT`].
pub fn normalize_anomaly_scores(scores: &[f64]) -> Vec<f64> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= f64::EPSILON {
        return vec![DEGENERATE_ANOMALY_PERCENT; scores.len()];
    }
    scores
        .iter()
        .map(|s| ((1.0 - (s - min) / range) * 100.0 * 100.0).round() / 100.0)
        .collect()
}

/// Per-shipment calibration output
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyCalibration {
    pub percent: Vec<f64>,
    pub flagged: Vec<bool>,
}

impl AnomalyCalibration {
    pub fn flagged_count(&self) -> usize {
        self.flagged.iter().filter(|f| **f).count()
    }
}

/// Standardise the detector columns, fit the isolation forest and produce the
/// anomaly-percent training target.
///
/// Zero variance in any column is a `ComputationError`.
pub fn calibrate(rows: &[Vec<f64>], columns: &[&str], params: &IsolationParams) -> Result<AnomalyCalibration> {
    if rows.is_empty() {
        return Err(EngineError::computation("no rows to calibrate"));
    }
    let n = rows.len() as f64;
    let width = columns.len();
    if rows.iter().any(|r| r.len() != width) {
        return Err(EngineError::computation("detector rows must match the detector column count"));
    }

    let mut stats = Vec::with_capacity(width);
    for (f, name) in columns.iter().enumerate() {
        let mean = rows.iter().map(|r| r[f]).sum::<f64>() / n;
        let std = (rows.iter().map(|r| (r[f] - mean).powi(2)).sum::<f64>() / n).sqrt();
        if !std.is_finite() || std <= f64::EPSILON {
            return Err(EngineError::computation(format!(
                "detector column `{}` has zero variance; anomaly scores cannot be normalised",
                name
            )));
        }
        stats.push((mean, std));
    }

    let scaled: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| r.iter().zip(&stats).map(|(v, (mean, std))| (v - mean) / std).collect())
        .collect();

    let forest = IsolationForest::fit(&scaled, params)?;
    let scores: Vec<f64> = scaled.iter().map(|r| forest.decision_function(r)).collect();
    let flagged: Vec<bool> = scores.iter().map(|s| *s < 0.0).collect();
    let percent = normalize_anomaly_scores(&scores);

    let calibration = AnomalyCalibration { percent, flagged };
    let share = calibration.flagged_count() as f64 / n;
    if share > params.contamination * 2.0 {
        warn!(share, "anomaly share well above configured contamination");
    }
    info!(
        rows = rows.len(),
        anomalies = calibration.flagged_count(),
        "calibrated anomaly targets"
    );
    Ok(calibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DETECTOR_FIELDS;

    fn clustered_rows() -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut rows: Vec<Vec<f64>> = (0..300)
            .map(|_| {
                vec![
                    rng.gen_range(0.3..0.5),
                    rng.gen_range(0.3..0.5),
                    rng.gen_range(2..=3) as f64,
                ]
            })
            .collect();
        // one extreme shipment
        rows.push(vec![0.99, 0.99, 5.0]);
        rows
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.24).abs() < 0.05, "c(256) = {}", c256);
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 50.0), 3.0);
        assert_eq!(percentile(&v, 100.0), 5.0);
        assert!((percentile(&v, 10.0) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_outlier_scores_highest() {
        let rows = clustered_rows();
        let calibration = calibrate(&rows, &DETECTOR_FIELDS, &IsolationParams::default()).unwrap();
        assert_eq!(calibration.percent.len(), rows.len());

        let outlier = *calibration.percent.last().unwrap();
        let max_inlier = calibration.percent[..300].iter().copied().fold(f64::MIN, f64::max);
        assert!(outlier >= max_inlier, "outlier {} vs inlier {}", outlier, max_inlier);
        assert_eq!(outlier, 100.0);
        assert!(*calibration.flagged.last().unwrap());
        assert!(calibration.percent.iter().all(|p| (0.0..=100.0).contains(p)));
    }

    #[test]
    fn test_calibration_is_seeded() {
        let rows = clustered_rows();
        let a = calibrate(&rows, &DETECTOR_FIELDS, &IsolationParams::default()).unwrap();
        let b = calibrate(&rows, &DETECTOR_FIELDS, &IsolationParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_contamination_share() {
        let rows = clustered_rows();
        let calibration = calibrate(&rows, &DETECTOR_FIELDS, &IsolationParams::default()).unwrap();
        let share = calibration.flagged_count() as f64 / rows.len() as f64;
        assert!(share <= 0.06, "flagged share {}", share);
    }

    #[test]
    fn test_normalization_inverts_scores() {
        let percent = normalize_anomaly_scores(&[-0.2, 0.0, 0.2]);
        assert_eq!(percent, vec![100.0, 50.0, 0.0]);
    }

    #[test]
    fn test_normalization_degenerate_scores() {
        let percent = normalize_anomaly_scores(&[0.13, 0.13, 0.13]);
        assert_eq!(percent, vec![DEGENERATE_ANOMALY_PERCENT; 3]);
        assert!(percent.iter().all(|p| p.is_finite()));
        assert!(normalize_anomaly_scores(&[]).is_empty());
    }

    #[test]
    fn test_zero_variance_is_rejected() {
        let rows = vec![vec![0.5, 0.5, 3.0]; 20];
        let err = calibrate(&rows, &DETECTOR_FIELDS, &IsolationParams::default()).unwrap_err();
        assert!(matches!(err, EngineError::Computation(_)));

        let mut rows = clustered_rows();
        for r in rows.iter_mut() {
            r[2] = 3.0;
        }
        let err = calibrate(&rows, &DETECTOR_FIELDS, &IsolationParams::default()).unwrap_err();
        assert!(err.to_string().contains("weather_severity"));
    }
}
