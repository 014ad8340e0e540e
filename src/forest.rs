//! Random-forest regressor
//!
//! Bootstrapped CART regression trees with squared-error splits over every
//! feature; the forest prediction is the mean of its trees. Trees are stored
//! as flat node arrays so they serialise straight into the model artifact.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Regression tree; node 0 is the root and children always follow their parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if x[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(EngineError::config("tree has no nodes"));
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(EngineError::config(format!("leaf {} has non-finite value", id)));
                }
                Node::Leaf { .. } => {}
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features || !threshold.is_finite() {
                        return Err(EngineError::config(format!("split {} references invalid feature", id)));
                    }
                    // forward-only links rule out cycles
                    let in_range = |child: usize| child > id && child < self.nodes.len();
                    if !in_range(*left) || !in_range(*right) {
                        return Err(EngineError::config(format!("split {} has out-of-range children", id)));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

struct Split {
    feature: usize,
    threshold: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: &'a ForestParams,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, idx: &mut [usize], depth: usize) -> usize {
        let id = self.nodes.len();
        let mean = idx.iter().map(|&i| self.y[i]).sum::<f64>() / idx.len() as f64;
        self.nodes.push(Node::Leaf { value: mean });

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let pure = idx.iter().all(|&i| self.y[i] == self.y[idx[0]]);
        if idx.len() < self.params.min_samples_split || depth_reached || pure {
            return id;
        }

        let Some(split) = self.best_split(idx) else {
            return id;
        };

        let mut mid = 0;
        for k in 0..idx.len() {
            if self.x[idx[k]][split.feature] <= split.threshold {
                idx.swap(k, mid);
                mid += 1;
            }
        }

        let (left_idx, right_idx) = idx.split_at_mut(mid);
        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&self, idx: &[usize]) -> Option<Split> {
        let n = idx.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let total: f64 = idx.iter().map(|&i| self.y[i]).sum();
        let parent_score = total * total / n as f64;

        let mut best: Option<(f64, Split)> = None;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in 0..self.x[idx[0]].len() {
            column.clear();
            column.extend(idx.iter().map(|&i| (self.x[i][feature], self.y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += column[k].1;
                let (n_left, n_right) = (k + 1, n - k - 1);
                if column[k].0 == column[k + 1].0 || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                if score <= parent_score + 1e-12 {
                    continue;
                }
                if best.as_ref().map_or(true, |(s, _)| score > *s) {
                    let mut threshold = (column[k].0 + column[k + 1].0) / 2.0;
                    if threshold >= column[k + 1].0 {
                        threshold = column[k].0;
                    }
                    best = Some((score, Split { feature, threshold }));
                }
            }
        }
        best.map(|(_, split)| split)
    }
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(EngineError::computation(format!(
                "forest needs matching non-empty inputs (x: {}, y: {})",
                x.len(),
                y.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(EngineError::config("forest needs at least one tree"));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(EngineError::computation("feature rows must share a non-zero width"));
        }
        if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
            return Err(EngineError::computation("training data contains non-finite values"));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = x.len();
        let mut trees = Vec::with_capacity(params.n_trees);
        for t in 0..params.n_trees {
            let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut builder = TreeBuilder {
                x,
                y,
                params,
                nodes: Vec::new(),
            };
            builder.build(&mut sample, 0);
            let tree = RegressionTree { nodes: builder.nodes };
            debug!(tree = t, nodes = tree.nodes.len(), depth = tree.depth(), "grew regression tree");
            trees.push(tree);
        }

        Ok(Self { n_features, trees })
    }

    /// Forest with a single constant-leaf tree
    #[cfg(test)]
    pub(crate) fn constant(n_features: usize, value: f64) -> Self {
        Self {
            n_features,
            trees: vec![RegressionTree::leaf(value)],
        }
    }

    pub fn predict(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.n_features {
            return Err(EngineError::schema(
                "features",
                format!("expected {} encoded columns, got {}", self.n_features, x.len()),
            ));
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(EngineError::config("forest has no trees"));
        }
        for tree in &self.trees {
            tree.validate(self.n_features)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..40).map(|i| if i < 20 { 10.0 } else { 80.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = step_data();
        let forest = RandomForest::fit(&x, &y, &ForestParams::default()).unwrap();
        assert_eq!(forest.trees.len(), 50);
        assert!(forest.validate().is_ok());

        let low = forest.predict(&[3.0, 0.0]).unwrap();
        let high = forest.predict(&[35.0, 2.0]).unwrap();
        assert!(low < 20.0, "low side predicted {}", low);
        assert!(high > 70.0, "high side predicted {}", high);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let (x, y) = step_data();
        let params = ForestParams {
            n_trees: 5,
            ..ForestParams::default()
        };
        let a = RandomForest::fit(&x, &y, &params).unwrap();
        let b = RandomForest::fit(&x, &y, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_max_depth_is_respected() {
        let x: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let params = ForestParams {
            n_trees: 3,
            max_depth: Some(2),
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, &params).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() <= 2));
    }

    #[test]
    fn test_width_mismatch_is_schema_error() {
        let forest = RandomForest::constant(3, 42.0);
        assert_eq!(forest.predict(&[0.0, 0.0, 0.0]).unwrap(), 42.0);
        assert_eq!(forest.predict(&[0.0]).unwrap_err().field(), Some("features"));
    }

    #[test]
    fn test_rejects_bad_training_input() {
        assert!(RandomForest::fit(&[], &[], &ForestParams::default()).is_err());
        let x = vec![vec![1.0], vec![f64::NAN]];
        assert!(RandomForest::fit(&x, &[1.0, 2.0], &ForestParams::default()).is_err());
    }

    #[test]
    fn test_validate_rejects_corrupt_trees() {
        let mut forest = RandomForest::constant(2, 1.0);
        forest.trees[0].nodes = vec![
            Node::Split {
                feature: 0,
                threshold: 0.5,
                left: 0,
                right: 1,
            },
            Node::Leaf { value: 1.0 },
        ];
        assert!(matches!(forest.validate(), Err(EngineError::Config(_))));

        forest.trees[0].nodes[0] = Node::Split {
            feature: 5,
            threshold: 0.5,
            left: 1,
            right: 1,
        };
        assert!(matches!(forest.validate(), Err(EngineError::Config(_))));
    }
}
