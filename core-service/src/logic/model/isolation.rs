//! Isolation Forest
//!
//! Anomalies are isolated by fewer random splits, so they sit on shorter
//! paths. The outlier cut is placed so that `contamination` of the training
//! partition falls above it.

use rand::seq::index;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::predictor::{ModelKind, ModelSignal, Predictor};
use super::threshold::percentile;
use crate::constants;
use crate::logic::error::{FusionError, FusionResult};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// Upper bound on rows drawn per tree
    pub max_samples: usize,
    /// Expected share of outliers in the training data
    pub contamination: f64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: constants::DEFAULT_CONTAMINATION,
        }
    }
}

/// c(n): average unsuccessful-search path length in a BST of n nodes
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

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum IsolationNode {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<IsolationNode>,
}

impl IsolationTree {
    fn build(rows: &[Vec<f64>], sample: Vec<usize>, height_limit: usize, rng: &mut ChaCha8Rng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(rows, sample, 0, height_limit, rng);
        tree
    }

    fn grow(
        &mut self,
        rows: &[Vec<f64>],
        sample: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let index = self.nodes.len();
        self.nodes.push(IsolationNode::Leaf { size: sample.len() });

        if depth >= height_limit || sample.len() <= 1 {
            return index;
        }

        // Only features that still vary inside this node can split it
        let width = rows[sample[0]].len();
        let candidates: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|f| {
                let (lo, hi) = sample.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    (lo.min(rows[r][f]), hi.max(rows[r][f]))
                });
                (hi > lo).then_some((f, lo, hi))
            })
            .collect();

        if candidates.is_empty() {
            return index;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            sample.into_iter().partition(|&r| rows[r][feature] < threshold);

        let left = self.grow(rows, left_rows, depth + 1, height_limit, rng);
        let right = self.grow(rows, right_rows, depth + 1, height_limit, rng);

        self.nodes[index] = IsolationNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        index
    }

    fn path_length(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes.get(index) {
                Some(IsolationNode::Split { feature, threshold, left, right }) => {
                    let v = x.get(*feature).copied().unwrap_or(0.0);
                    index = if v < *threshold { *left } else { *right };
                    depth += 1.0;
                }
                Some(IsolationNode::Leaf { size }) => return depth + average_path_length(*size),
                None => return depth,
            }
        }
    }
}

// ============================================================================
// FOREST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    config: ForestConfig,
    input_width: usize,
    trees: Vec<IsolationTree>,
    /// Effective rows per tree, `min(max_samples, n)`
    max_samples: usize,
    /// Scores above this are outliers
    offset: f64,
}

impl IsolationForest {
    pub fn fit(rows: &[Vec<f64>], config: &ForestConfig, rng: &mut ChaCha8Rng) -> FusionResult<Self> {
        let Some(first) = rows.first() else {
            return Err(FusionError::Training("isolation forest needs at least one row".to_string()));
        };
        if !(config.contamination > 0.0 && config.contamination < 0.5) {
            return Err(FusionError::Training(format!(
                "contamination must lie in (0, 0.5), got {}",
                config.contamination
            )));
        }

        let n = rows.len();
        let max_samples = config.max_samples.clamp(1, n);
        let height_limit = (max_samples.max(2) as f64).log2().ceil() as usize;

        let trees = (0..config.n_estimators)
            .map(|_| {
                let sample = index::sample(rng, n, max_samples).into_vec();
                IsolationTree::build(rows, sample, height_limit, rng)
            })
            .collect();

        let mut forest = Self {
            config: config.clone(),
            input_width: first.len(),
            trees,
            max_samples,
            offset: 0.0,
        };

        let training_scores: Vec<f64> = rows.iter().map(|r| forest.anomaly_score(r)).collect();
        forest.offset = percentile(&training_scores, 100.0 * (1.0 - config.contamination))
            .unwrap_or(f64::INFINITY);

        log::info!(
            "Isolation forest trained: {} trees, {} samples each, offset {:.4}",
            forest.trees.len(),
            max_samples,
            forest.offset
        );

        Ok(forest)
    }

    /// 2^(-E[h(x)] / c(max_samples)), in (0, 1]. Higher is more anomalous.
    pub fn anomaly_score(&self, x: &[f64]) -> f64 {
        let c = average_path_length(self.max_samples);
        if self.trees.is_empty() || c == 0.0 {
            return 0.5;
        }

        let mean_path: f64 =
            self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;

        2f64.powf(-mean_path / c)
    }

    pub fn is_outlier(&self, x: &[f64]) -> bool {
        self.anomaly_score(x) > self.offset
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn contamination(&self) -> f64 {
        self.config.contamination
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }
}

impl Predictor for IsolationForest {
    fn kind(&self) -> ModelKind {
        ModelKind::OutlierDetector
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn score(&self, features: &[f64]) -> ModelSignal {
        let score = self.anomaly_score(features);
        ModelSignal::Outlier {
            is_outlier: score > self.offset,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn cluster(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| vec![((i % 21) as f64 - 10.0) / 10.0, ((i * 7 % 13) as f64 - 6.0) / 6.0])
            .collect()
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 50,
            max_samples: 64,
            contamination: 0.1,
        }
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > average_path_length(16));
    }

    #[test]
    fn test_far_point_is_outlier() {
        let rows = cluster(200);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let forest = IsolationForest::fit(&rows, &small_config(), &mut rng).unwrap();

        assert!(forest.is_outlier(&[40.0, -40.0]));
        assert!(!forest.is_outlier(&[0.0, 0.0]));
        assert!(forest.anomaly_score(&[40.0, -40.0]) > forest.anomaly_score(&[0.0, 0.0]));
    }

    #[test]
    fn test_contamination_share_of_training_set() {
        let rows = cluster(200);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let forest = IsolationForest::fit(&rows, &small_config(), &mut rng).unwrap();

        let flagged = rows.iter().filter(|r| forest.is_outlier(r)).count();
        assert!(flagged <= 20, "flagged {} of 200", flagged);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let rows = cluster(100);
        let a = IsolationForest::fit(&rows, &small_config(), &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        let b = IsolationForest::fit(&rows, &small_config(), &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_max_samples_capped_by_rows() {
        let rows = cluster(10);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let forest = IsolationForest::fit(&rows, &small_config(), &mut rng).unwrap();
        assert_eq!(forest.max_samples(), 10);
        assert_eq!(forest.n_estimators(), 50);
    }

    #[test]
    fn test_rejects_bad_contamination() {
        let rows = cluster(10);
        let config = ForestConfig {
            contamination: 0.7,
            ..small_config()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(IsolationForest::fit(&rows, &config, &mut rng).is_err());
    }
}
