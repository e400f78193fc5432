//! Gradient-boosted multiclass classifier
//!
//! Softmax boosting over regression trees. Every round fits one tree per
//! class to the gradient/hessian of the multiclass log loss, with splits
//! searched over per-feature quantile bins.
//!
//! # Algorithm
//! 1. Raw scores start at smoothed log class priors
//! 2. For each round and class k:
//!    - g = p_k - y_k, h = p_k (1 - p_k)
//!    - grow a tree greedily on histogram gain
//!    - leaf value = -lr * G / (H + lambda)
//! 3. Holdout log loss after each round gives the best iteration

use serde::{Deserialize, Serialize};

use super::predictor::{ModelKind, ModelSignal, Predictor};
use crate::logic::error::{FusionError, FusionResult};

const MIN_HESSIAN: f64 = 1e-6;
const MIN_GAIN: f64 = 1e-9;
const PROB_EPSILON: f64 = 1e-15;

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Boosting rounds (one tree per class per round)
    pub n_rounds: usize,
    /// Shrinkage applied to every leaf
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// L2 regularization on leaf values
    pub lambda: f64,
    /// Upper bound on histogram bins per feature
    pub max_bins: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_leaf: 20,
            lambda: 1.0,
            max_bins: 32,
        }
    }
}

// ============================================================================
// TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
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

/// Regression tree stored as a flat node arena, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Split { feature, threshold, left, right }) => {
                    let v = x.get(*feature).copied().unwrap_or(0.0);
                    index = if v <= *threshold { *left } else { *right };
                }
                Some(Node::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
    }
}

// ============================================================================
// BINNING
// ============================================================================

/// Candidate split thresholds per feature. Value v falls in bin
/// `#{t : t < v}`, so "bin <= b" is the same test as "v <= thresholds[b]".
fn bin_thresholds(rows: &[Vec<f64>], width: usize, max_bins: usize) -> Vec<Vec<f64>> {
    (0..width)
        .map(|f| {
            let mut values: Vec<f64> = rows.iter().map(|r| r[f]).collect();
            values.sort_by(|a, b| a.total_cmp(b));
            values.dedup();

            if values.len() <= max_bins {
                return values.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
            }

            let mut cuts: Vec<f64> = (1..max_bins)
                .map(|i| values[i * values.len() / max_bins])
                .collect();
            cuts.dedup();
            cuts
        })
        .collect()
}

fn bin_of(thresholds: &[f64], value: f64) -> u8 {
    thresholds.partition_point(|t| *t < value) as u8
}

// ============================================================================
// TREE BUILDER
// ============================================================================

struct TreeBuilder<'a> {
    binned: &'a [Vec<u8>],
    thresholds: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    config: &'a ClassifierConfig,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(mut self, rows: Vec<usize>) -> RegressionTree {
        self.grow(rows, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { value: 0.0 }); // Placeholder

        let g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| self.hess[r]).sum();
        let leaf = Node::Leaf {
            value: -self.config.learning_rate * g / (h + self.config.lambda),
        };

        let splittable =
            depth < self.config.max_depth && rows.len() >= 2 * self.config.min_samples_leaf;

        let Some((feature, bin)) = splittable.then(|| self.best_split(&rows, g, h)).flatten() else {
            self.nodes[index] = leaf;
            return index;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.binned[r][feature] as usize <= bin);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);

        self.nodes[index] = Node::Split {
            feature,
            threshold: self.thresholds[feature][bin],
            left,
            right,
        };
        index
    }

    /// Best (feature, bin) by second-order gain
    fn best_split(&self, rows: &[usize], g_total: f64, h_total: f64) -> Option<(usize, usize)> {
        let lambda = self.config.lambda;
        let min_leaf = self.config.min_samples_leaf;
        let parent = g_total * g_total / (h_total + lambda);

        let mut best: Option<(usize, usize)> = None;
        let mut best_gain = MIN_GAIN;

        for (feature, cuts) in self.thresholds.iter().enumerate() {
            if cuts.is_empty() {
                continue;
            }

            let n_bins = cuts.len() + 1;
            let mut hist_g = vec![0.0; n_bins];
            let mut hist_h = vec![0.0; n_bins];
            let mut hist_n = vec![0usize; n_bins];

            for &r in rows {
                let b = self.binned[r][feature] as usize;
                hist_g[b] += self.grad[r];
                hist_h[b] += self.hess[r];
                hist_n[b] += 1;
            }

            let (mut gl, mut hl, mut nl) = (0.0, 0.0, 0usize);
            for b in 0..cuts.len() {
                gl += hist_g[b];
                hl += hist_h[b];
                nl += hist_n[b];

                let nr = rows.len() - nl;
                if nl < min_leaf || nr < min_leaf {
                    continue;
                }

                let gr = g_total - gl;
                let hr = h_total - hl;
                let gain = gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent;

                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature, b));
                }
            }
        }

        best
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    config: ClassifierConfig,
    n_classes: usize,
    input_width: usize,
    base_scores: Vec<f64>,
    /// `rounds[round][class]`
    rounds: Vec<Vec<RegressionTree>>,
    best_iteration: usize,
    best_score: Option<f64>,
}

impl GradientBoostedClassifier {
    /// Fit on scaled rows with class indices in `0..n_classes`.
    ///
    /// `holdout` is only used to track the best round, never for fitting.
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        holdout: Option<(&[Vec<f64>], &[usize])>,
        config: &ClassifierConfig,
    ) -> FusionResult<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(FusionError::Training(format!(
                "classifier needs matching rows and labels, got {} rows and {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if n_classes < 2 || labels.iter().any(|&y| y >= n_classes) {
            return Err(FusionError::Training(format!(
                "classifier labels must lie in 0..{}",
                n_classes
            )));
        }

        let n = rows.len();
        let width = rows[0].len();
        let max_bins = config.max_bins.clamp(2, u8::MAX as usize);
        let thresholds = bin_thresholds(rows, width, max_bins);
        let binned: Vec<Vec<u8>> = rows
            .iter()
            .map(|r| r.iter().zip(&thresholds).map(|(v, t)| bin_of(t, *v)).collect())
            .collect();

        // Smoothed log priors
        let mut counts = vec![0.0; n_classes];
        for &y in labels {
            counts[y] += 1.0;
        }
        let base_scores: Vec<f64> = counts
            .iter()
            .map(|c| ((c + 1.0) / (n as f64 + n_classes as f64)).ln())
            .collect();

        let mut model = Self {
            config: config.clone(),
            n_classes,
            input_width: width,
            base_scores: base_scores.clone(),
            rounds: Vec::with_capacity(config.n_rounds),
            best_iteration: 0,
            best_score: None,
        };

        let mut raw: Vec<Vec<f64>> = vec![base_scores.clone(); n];
        let mut holdout_raw: Vec<Vec<f64>> = holdout
            .map(|(h, _)| vec![base_scores.clone(); h.len()])
            .unwrap_or_default();

        let all_rows: Vec<usize> = (0..n).collect();
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];

        for round in 0..config.n_rounds {
            let probs: Vec<Vec<f64>> = raw.iter().map(|r| softmax(r)).collect();
            let mut trees = Vec::with_capacity(n_classes);

            for class in 0..n_classes {
                for i in 0..n {
                    let p = probs[i][class];
                    let y = if labels[i] == class { 1.0 } else { 0.0 };
                    grad[i] = p - y;
                    hess[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
                }

                let tree = TreeBuilder {
                    binned: &binned,
                    thresholds: &thresholds,
                    grad: &grad,
                    hess: &hess,
                    config,
                    nodes: Vec::new(),
                }
                .build(all_rows.clone());

                for (r, row) in raw.iter_mut().zip(rows) {
                    r[class] += tree.predict(row);
                }
                if let Some((h_rows, _)) = holdout {
                    for (r, row) in holdout_raw.iter_mut().zip(h_rows) {
                        r[class] += tree.predict(row);
                    }
                }

                trees.push(tree);
            }

            model.rounds.push(trees);

            if let Some((_, h_labels)) = holdout.filter(|(h, _)| !h.is_empty()) {
                let loss = log_loss(&holdout_raw, h_labels);
                if model.best_score.map_or(true, |best| loss < best) {
                    model.best_score = Some(loss);
                    model.best_iteration = round + 1;
                }
            }
        }

        if model.best_score.is_none() {
            model.best_iteration = model.rounds.len();
        }

        log::info!(
            "Classifier trained: {} rounds x {} classes, best iteration {}",
            model.rounds.len(),
            n_classes,
            model.best_iteration
        );

        Ok(model)
    }

    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut raw = self.base_scores.clone();
        for trees in &self.rounds {
            for (score, tree) in raw.iter_mut().zip(trees) {
                *score += tree.predict(x);
            }
        }
        softmax(&raw)
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// 1-based round with the lowest holdout log loss
    pub fn best_iteration(&self) -> usize {
        self.best_iteration
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_score
    }
}

impl Predictor for GradientBoostedClassifier {
    fn kind(&self) -> ModelKind {
        ModelKind::Classifier
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn score(&self, features: &[f64]) -> ModelSignal {
        ModelSignal::Probabilities(self.predict_proba(features))
    }
}

fn softmax(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = raw.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Mean multiclass log loss
fn log_loss(raw: &[Vec<f64>], labels: &[usize]) -> f64 {
    let total: f64 = raw
        .iter()
        .zip(labels)
        .map(|(r, &y)| -softmax(r)[y].max(PROB_EPSILON).ln())
        .sum();
    total / raw.len().max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ClassifierConfig {
        ClassifierConfig {
            n_rounds: 20,
            min_samples_leaf: 3,
            ..Default::default()
        }
    }

    /// Class = which third of the x axis a point lies in
    fn three_bands(n: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![(i % 30) as f64, ((i * 7) % 11) as f64])
            .collect();
        let labels = rows.iter().map(|r| (r[0] / 10.0) as usize).collect();
        (rows, labels)
    }

    #[test]
    fn test_bin_thresholds_midpoints() {
        let rows = vec![vec![1.0], vec![3.0], vec![3.0], vec![5.0]];
        let t = bin_thresholds(&rows, 1, 32);
        assert_eq!(t[0], vec![2.0, 4.0]);
        assert_eq!(bin_of(&t[0], 1.0), 0);
        assert_eq!(bin_of(&t[0], 2.0), 0);
        assert_eq!(bin_of(&t[0], 3.0), 1);
        assert_eq!(bin_of(&t[0], 9.0), 2);
    }

    #[test]
    fn test_bin_thresholds_capped() {
        let rows: Vec<Vec<f64>> = (0..1000).map(|i| vec![i as f64]).collect();
        let t = bin_thresholds(&rows, 1, 32);
        assert!(t[0].len() <= 31);
        assert!(t[0].windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_learns_separable_classes() {
        let (rows, labels) = three_bands(300);
        let model = GradientBoostedClassifier::fit(&rows, &labels, 3, None, &small_config()).unwrap();

        assert_eq!(model.n_rounds(), 20);
        for (row, &y) in rows.iter().zip(&labels).step_by(17) {
            let p = model.predict_proba(row);
            let top = ModelSignal::Probabilities(p.clone()).top_class().unwrap();
            assert_eq!(top.0, y, "row {:?} probs {:?}", row, p);
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (rows, labels) = three_bands(90);
        let model = GradientBoostedClassifier::fit(&rows, &labels, 6, None, &small_config()).unwrap();

        let p = model.predict_proba(&[100.0, -3.0]);
        assert_eq!(p.len(), 6);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(p.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_holdout_tracks_best_iteration() {
        let (rows, labels) = three_bands(300);
        let (train, holdout) = rows.split_at(240);
        let (train_y, holdout_y) = labels.split_at(240);

        let model = GradientBoostedClassifier::fit(
            train,
            train_y,
            3,
            Some((holdout, holdout_y)),
            &small_config(),
        )
        .unwrap();

        let best = model.best_score().unwrap();
        assert!(best.is_finite() && best < 1.0);
        assert!(model.best_iteration() >= 1 && model.best_iteration() <= 20);
    }

    #[test]
    fn test_rejects_bad_labels() {
        let rows = vec![vec![0.0], vec![1.0]];
        assert!(GradientBoostedClassifier::fit(&rows, &[0, 7], 3, None, &small_config()).is_err());
        assert!(GradientBoostedClassifier::fit(&[], &[], 3, None, &small_config()).is_err());
    }
}
