//! Predictor capability
//!
//! The three models have different native outputs. Each adapts its output
//! into a [`ModelSignal`] so fusion can consume them uniformly.

use serde::{Deserialize, Serialize};

// ============================================================================
// MODEL KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Classifier,
    OutlierDetector,
    Reconstruction,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Classifier => "gradient_boosting",
            ModelKind::OutlierDetector => "isolation_forest",
            ModelKind::Reconstruction => "autoencoder",
        }
    }
}

// ============================================================================
// MODEL SIGNAL
// ============================================================================

/// Common output shape of every predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelSignal {
    /// Full distribution over attack-type classes
    Probabilities(Vec<f64>),
    /// Inlier/outlier call plus the raw anomaly score behind it
    Outlier { is_outlier: bool, score: f64 },
    /// Mean squared reconstruction error
    ReconstructionError(f64),
}

impl ModelSignal {
    /// Highest-probability class and its probability
    pub fn top_class(&self) -> Option<(usize, f64)> {
        match self {
            ModelSignal::Probabilities(p) => p
                .iter()
                .copied()
                .enumerate()
                .fold(None, |best, (i, v)| match best {
                    Some((_, b)) if b >= v => best,
                    _ => Some((i, v)),
                }),
            _ => None,
        }
    }
}

// ============================================================================
// PREDICTOR TRAIT
// ============================================================================

/// A trained model that scores one scaled feature vector at a time
pub trait Predictor: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Width of the scaled vectors this model was trained on
    fn input_width(&self) -> usize;

    fn score(&self, features: &[f64]) -> ModelSignal;

    fn score_batch(&self, rows: &[Vec<f64>]) -> Vec<ModelSignal> {
        rows.iter().map(|r| self.score(r)).collect()
    }
}

// ============================================================================
// SIGNAL SET
// ============================================================================

/// The three signals for one record, unpacked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub probabilities: Vec<f64>,
    pub is_outlier: bool,
    pub outlier_score: f64,
    pub reconstruction_error: f64,
}

impl SignalSet {
    /// Assemble from signals of any order. Missing signals stay neutral.
    pub fn collect<'a>(signals: impl IntoIterator<Item = &'a ModelSignal>) -> Self {
        let mut set = SignalSet {
            probabilities: Vec::new(),
            is_outlier: false,
            outlier_score: 0.0,
            reconstruction_error: 0.0,
        };

        for signal in signals {
            match signal {
                ModelSignal::Probabilities(p) => set.probabilities = p.clone(),
                ModelSignal::Outlier { is_outlier, score } => {
                    set.is_outlier = *is_outlier;
                    set.outlier_score = *score;
                }
                ModelSignal::ReconstructionError(e) => set.reconstruction_error = *e,
            }
        }

        set
    }

    pub fn top_class(&self) -> (usize, f64) {
        ModelSignal::Probabilities(self.probabilities.clone())
            .top_class()
            .unwrap_or((0, 0.0))
    }
}
