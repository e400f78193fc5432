//! Fusion thresholds
//!
//! The classifier threshold is fixed. The reconstruction threshold is a
//! percentile of the reconstruction errors of the batch being scored, so it
//! only means something for batches of several records.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Threshold Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Top-class probability above which the classifier alone raises an alert
    pub confidence_threshold: f64,

    /// Percentile (0-100) of batch reconstruction errors used as the cut
    pub reconstruction_percentile: f64,

    /// Batches smaller than this get a reconstruction check that is
    /// reported as unreliable
    pub min_reconstruction_batch: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: constants::DEFAULT_CONFIDENCE_THRESHOLD,
            reconstruction_percentile: constants::DEFAULT_RECONSTRUCTION_PERCENTILE,
            min_reconstruction_batch: 2,
        }
    }
}

impl ThresholdConfig {
    pub fn from_env() -> Self {
        Self {
            confidence_threshold: constants::get_confidence_threshold(),
            reconstruction_percentile: constants::get_reconstruction_percentile(),
            ..Default::default()
        }
    }

    /// Reconstruction cut for one scoring batch
    pub fn reconstruction_threshold(&self, errors: &[f64]) -> ReconstructionThreshold {
        let value = percentile(errors, self.reconstruction_percentile).unwrap_or(f64::INFINITY);
        let reliable = errors.len() >= self.min_reconstruction_batch;

        if !reliable {
            log::debug!(
                "Reconstruction threshold from {} record(s) is structurally unreliable",
                errors.len()
            );
        }

        ReconstructionThreshold {
            value,
            batch_size: errors.len(),
            reliable,
        }
    }
}

/// Batch-relative reconstruction cut
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionThreshold {
    pub value: f64,
    pub batch_size: usize,
    pub reliable: bool,
}

impl ReconstructionThreshold {
    pub fn exceeded_by(&self, error: f64) -> bool {
        error > self.value
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is in 0..=100. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
