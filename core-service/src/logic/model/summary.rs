//! Training summary
//!
//! Stored inside the registry and rendered as `model_performance.txt` for
//! operators. Nothing else reads it.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::error::FusionResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSummary {
    pub rounds: usize,
    pub best_iteration: usize,
    /// Holdout multiclass log loss at the best iteration
    pub best_score: Option<f64>,
    pub holdout_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSummary {
    pub estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoencoderSummary {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub encoding_dim: usize,
    pub epochs: usize,
    pub final_loss: f64,
    pub holdout_loss: Option<f64>,
    /// 95th percentile of holdout reconstruction error
    pub holdout_p95: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub total_records: usize,
    pub train_records: usize,
    pub holdout_records: usize,
    pub feature_count: usize,
    pub schema_hash: u32,
    pub classifier: ClassifierSummary,
    pub forest: ForestSummary,
    pub autoencoder: AutoencoderSummary,
}

impl TrainingSummary {
    /// Human-readable report
    pub fn render(&self) -> String {
        let mut out = String::new();
        let opt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.6}", v));

        // Writing to a String cannot fail
        let _ = writeln!(out, "Models trained successfully!");
        let _ = writeln!(out, "Run: {}", self.run_id);
        let _ = writeln!(out, "Trained at: {}", self.trained_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(
            out,
            "Records: {} (train {}, holdout {})",
            self.total_records, self.train_records, self.holdout_records
        );
        let _ = writeln!(
            out,
            "Features: {} (schema hash {:08x})",
            self.feature_count, self.schema_hash
        );

        let _ = writeln!(out, "\nGradient Boosting Model:");
        let _ = writeln!(out, "Number of Boosting Rounds: {}", self.classifier.rounds);
        let _ = writeln!(out, "Best Iteration: {}", self.classifier.best_iteration);
        let _ = writeln!(out, "Best Score (holdout log loss): {}", opt(self.classifier.best_score));
        let _ = writeln!(out, "Holdout Accuracy: {}", opt(self.classifier.holdout_accuracy));

        let _ = writeln!(out, "\nIsolation Forest Model:");
        let _ = writeln!(out, "Number of Estimators: {}", self.forest.estimators);
        let _ = writeln!(out, "Max Samples: {}", self.forest.max_samples);
        let _ = writeln!(out, "Contamination: {}", self.forest.contamination);
        let _ = writeln!(out, "Offset: {:.6}", self.forest.offset);

        let _ = writeln!(out, "\nAutoencoder Model:");
        let _ = writeln!(out, "Input Dimension: {}", self.autoencoder.input_dim);
        let _ = writeln!(out, "Hidden Dimension: {}", self.autoencoder.hidden_dim);
        let _ = writeln!(out, "Encoding Dimension: {}", self.autoencoder.encoding_dim);
        let _ = writeln!(out, "Epochs: {}", self.autoencoder.epochs);
        let _ = writeln!(out, "Final Training Loss: {:.6}", self.autoencoder.final_loss);
        let _ = writeln!(out, "Holdout Loss: {}", opt(self.autoencoder.holdout_loss));
        let _ = writeln!(out, "Holdout p95 Reconstruction Error: {}", opt(self.autoencoder.holdout_p95));

        out
    }

    pub fn write_report(&self, path: &Path) -> FusionResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())?;
        log::info!("Training report written to {:?}", path);
        Ok(())
    }
}
