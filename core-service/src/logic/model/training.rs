//! Training pipeline
//!
//! Labeled records -> captured schema -> seeded 80/20 split -> scaler fit on
//! the training partition -> three predictors trained side by side.

use std::thread;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::autoencoder::{Autoencoder, AutoencoderConfig};
use super::classifier::{ClassifierConfig, GradientBoostedClassifier};
use super::isolation::{ForestConfig, IsolationForest};
use super::predictor::ModelSignal;
use super::registry::ModelRegistry;
use super::scaler::Scaler;
use super::summary::{AutoencoderSummary, ClassifierSummary, ForestSummary, TrainingSummary};
use super::threshold::percentile;
use crate::constants;
use crate::logic::dataset::{AttackType, Record};
use crate::logic::error::{FusionError, FusionResult};
use crate::logic::features::encode_frame;

/// Smallest dataset that still leaves a holdout partition
pub const MIN_TRAINING_RECORDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub holdout_fraction: f64,
    pub seed: u64,
    pub classifier: ClassifierConfig,
    pub forest: ForestConfig,
    pub autoencoder: AutoencoderConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: constants::DEFAULT_HOLDOUT_FRACTION,
            seed: constants::DEFAULT_SPLIT_SEED,
            classifier: ClassifierConfig::default(),
            forest: ForestConfig::default(),
            autoencoder: AutoencoderConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn from_env() -> Self {
        Self {
            seed: constants::get_split_seed(),
            forest: ForestConfig {
                contamination: constants::get_contamination(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Seeded shuffle, then the first `ceil(n * fraction)` indices are held out.
/// Returns (train, holdout).
pub fn split_indices(n: usize, holdout_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let holdout = ((n as f64) * holdout_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let holdout = holdout.min(n.saturating_sub(1));

    let (held, train) = indices.split_at(holdout);
    (train.to_vec(), held.to_vec())
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, FusionResult<T>>, model: &str) -> FusionResult<T> {
    handle
        .join()
        .map_err(|_| FusionError::Training(format!("{} training thread panicked", model)))?
}

impl ModelRegistry {
    /// Train a complete registry from labeled records
    pub fn train(records: &[Record], config: &TrainingConfig) -> FusionResult<Self> {
        if records.len() < MIN_TRAINING_RECORDS {
            return Err(FusionError::Training(format!(
                "need at least {} labeled records, got {}",
                MIN_TRAINING_RECORDS,
                records.len()
            )));
        }

        let frame = encode_frame(records, None);
        let schema = frame.schema.clone();
        if schema.is_empty() {
            return Err(FusionError::Training("captured feature schema is empty".to_string()));
        }

        let vectors = frame.vectors();
        let labels: Vec<usize> = frame.labels().iter().map(AttackType::index).collect();

        let (train_idx, holdout_idx) = split_indices(vectors.len(), config.holdout_fraction, config.seed);
        log::info!(
            "Training on {} records ({} train, {} holdout, {} features)",
            records.len(),
            train_idx.len(),
            holdout_idx.len(),
            schema.len()
        );

        let rows_at = |idx: &[usize]| -> Vec<Vec<f64>> { idx.iter().map(|&i| vectors[i].clone()).collect() };
        let labels_at = |idx: &[usize]| -> Vec<usize> { idx.iter().map(|&i| labels[i]).collect() };

        let scaler = Scaler::fit(&rows_at(&train_idx))?;
        let train = scaler.transform_all(&rows_at(&train_idx));
        let holdout = scaler.transform_all(&rows_at(&holdout_idx));
        let train_y = labels_at(&train_idx);
        let holdout_y = labels_at(&holdout_idx);

        let (classifier, forest, autoencoder) = thread::scope(|s| {
            let classifier = s.spawn(|| {
                GradientBoostedClassifier::fit(
                    &train,
                    &train_y,
                    AttackType::COUNT,
                    Some((holdout.as_slice(), holdout_y.as_slice())),
                    &config.classifier,
                )
            });
            let forest = s.spawn(|| {
                let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1));
                IsolationForest::fit(&train, &config.forest, &mut rng)
            });
            let autoencoder = s.spawn(|| {
                let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(2));
                Autoencoder::fit(&train, &config.autoencoder, &mut rng)
            });

            (
                join(classifier, "classifier"),
                join(forest, "isolation forest"),
                join(autoencoder, "autoencoder"),
            )
        });
        let (classifier, forest, autoencoder) = (classifier?, forest?, autoencoder?);

        let holdout_accuracy = (!holdout.is_empty()).then(|| {
            let correct = holdout
                .iter()
                .zip(&holdout_y)
                .filter(|&(row, &y)| {
                    ModelSignal::Probabilities(classifier.predict_proba(row))
                        .top_class()
                        .map_or(false, |(class, _)| class == y)
                })
                .count();
            correct as f64 / holdout.len() as f64
        });

        let holdout_errors: Vec<f64> = holdout.iter().map(|r| autoencoder.reconstruction_error(r)).collect();
        let holdout_loss = (!holdout_errors.is_empty())
            .then(|| holdout_errors.iter().sum::<f64>() / holdout_errors.len() as f64);

        let summary = TrainingSummary {
            run_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            total_records: records.len(),
            train_records: train.len(),
            holdout_records: holdout.len(),
            feature_count: schema.len(),
            schema_hash: schema.hash(),
            classifier: ClassifierSummary {
                rounds: classifier.n_rounds(),
                best_iteration: classifier.best_iteration(),
                best_score: classifier.best_score(),
                holdout_accuracy,
            },
            forest: ForestSummary {
                estimators: forest.n_estimators(),
                max_samples: forest.max_samples(),
                contamination: forest.contamination(),
                offset: forest.offset(),
            },
            autoencoder: AutoencoderSummary {
                input_dim: autoencoder.input_dim(),
                hidden_dim: autoencoder.hidden_dim(),
                encoding_dim: autoencoder.encoding_dim(),
                epochs: autoencoder.epochs(),
                final_loss: autoencoder.final_loss(),
                holdout_loss,
                holdout_p95: percentile(&holdout_errors, 95.0),
            },
        };

        let registry = Self {
            schema,
            scaler,
            classifier,
            forest,
            autoencoder,
            summary,
        };
        registry.validate()?;

        log::info!("Training finished (run {})", registry.summary.run_id);
        Ok(registry)
    }
}

#[cfg(test)]
impl TrainingConfig {
    /// Small models for unit tests
    pub(crate) fn fast() -> Self {
        Self {
            classifier: ClassifierConfig {
                n_rounds: 30,
                min_samples_leaf: 5,
                ..Default::default()
            },
            forest: ForestConfig {
                n_estimators: 30,
                max_samples: 64,
                ..Default::default()
            },
            autoencoder: AutoencoderConfig {
                epochs: 20,
                learning_rate: 0.01,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
