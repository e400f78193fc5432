//! Model Registry
//!
//! **One immutable unit: schema, scaler, three predictors.**
//!
//! A registry is never mutated after training. Reloads and retrains build a
//! new one and swap it into the [`RegistryHandle`], so a scoring call sees
//! either the old registry or the new one, never a mix.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::autoencoder::Autoencoder;
use super::classifier::GradientBoostedClassifier;
use super::isolation::IsolationForest;
use super::predictor::Predictor;
use super::scaler::Scaler;
use super::summary::TrainingSummary;
use crate::logic::dataset::AttackType;
use crate::logic::error::{FusionError, FusionResult};
use crate::logic::features::FeatureSchema;

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistry {
    /// Column order captured at training
    pub schema: FeatureSchema,
    pub scaler: Scaler,
    pub classifier: GradientBoostedClassifier,
    pub forest: IsolationForest,
    pub autoencoder: Autoencoder,
    pub summary: TrainingSummary,
}

impl ModelRegistry {
    /// The three predictors in fusion order
    pub fn predictors(&self) -> [&dyn Predictor; 3] {
        [&self.classifier, &self.forest, &self.autoencoder]
    }

    pub fn schema_hash(&self) -> u32 {
        self.schema.hash()
    }

    /// Every component must agree with the frozen schema
    pub fn validate(&self) -> FusionResult<()> {
        let expected = self.schema.len();
        let hash = self.schema.hash();

        let widths = std::iter::once(self.scaler.width())
            .chain(self.predictors().into_iter().map(|p| p.input_width()));

        for width in widths {
            self.schema.check(width, hash)?;
        }

        if self.summary.schema_hash != hash {
            return Err(FusionError::SchemaMismatch {
                expected_columns: expected,
                expected_hash: hash,
                actual_columns: self.summary.feature_count,
                actual_hash: self.summary.schema_hash,
            });
        }

        if self.classifier.n_classes() != AttackType::COUNT {
            return Err(FusionError::PersistenceCorrupt(format!(
                "classifier has {} classes, expected {}",
                self.classifier.n_classes(),
                AttackType::COUNT
            )));
        }

        Ok(())
    }
}

// ============================================================================
// SHARED HANDLE
// ============================================================================

/// Shared, swappable reference to the active registry
#[derive(Debug, Default)]
pub struct RegistryHandle {
    current: RwLock<Option<Arc<ModelRegistry>>>,
}

impl RegistryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent snapshot for one scoring call
    pub fn snapshot(&self) -> FusionResult<Arc<ModelRegistry>> {
        self.current.read().clone().ok_or(FusionError::RegistryNotReady)
    }

    /// Atomically replace the active registry, returning the previous one
    pub fn install(&self, registry: ModelRegistry) -> Option<Arc<ModelRegistry>> {
        let hash = registry.schema_hash();
        let previous = self.current.write().replace(Arc::new(registry));

        match &previous {
            Some(old) => log::info!(
                "Model registry swapped (schema {:08x} -> {:08x})",
                old.schema_hash(),
                hash
            ),
            None => log::info!("Model registry installed (schema {:08x})", hash),
        }

        previous
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }
}
