//! Model Module - Predictors and the Registry that owns them
//!
//! Training builds one immutable [`ModelRegistry`]; scoring borrows it
//! through a [`RegistryHandle`] snapshot.

pub mod autoencoder;
pub mod classifier;
pub mod isolation;
pub mod predictor;
pub mod registry;
pub mod scaler;
pub mod summary;
pub mod threshold;
pub mod training;

#[cfg(test)]
mod tests;

// Re-export common types
pub use predictor::{ModelKind, ModelSignal, Predictor, SignalSet};
pub use registry::{ModelRegistry, RegistryHandle};
pub use scaler::Scaler;
pub use summary::TrainingSummary;
pub use threshold::{ReconstructionThreshold, ThresholdConfig};
pub use training::TrainingConfig;
