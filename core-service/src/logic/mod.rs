//! Logic Module - Detection engine
//!
//! ## Layout
//! - `dataset/` - Record ingestion (JSON, JSON Lines)
//! - `features/` - Record -> fixed-width vector on a frozen schema
//! - `model/` - Scaler, the three predictors, registry and training
//! - `fusion/` - OR-fusion of predictor signals into verdicts
//! - `persistence/` - Checksummed registry file
//! - `alerts/` - Append-only alert stores
//! - `service` - Wires the above for the binary

pub mod alerts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod fusion;
pub mod model;
pub mod persistence;
pub mod service;

// Re-export common types
pub use config::EngineConfig;
pub use error::{FieldCoercionDefaulted, FusionError, FusionResult};
pub use service::{DetectionReport, DetectionService, RejectedRecord};
