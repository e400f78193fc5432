//! Threat Fusion - security event anomaly detection
//!
//! Records are encoded onto a feature schema frozen at training time, scored
//! by a gradient-boosted classifier, an isolation forest and an autoencoder,
//! and fused into one verdict with the signals that fired.

pub mod constants;
pub mod logic;

pub use logic::alerts::{Alert, AlertStore, MemoryAlertStore, SqliteAlertStore};
pub use logic::dataset::{AttackType, Record, Severity};
pub use logic::fusion::{FusionDecision, FusionEngine, Verdict};
pub use logic::model::{ModelRegistry, RegistryHandle, ThresholdConfig, TrainingConfig, TrainingSummary};
pub use logic::{DetectionReport, DetectionService, EngineConfig, FusionError, FusionResult};
