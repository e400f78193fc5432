//! Error handling
//!
//! Field-level defects never surface here: they are absorbed as
//! [`FieldCoercionDefaulted`] values and logged. Everything else is a
//! [`FusionError`].

use std::path::PathBuf;
use thiserror::Error;

pub type FusionResult<T> = Result<T, FusionError>;

#[derive(Debug, Error)]
pub enum FusionError {
    /// Input is not record-shaped. Aborts only that record.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Scoring attempted before any successful train/load.
    #[error("model registry not ready: no trained or loaded models")]
    RegistryNotReady,

    /// Encoded vector disagrees with the frozen schema.
    #[error(
        "feature schema mismatch: expected {expected_columns} columns (hash {expected_hash:08x}), \
         got {actual_columns} (hash {actual_hash:08x})"
    )]
    SchemaMismatch {
        expected_columns: usize,
        expected_hash: u32,
        actual_columns: usize,
        actual_hash: u32,
    },

    /// No registry was ever saved at this path.
    #[error("no persisted model registry at {}", .0.display())]
    PersistenceUnavailable(PathBuf),

    /// A registry file exists but failed integrity checks.
    #[error("persisted model registry rejected: {0}")]
    PersistenceCorrupt(String),

    #[error("training failed: {0}")]
    Training(String),

    /// A predictor thread died mid-batch.
    #[error("predictor '{0}' failed during scoring")]
    PredictorFailed(&'static str),

    #[error("alert store error: {0}")]
    AlertStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for FusionError {
    fn from(err: rusqlite::Error) -> Self {
        FusionError::AlertStore(err.to_string())
    }
}

/// A single field that could not be parsed and was replaced by a safe
/// default. Logged at warn level, never fatal.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldCoercionDefaulted {
    pub field: String,
    pub raw: String,
    pub substituted: f64,
}

impl FieldCoercionDefaulted {
    pub fn new(field: &str, raw: impl Into<String>, substituted: f64) -> Self {
        let coercion = Self {
            field: field.to_string(),
            raw: raw.into(),
            substituted,
        };
        log::warn!("{}", coercion);
        coercion
    }
}

impl std::fmt::Display for FieldCoercionDefaulted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Field '{}' could not be parsed from {:?}; defaulted to {}",
            self.field, self.raw, self.substituted
        )
    }
}
