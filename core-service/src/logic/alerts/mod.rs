//! Alerts Module - Append-only store of anomalous verdicts
//!
//! Only records judged anomalous ever reach a store. Alerts are never
//! updated after insert and are read back newest first.

pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};

use crate::logic::error::FusionResult;

pub use memory::MemoryAlertStore;
pub use sqlite::SqliteAlertStore;

/// Format of [`Alert::timestamp`]
pub const ALERT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted anomalous verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Scoring time, `YYYY-MM-DD HH:MM:SS` UTC
    pub timestamp: String,
    pub source_ip: u32,
    pub destination_ip: u32,
    /// Predicted attack-type code
    pub attack_type: u8,
    /// Classifier top-class probability
    pub confidence: f64,
    /// Declared severity 0-4
    pub severity: u8,
    pub isolation_forest_anomaly: bool,
    pub autoencoder_anomaly: bool,
    pub autoencoder_score: f64,
}

/// Append + recency query. Implementations must accept concurrent writers.
pub trait AlertStore: Send + Sync {
    fn insert(&self, alerts: &[Alert]) -> FusionResult<()>;

    /// Newest first by timestamp, later inserts first on ties
    fn recent(&self, limit: usize) -> FusionResult<Vec<Alert>>;
}

#[cfg(test)]
pub(crate) fn sample_alert(timestamp: &str, source_ip: u32) -> Alert {
    Alert {
        timestamp: timestamp.to_string(),
        source_ip,
        destination_ip: 3_405_803_777,
        attack_type: 1,
        confidence: 0.93,
        severity: 3,
        isolation_forest_anomaly: false,
        autoencoder_anomaly: true,
        autoencoder_score: 2.5,
    }
}
