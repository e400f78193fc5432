//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! To change a detection default, only edit this file.

use std::path::PathBuf;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Threat Fusion";

/// Directory name under the platform data dir
pub const DATA_DIR_NAME: &str = "threat-fusion";

/// Classifier top-class probability above which a record is anomalous
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Batch percentile used as the reconstruction-error threshold
pub const DEFAULT_RECONSTRUCTION_PERCENTILE: f64 = 95.0;

/// Expected outlier share when fitting the isolation forest
pub const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Share of the labeled frame held out from training
pub const DEFAULT_HOLDOUT_FRACTION: f64 = 0.2;

/// Seed for the train/holdout split and every model RNG
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Number of alerts returned by `recent` when the caller gives no limit
pub const DEFAULT_ALERT_LIMIT: usize = 10;

/// Model registry file (relative to the data dir)
pub const REGISTRY_FILE: &str = "models/registry_v1.json";

/// Alert database file (relative to the data dir)
pub const ALERT_DB_FILE: &str = "alerts.db";

/// Human-readable training report (relative to the data dir)
pub const TRAINING_REPORT_FILE: &str = "output/model_performance.txt";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get data directory from environment or use the platform default
pub fn get_data_dir() -> PathBuf {
    std::env::var("THREAT_FUSION_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DATA_DIR_NAME)
        })
}

/// Get classifier confidence threshold from environment or use default
pub fn get_confidence_threshold() -> f64 {
    env_parse("THREAT_FUSION_CONFIDENCE_THRESHOLD").unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD)
}

/// Get reconstruction percentile from environment or use default
pub fn get_reconstruction_percentile() -> f64 {
    env_parse("THREAT_FUSION_RECON_PERCENTILE")
        .filter(|p: &f64| (0.0..=100.0).contains(p))
        .unwrap_or(DEFAULT_RECONSTRUCTION_PERCENTILE)
}

/// Get isolation forest contamination from environment or use default
pub fn get_contamination() -> f64 {
    env_parse("THREAT_FUSION_CONTAMINATION")
        .filter(|c: &f64| *c > 0.0 && *c < 0.5)
        .unwrap_or(DEFAULT_CONTAMINATION)
}

/// Get split seed from environment or use default
pub fn get_split_seed() -> u64 {
    env_parse("THREAT_FUSION_SPLIT_SEED").unwrap_or(DEFAULT_SPLIT_SEED)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
