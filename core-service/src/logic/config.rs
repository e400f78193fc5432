//! Engine configuration
//!
//! Assembled from `constants` defaults plus `THREAT_FUSION_*` environment
//! overrides. The binary loads `.env` before calling [`EngineConfig::from_env`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::model::{ThresholdConfig, TrainingConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub registry_path: PathBuf,
    pub alert_db_path: PathBuf,
    pub report_path: PathBuf,
    pub thresholds: ThresholdConfig,
    pub training: TrainingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_data_dir(PathBuf::from(constants::DATA_DIR_NAME))
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            thresholds: ThresholdConfig::from_env(),
            training: TrainingConfig::from_env(),
            ..Self::with_data_dir(constants::get_data_dir())
        }
    }

    /// Default models and thresholds, every file under `data_dir`
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            registry_path: data_dir.join(constants::REGISTRY_FILE),
            alert_db_path: data_dir.join(constants::ALERT_DB_FILE),
            report_path: data_dir.join(constants::TRAINING_REPORT_FILE),
            data_dir,
            thresholds: ThresholdConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}
