//! Detection Service
//!
//! Owns the live registry, the fusion engine and the alert store. Training is
//! serialized by a mutex; scoring never waits on it because a new registry is
//! only swapped in after it has been trained and saved.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logic::alerts::{Alert, AlertStore, SqliteAlertStore};
use crate::logic::config::EngineConfig;
use crate::logic::dataset::Record;
use crate::logic::error::{FusionError, FusionResult};
use crate::logic::fusion::{FusionEngine, Verdict};
use crate::logic::model::{ModelRegistry, RegistryHandle, TrainingSummary};
use crate::logic::persistence::{load_registry, save_registry};

/// A record that never reached the models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub index: usize,
    pub reason: String,
}

/// Outcome of one `detect` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Verdicts for accepted records, in input order
    pub verdicts: Vec<Verdict>,
    pub rejected: Vec<RejectedRecord>,
    pub alerts_stored: usize,
}

impl DetectionReport {
    pub fn anomalies(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| v.is_anomaly)
    }
}

pub struct DetectionService {
    config: EngineConfig,
    registry: Arc<RegistryHandle>,
    engine: FusionEngine,
    store: Arc<dyn AlertStore>,
    training_lock: Mutex<()>,
}

impl DetectionService {
    pub fn new(config: EngineConfig, store: Arc<dyn AlertStore>) -> Self {
        let registry = Arc::new(RegistryHandle::new());
        let engine = FusionEngine::new(Arc::clone(&registry), config.thresholds.clone());

        Self {
            config,
            registry,
            engine,
            store,
            training_lock: Mutex::new(()),
        }
    }

    /// Service backed by the SQLite alert database named in `config`
    pub fn open(config: EngineConfig) -> FusionResult<Self> {
        let store = SqliteAlertStore::open(&config.alert_db_path)?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn engine(&self) -> &FusionEngine {
        &self.engine
    }

    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    /// Train, persist, report, then swap. A failure at any step leaves the
    /// current registry in place.
    pub fn train(&self, records: &[Record]) -> FusionResult<TrainingSummary> {
        let _guard = self.training_lock.lock();

        let registry = ModelRegistry::train(records, &self.config.training)?;
        save_registry(&registry, &self.config.registry_path)?;
        registry.summary.write_report(&self.config.report_path)?;

        let summary = registry.summary.clone();
        self.registry.install(registry);
        Ok(summary)
    }

    /// Summary of the registry currently serving detections
    pub fn active_summary(&self) -> FusionResult<TrainingSummary> {
        Ok(self.registry.snapshot()?.summary.clone())
    }

    /// Install the registry saved at the configured path. Holds the training
    /// lock so a load never overtakes a newer registry from `train`.
    pub fn load_models(&self) -> FusionResult<TrainingSummary> {
        let _guard = self.training_lock.lock();

        let registry = load_registry(&self.config.registry_path)?;
        let summary = registry.summary.clone();
        self.registry.install(registry);
        Ok(summary)
    }

    /// Load the saved registry, training only when none exists. `records` is
    /// called on that path alone. A corrupt file is still an error.
    pub fn load_or_train<F>(&self, records: F) -> FusionResult<TrainingSummary>
    where
        F: FnOnce() -> FusionResult<Vec<Record>>,
    {
        match self.load_models() {
            Err(FusionError::PersistenceUnavailable(path)) => {
                let records = records()?;
                log::info!("No saved models at {:?}, training from {} record(s)", path, records.len());
                self.train(&records)
            }
            other => other,
        }
    }

    /// Score raw values and persist every anomalous verdict
    pub fn detect(&self, values: &[Value]) -> FusionResult<DetectionReport> {
        let mut report = DetectionReport::default();

        for (index, slot) in self.engine.score_values(values)?.into_iter().enumerate() {
            match slot {
                Ok(verdict) => report.verdicts.push(verdict),
                Err(e) => report.rejected.push(RejectedRecord {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        let alerts: Vec<Alert> = report.anomalies().map(Verdict::to_alert).collect();
        if !alerts.is_empty() {
            self.store.insert(&alerts)?;
        }
        report.alerts_stored = alerts.len();

        log::info!(
            "Detection: {} scored, {} rejected, {} alert(s) stored",
            report.verdicts.len(),
            report.rejected.len(),
            report.alerts_stored
        );

        Ok(report)
    }

    pub fn recent_alerts(&self, limit: usize) -> FusionResult<Vec<Alert>> {
        self.store.recent(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::alerts::MemoryAlertStore;
    use crate::logic::dataset::fixtures::{outlandish_record, sample_records, sample_values};
    use crate::logic::model::TrainingConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> (DetectionService, Arc<MemoryAlertStore>) {
        let config = EngineConfig {
            training: TrainingConfig::fast(),
            ..EngineConfig::with_data_dir(dir.path())
        };
        let store = Arc::new(MemoryAlertStore::new());
        (DetectionService::new(config, store.clone()), store)
    }

    #[test]
    fn test_detect_before_models_fails() {
        let dir = TempDir::new().unwrap();
        let (service, store) = service(&dir);

        assert!(!service.is_ready());
        assert!(matches!(
            service.detect(&sample_values(3)),
            Err(FusionError::RegistryNotReady)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_train_saves_and_reports() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);

        let summary = service.train(&sample_records(60)).unwrap();

        assert!(service.is_ready());
        assert_eq!(summary.total_records, 60);
        assert!(service.config().registry_path.exists());

        let report = std::fs::read_to_string(&service.config().report_path).unwrap();
        assert!(report.starts_with("Models trained successfully!"));
    }

    #[test]
    fn test_load_or_train_prefers_saved_models() {
        let dir = TempDir::new().unwrap();
        let (first, _) = service(&dir);
        let trained = first.load_or_train(|| Ok(sample_records(60))).unwrap();

        // A second process over the same data dir loads instead of retraining
        let (second, _) = service(&dir);
        let loaded = second
            .load_or_train(|| Err(FusionError::Training("dataset must not be read".to_string())))
            .unwrap();

        assert_eq!(loaded.run_id, trained.run_id);
        assert_eq!(loaded.total_records, 60);
    }

    #[test]
    fn test_load_or_train_reads_dataset_when_no_models() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);

        let result = service.load_or_train(|| Err(FusionError::Training("no dataset".to_string())));

        assert!(matches!(result, Err(FusionError::Training(_))));
        assert!(!service.is_ready());
    }

    #[test]
    fn test_concurrent_load_never_installs_stale_registry() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);
        service.train(&sample_records(60)).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| service.train(&sample_records(66)).unwrap());
            s.spawn(|| service.load_models().unwrap());
        });

        let on_disk = load_registry(&service.config().registry_path).unwrap();
        assert_eq!(service.active_summary().unwrap().run_id, on_disk.summary.run_id);
        assert_eq!(on_disk.summary.total_records, 66);
    }

    #[test]
    fn test_load_models_missing_file() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);

        assert!(matches!(
            service.load_models(),
            Err(FusionError::PersistenceUnavailable(_))
        ));
        assert!(!service.is_ready());
    }

    #[test]
    fn test_detect_stores_only_anomalies() {
        let dir = TempDir::new().unwrap();
        let (service, store) = service(&dir);
        service.train(&sample_records(90)).unwrap();

        let mut values = sample_values(19);
        values.push(serde_json::to_value(outlandish_record()).unwrap());
        values.insert(4, json!("not a record"));

        let report = service.detect(&values).unwrap();

        assert_eq!(report.verdicts.len(), 20);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 4);
        assert_eq!(report.alerts_stored, report.anomalies().count());
        assert_eq!(store.len(), report.alerts_stored);
        assert!(report.verdicts.last().unwrap().is_anomaly);

        let recent = service.recent_alerts(100).unwrap();
        assert_eq!(recent.len(), report.alerts_stored);
    }
}
