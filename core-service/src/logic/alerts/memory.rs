use parking_lot::RwLock;

use super::{Alert, AlertStore};
use crate::logic::error::FusionResult;

/// Process-local store, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }
}

impl AlertStore for MemoryAlertStore {
    fn insert(&self, alerts: &[Alert]) -> FusionResult<()> {
        self.alerts.write().extend_from_slice(alerts);
        log::info!("Stored {} alert(s)", alerts.len());
        Ok(())
    }

    fn recent(&self, limit: usize) -> FusionResult<Vec<Alert>> {
        let alerts = self.alerts.read();

        // Reverse insertion order first so the stable sort keeps later inserts ahead on ties
        let mut newest: Vec<Alert> = alerts.iter().rev().cloned().collect();
        newest.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        newest.truncate(limit);
        Ok(newest)
    }
}
