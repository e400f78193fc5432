use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};

use super::{Alert, AlertStore};
use crate::logic::error::FusionResult;

/// SQLite-backed alert store
pub struct SqliteAlertStore {
    conn: Mutex<Connection>,
}

impl SqliteAlertStore {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> FusionResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        store.init_schema()?;
        log::info!("Alert store opened at {:?}", path);
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_memory() -> FusionResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> FusionResult<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                source_ip INTEGER NOT NULL,
                destination_ip INTEGER NOT NULL,
                attack_type INTEGER NOT NULL,
                confidence REAL NOT NULL,
                severity INTEGER NOT NULL,
                isolation_forest_anomaly INTEGER NOT NULL,
                autoencoder_anomaly INTEGER NOT NULL,
                autoencoder_score REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON alerts(timestamp);
            "#,
        )?;
        Ok(())
    }
}

fn row_to_alert(row: &Row<'_>) -> rusqlite::Result<Alert> {
    Ok(Alert {
        timestamp: row.get(0)?,
        source_ip: row.get(1)?,
        destination_ip: row.get(2)?,
        attack_type: row.get(3)?,
        confidence: row.get(4)?,
        severity: row.get(5)?,
        isolation_forest_anomaly: row.get(6)?,
        autoencoder_anomaly: row.get(7)?,
        autoencoder_score: row.get(8)?,
    })
}

impl AlertStore for SqliteAlertStore {
    fn insert(&self, alerts: &[Alert]) -> FusionResult<()> {
        if alerts.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO alerts (timestamp, source_ip, destination_ip, attack_type, confidence,
                                     severity, isolation_forest_anomaly, autoencoder_anomaly,
                                     autoencoder_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for alert in alerts {
                stmt.execute(params![
                    alert.timestamp,
                    alert.source_ip,
                    alert.destination_ip,
                    alert.attack_type,
                    alert.confidence,
                    alert.severity,
                    alert.isolation_forest_anomaly,
                    alert.autoencoder_anomaly,
                    alert.autoencoder_score,
                ])?;
            }
        }
        tx.commit()?;

        log::info!("Stored {} alert(s)", alerts.len());
        Ok(())
    }

    fn recent(&self, limit: usize) -> FusionResult<Vec<Alert>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT timestamp, source_ip, destination_ip, attack_type, confidence, severity,
                    isolation_forest_anomaly, autoencoder_anomaly, autoencoder_score
             FROM alerts
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let alerts = stmt
            .query_map(params![limit], row_to_alert)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(alerts)
    }
}
