//! Fusion Module - Multi-model anomaly verdicts
//!
//! Flow for one scoring call:
//! 1. Snapshot the active registry (one snapshot for the whole batch)
//! 2. Encode every record onto the frozen schema and check its layout hash
//! 3. Scale, then run the three predictors over the batch on scoped threads
//! 4. Derive the batch reconstruction threshold
//! 5. OR the three signals into a [`Verdict`] per record

pub mod verdict;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::thread;

use chrono::Utc;
use serde_json::Value;

use crate::logic::dataset::{AttackType, Record};
use crate::logic::error::{FusionError, FusionResult};
use crate::logic::features::network::ipv4_to_u32;
use crate::logic::features::{encode, EncodedRecord};
use crate::logic::model::{ModelRegistry, ModelSignal, RegistryHandle, SignalSet, ThresholdConfig};

pub use verdict::{fuse, FusionDecision, Verdict};

pub struct FusionEngine {
    registry: Arc<RegistryHandle>,
    thresholds: ThresholdConfig,
}

impl FusionEngine {
    pub fn new(registry: Arc<RegistryHandle>, thresholds: ThresholdConfig) -> Self {
        Self { registry, thresholds }
    }

    /// Score one record. Its reconstruction check is always unreliable.
    pub fn score(&self, record: &Record) -> FusionResult<Verdict> {
        let registry = self.registry.snapshot()?;
        self.score_with(&registry, std::slice::from_ref(record))?
            .pop()
            .ok_or_else(|| FusionError::MalformedRecord("record produced no verdict".to_string()))
    }

    /// Score a batch of well-formed records
    pub fn score_batch(&self, records: &[Record]) -> FusionResult<Vec<Verdict>> {
        let registry = self.registry.snapshot()?;
        self.score_with(&registry, records)
    }

    /// Score raw ingested values. A value that is not a record fails on its
    /// own slot; the rest of the batch is still scored.
    pub fn score_values(&self, values: &[Value]) -> FusionResult<Vec<FusionResult<Verdict>>> {
        let registry = self.registry.snapshot()?;

        let parsed: Vec<FusionResult<Record>> = values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                Record::from_value(value).inspect_err(|e| log::warn!("Rejected record #{}: {}", index, e))
            })
            .collect();

        let records: Vec<Record> = parsed.iter().filter_map(|r| r.as_ref().ok().cloned()).collect();
        let mut verdicts = self.score_with(&registry, &records)?.into_iter();

        Ok(parsed
            .into_iter()
            .map(|slot| {
                slot.and_then(|_| {
                    verdicts
                        .next()
                        .ok_or_else(|| FusionError::MalformedRecord("record produced no verdict".to_string()))
                })
            })
            .collect())
    }

    fn score_with(&self, registry: &ModelRegistry, records: &[Record]) -> FusionResult<Vec<Verdict>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let encoded: Vec<EncodedRecord> = records.iter().map(|r| encode(r, &registry.schema)).collect();
        for row in &encoded {
            row.vector.validate(&registry.schema).inspect_err(|_| {
                log::debug!("Rejected vector: {}", row.vector.to_log_entry(&registry.schema));
            })?;
        }

        let scaled: Vec<Vec<f64>> = encoded
            .iter()
            .map(|row| registry.scaler.transform(row.vector.as_slice()))
            .collect();

        let outputs = run_predictors(registry, &scaled)?;

        let signals: Vec<SignalSet> = (0..records.len())
            .map(|i| SignalSet::collect(outputs.iter().filter_map(|per_model| per_model.get(i))))
            .collect();

        let errors: Vec<f64> = signals.iter().map(|s| s.reconstruction_error).collect();
        let cut = self.thresholds.reconstruction_threshold(&errors);
        let scored_at = Utc::now();

        let verdicts: Vec<Verdict> = records
            .iter()
            .zip(encoded)
            .zip(&signals)
            .map(|((record, row), set)| {
                let decision = fuse(set, &cut, &self.thresholds);
                let (class, confidence) = set.top_class();

                Verdict {
                    is_anomaly: decision.is_anomaly(),
                    scored_at,
                    source_ip: ipv4_to_u32(&record.source_ip).unwrap_or(0),
                    destination_ip: ipv4_to_u32(&record.destination_ip).unwrap_or(0),
                    attack_type: AttackType::from_code(class as u8).unwrap_or_default(),
                    confidence,
                    severity: record.declared_severity(),
                    decision,
                    outlier_score: set.outlier_score,
                    reconstruction_error: set.reconstruction_error,
                    reconstruction_threshold: cut.value,
                    reconstruction_reliable: cut.reliable,
                    coercions: row.coercions,
                }
            })
            .collect();

        let anomalies = verdicts.iter().filter(|v| v.is_anomaly).count();
        log::debug!("Scored {} record(s), {} anomalous", verdicts.len(), anomalies);

        Ok(verdicts)
    }
}

/// One thread per predictor. A panicking predictor fails the whole call.
fn run_predictors(registry: &ModelRegistry, scaled: &[Vec<f64>]) -> FusionResult<Vec<Vec<ModelSignal>>> {
    thread::scope(|s| {
        let handles: Vec<_> = registry
            .predictors()
            .into_iter()
            .map(|predictor| (predictor.kind(), s.spawn(move || predictor.score_batch(scaled))))
            .collect();

        // Join every handle before reporting so no panic escapes the scope
        let joined: Vec<FusionResult<Vec<ModelSignal>>> = handles
            .into_iter()
            .map(|(kind, handle)| {
                handle.join().map_err(|_| {
                    log::error!("Predictor '{}' panicked during scoring", kind.name());
                    FusionError::PredictorFailed(kind.name())
                })
            })
            .collect();

        joined.into_iter().collect()
    })
}
