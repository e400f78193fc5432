//! Verdict - fused decision for one record, plus its audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::alerts::{Alert, ALERT_TIME_FORMAT};
use crate::logic::dataset::AttackType;
use crate::logic::error::FieldCoercionDefaulted;
use crate::logic::model::{ReconstructionThreshold, SignalSet, ThresholdConfig};

// ============================================================================
// FUSION RULE
// ============================================================================

/// Which signals fired. The record is anomalous if any did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionDecision {
    pub classifier: bool,
    pub outlier: bool,
    pub reconstruction: bool,
}

impl FusionDecision {
    pub fn is_anomaly(&self) -> bool {
        self.classifier || self.outlier || self.reconstruction
    }
}

/// Logical OR across the three signals. No weighting, no quorum.
pub fn fuse(
    signals: &SignalSet,
    reconstruction: &ReconstructionThreshold,
    config: &ThresholdConfig,
) -> FusionDecision {
    let (_, confidence) = signals.top_class();

    FusionDecision {
        classifier: confidence > config.confidence_threshold,
        outlier: signals.is_outlier,
        reconstruction: reconstruction.exceeded_by(signals.reconstruction_error),
    }
}

// ============================================================================
// VERDICT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_anomaly: bool,
    /// When the record was scored, not when the event happened
    pub scored_at: DateTime<Utc>,
    pub source_ip: u32,
    pub destination_ip: u32,
    /// Classifier's highest-probability class
    pub attack_type: AttackType,
    pub confidence: f64,
    /// Declared severity of the input record
    pub severity: u8,
    pub decision: FusionDecision,
    pub outlier_score: f64,
    pub reconstruction_error: f64,
    pub reconstruction_threshold: f64,
    /// False when the batch was too small for a meaningful percentile
    pub reconstruction_reliable: bool,
    pub coercions: Vec<FieldCoercionDefaulted>,
}

impl Verdict {
    pub fn to_alert(&self) -> Alert {
        Alert {
            timestamp: self.scored_at.format(ALERT_TIME_FORMAT).to_string(),
            source_ip: self.source_ip,
            destination_ip: self.destination_ip,
            attack_type: self.attack_type.code(),
            confidence: self.confidence,
            severity: self.severity,
            isolation_forest_anomaly: self.decision.outlier,
            autoencoder_anomaly: self.decision.reconstruction,
            autoencoder_score: self.reconstruction_error,
        }
    }
}
