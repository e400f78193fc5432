//! Integration tests for the fusion engine against a trained registry

#[cfg(test)]
mod integration_tests {
    use std::sync::{Arc, OnceLock};

    use serde_json::json;

    use crate::logic::dataset::fixtures::{outlandish_record, sample_records, sample_values};
    use crate::logic::dataset::Record;
    use crate::logic::error::FusionError;
    use crate::logic::fusion::FusionEngine;
    use crate::logic::model::{ModelRegistry, RegistryHandle, ThresholdConfig, TrainingConfig};

    fn registry() -> ModelRegistry {
        static TRAINED: OnceLock<ModelRegistry> = OnceLock::new();
        TRAINED
            .get_or_init(|| ModelRegistry::train(&sample_records(90), &TrainingConfig::fast()).unwrap())
            .clone()
    }

    fn engine() -> FusionEngine {
        let handle = Arc::new(RegistryHandle::new());
        handle.install(registry());
        FusionEngine::new(handle, ThresholdConfig::default())
    }

    #[test]
    fn test_not_ready_before_install() {
        let engine = FusionEngine::new(Arc::new(RegistryHandle::new()), ThresholdConfig::default());

        assert!(matches!(
            engine.score(&sample_records(1)[0]),
            Err(FusionError::RegistryNotReady)
        ));
        assert!(matches!(
            engine.score_values(&sample_values(3)),
            Err(FusionError::RegistryNotReady)
        ));
    }

    #[test]
    fn test_batch_verdict_fields() {
        let engine = engine();
        let records = sample_records(12);
        let verdicts = engine.score_batch(&records).unwrap();

        assert_eq!(verdicts.len(), 12);
        for (record, verdict) in records.iter().zip(&verdicts) {
            assert!(verdict.reconstruction_reliable);
            assert_eq!(verdict.severity, record.declared_severity());
            assert!((0.0..=1.0).contains(&verdict.confidence));
            assert_eq!(
                verdict.is_anomaly,
                verdict.decision.classifier || verdict.decision.outlier || verdict.decision.reconstruction
            );
        }
    }

    #[test]
    fn test_confident_family_is_flagged_by_classifier() {
        let engine = engine();
        let verdicts = engine.score_batch(&sample_records(6)).unwrap();

        // Families are fully separable, so the classifier is sure of each one
        for (record, verdict) in sample_records(6).iter().zip(&verdicts) {
            assert_eq!(verdict.attack_type, record.label());
            assert!(verdict.decision.classifier, "confidence {}", verdict.confidence);
            assert!(verdict.is_anomaly);
        }
    }

    #[test]
    fn test_outlandish_record_stands_out_in_batch() {
        let engine = engine();
        let mut batch = sample_records(19);
        batch.push(outlandish_record());

        let verdicts = engine.score_batch(&batch).unwrap();
        let strange = &verdicts[19];

        assert!(strange.decision.outlier);
        assert!(strange.decision.reconstruction);
        assert_eq!(strange.source_ip, 4_294_967_294);
        assert!(verdicts[..19].iter().all(|v| !v.decision.reconstruction));
    }

    #[test]
    fn test_single_record_reconstruction_is_unreliable() {
        let engine = engine();
        let verdict = engine.score(&outlandish_record()).unwrap();

        assert!(!verdict.reconstruction_reliable);
        assert!(!verdict.decision.reconstruction);
        assert_eq!(verdict.reconstruction_threshold, verdict.reconstruction_error);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let engine = engine();
        let record = sample_records(4)[3].clone();

        let a = engine.score(&record).unwrap();
        let b = engine.score(&record).unwrap();
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.attack_type, b.attack_type);
        assert_eq!(a.decision.outlier, b.decision.outlier);
        assert_eq!(a.outlier_score, b.outlier_score);
    }

    #[test]
    fn test_malformed_values_do_not_abort_batch() {
        let engine = engine();
        let mut values = sample_values(4);
        values.insert(1, json!("not a record"));
        values.push(json!({ "Source IP": "10.0.0.1" }));

        let results = engine.score_values(&values).unwrap();
        assert_eq!(results.len(), 6);

        assert!(matches!(results[1], Err(FusionError::MalformedRecord(_))));
        assert!(matches!(results[5], Err(FusionError::MalformedRecord(_))));
        for i in [0, 2, 3, 4] {
            assert!(results[i].is_ok(), "slot {} failed: {:?}", i, results[i]);
        }
    }

    #[test]
    fn test_coercions_travel_with_verdict() {
        let engine = engine();
        let mut record: Record = sample_records(1)[0].clone();
        record.destination_ip = "not-an-ip".to_string();

        let verdict = engine.score(&record).unwrap();
        assert_eq!(verdict.destination_ip, 0);
        assert_eq!(verdict.coercions.len(), 1);
        assert_eq!(verdict.coercions[0].field, "Destination IP");
    }

    #[test]
    fn test_swap_is_seen_by_next_call() {
        let handle = Arc::new(RegistryHandle::new());
        let engine = FusionEngine::new(Arc::clone(&handle), ThresholdConfig::default());
        assert!(engine.score(&sample_records(1)[0]).is_err());

        handle.install(registry());
        assert!(engine.score(&sample_records(1)[0]).is_ok());
    }
}
