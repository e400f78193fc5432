//! Integration tests for training and the registry handle

#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;

    use crate::logic::dataset::fixtures::{outlandish_record, sample_records};
    use crate::logic::error::FusionError;
    use crate::logic::features::encode;
    use crate::logic::model::training::{split_indices, MIN_TRAINING_RECORDS};
    use crate::logic::model::{ModelKind, ModelRegistry, RegistryHandle, TrainingConfig};

    fn trained() -> ModelRegistry {
        ModelRegistry::train(&sample_records(90), &TrainingConfig::fast()).unwrap()
    }

    #[test]
    fn test_split_is_reproducible() {
        let a = split_indices(100, 0.2, 42);
        let b = split_indices(100, 0.2, 42);
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 80);
        assert_eq!(a.1.len(), 20);

        let mut all: Vec<usize> = a.0.iter().chain(&a.1).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());

        assert_ne!(split_indices(100, 0.2, 7), a);
    }

    #[test]
    fn test_registry_shapes() {
        let registry = trained();

        // 5 base + 6 user agent + 3 response actions
        assert_eq!(registry.schema.len(), 14);
        assert_eq!(registry.scaler.width(), 14);
        assert!(registry.validate().is_ok());

        let kinds: Vec<ModelKind> = registry.predictors().iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            vec![ModelKind::Classifier, ModelKind::OutlierDetector, ModelKind::Reconstruction]
        );

        let summary = &registry.summary;
        assert_eq!(summary.total_records, 90);
        assert_eq!(summary.train_records, 72);
        assert_eq!(summary.holdout_records, 18);
        assert_eq!(summary.autoencoder.input_dim, 14);
        assert!(summary.autoencoder.encoding_dim < 14);
        assert_eq!(summary.forest.estimators, 30);
    }

    #[test]
    fn test_classifier_separates_families() {
        let registry = trained();
        let accuracy = registry.summary.classifier.holdout_accuracy.unwrap();
        assert!(accuracy > 0.9, "holdout accuracy {}", accuracy);
    }

    #[test]
    fn test_retraining_is_reproducible() {
        let a = trained();
        let b = trained();

        assert_eq!(a.schema, b.schema);
        assert_eq!(a.scaler, b.scaler);
        assert_eq!(a.classifier, b.classifier);
        assert_eq!(a.forest, b.forest);
        assert_eq!(a.autoencoder, b.autoencoder);
        assert_ne!(a.summary.run_id, b.summary.run_id);
    }

    #[test]
    fn test_outlandish_record_reconstructs_worse() {
        let registry = trained();
        let typical = encode(&sample_records(1)[0], &registry.schema);
        let strange = encode(&outlandish_record(), &registry.schema);

        let error = |values: &[f64]| {
            registry
                .autoencoder
                .reconstruction_error(&registry.scaler.transform(values))
        };
        assert!(error(strange.vector.as_slice()) > error(typical.vector.as_slice()));
    }

    #[test]
    fn test_too_few_records() {
        let err = ModelRegistry::train(&sample_records(MIN_TRAINING_RECORDS - 1), &TrainingConfig::fast())
            .unwrap_err();
        assert!(matches!(err, FusionError::Training(_)));
    }

    #[test]
    fn test_handle_swap() {
        let handle = RegistryHandle::new();
        assert!(!handle.is_ready());
        assert!(matches!(handle.snapshot(), Err(FusionError::RegistryNotReady)));

        assert!(handle.install(trained()).is_none());
        let first = handle.snapshot().unwrap();

        let previous = handle.install(trained()).unwrap();
        assert!(Arc::ptr_eq(&first, &previous));

        // Old snapshots stay intact after the swap
        let current = handle.snapshot().unwrap();
        assert!(!Arc::ptr_eq(&first, &current));
        assert_eq!(first.schema, current.schema);
    }
}
