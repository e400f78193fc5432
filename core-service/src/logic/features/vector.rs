//! Feature Vector - Core data structure for model input
//!
//! **Schema-stamped feature vector**
//!
//! A vector only exists after reindexing onto a [`FeatureSchema`], and it
//! remembers which schema that was.

use serde::{Deserialize, Serialize};

use super::layout::FeatureSchema;
use crate::logic::error::FusionError;

// ============================================================================
// SCHEMA-STAMPED FEATURE VECTOR
// ============================================================================

/// Ordered feature values plus the hash of the schema they were laid out on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// CRC32 hash of the schema (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in schema order
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// Zero vector for a schema
    pub fn zeroed(schema: &FeatureSchema) -> Self {
        Self {
            layout_hash: schema.hash(),
            values: vec![0.0; schema.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn get_by_name(&self, schema: &FeatureSchema, name: &str) -> Option<f64> {
        schema.index_of(name).and_then(|i| self.get(i))
    }

    /// Validate that this vector was laid out on `schema`
    pub fn validate(&self, schema: &FeatureSchema) -> Result<(), FusionError> {
        schema.check(self.values.len(), self.layout_hash)
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self, schema: &FeatureSchema) -> serde_json::Value {
        serde_json::json!({
            "layout_hash": self.layout_hash,
            "values": self.values,
            "named_values": schema.columns.iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.clone(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::layout::BASE_COLUMNS;

    fn base_schema() -> FeatureSchema {
        FeatureSchema::new(BASE_COLUMNS.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_zeroed_matches_schema() {
        let schema = base_schema();
        let vector = FeatureVector::zeroed(&schema);
        assert_eq!(vector.len(), schema.len());
        assert!(vector.validate(&schema).is_ok());
    }

    #[test]
    fn test_validate_rejects_other_schema() {
        let schema = base_schema();
        let vector = FeatureVector::zeroed(&schema);

        let mut other = schema.clone();
        other.columns.push("Browser_Chrome".to_string());

        assert!(vector.validate(&other).is_err());
    }

    #[test]
    fn test_to_log_entry() {
        let schema = base_schema();
        let mut vector = FeatureVector::zeroed(&schema);
        vector.values[3] = 4.0;

        let log = vector.to_log_entry(&schema);
        assert_eq!(log["named_values"]["Attack Severity"], 4.0);
        assert_eq!(vector.get_by_name(&schema, "Attack Severity"), Some(4.0));
    }
}
