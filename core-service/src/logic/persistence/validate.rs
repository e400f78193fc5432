use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::logic::error::{FusionError, FusionResult};
use crate::logic::model::ModelRegistry;

/// Current envelope layout
/// MUST be incremented when the envelope or registry layout changes
pub const FORMAT_VERSION: u32 = 1;

/// Sealed on-disk form of a [`ModelRegistry`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEnvelope {
    pub format_version: u32,
    /// Hash of the frozen feature schema inside `payload`
    pub schema_hash: u32,
    /// SHA-256 (hex) of the compact JSON encoding of `payload`
    pub checksum: String,
    pub saved_at: DateTime<Utc>,
    pub payload: Value,
}

fn checksum(payload: &Value) -> FusionResult<String> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

impl RegistryEnvelope {
    pub fn seal(registry: &ModelRegistry) -> FusionResult<Self> {
        let payload = serde_json::to_value(registry)?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            schema_hash: registry.schema_hash(),
            checksum: checksum(&payload)?,
            saved_at: Utc::now(),
            payload,
        })
    }

    /// Verify and unpack. Every rejection is `PersistenceCorrupt`.
    pub fn open(self) -> FusionResult<ModelRegistry> {
        validate_envelope(&self)?;

        let registry: ModelRegistry = serde_json::from_value(self.payload)
            .map_err(|e| FusionError::PersistenceCorrupt(format!("payload does not decode: {}", e)))?;

        if registry.schema_hash() != self.schema_hash {
            return Err(FusionError::PersistenceCorrupt(format!(
                "schema hash {:08x} in envelope, {:08x} in payload",
                self.schema_hash,
                registry.schema_hash()
            )));
        }

        registry
            .validate()
            .map_err(|e| FusionError::PersistenceCorrupt(e.to_string()))?;

        Ok(registry)
    }
}

/// Check version and checksum before touching the payload
pub fn validate_envelope(envelope: &RegistryEnvelope) -> FusionResult<()> {
    if envelope.format_version != FORMAT_VERSION {
        return Err(FusionError::PersistenceCorrupt(format!(
            "format version {} (expected {})",
            envelope.format_version, FORMAT_VERSION
        )));
    }

    let actual = checksum(&envelope.payload)?;
    if actual != envelope.checksum {
        return Err(FusionError::PersistenceCorrupt(format!(
            "checksum mismatch: stored {}, computed {}",
            envelope.checksum, actual
        )));
    }

    Ok(())
}
