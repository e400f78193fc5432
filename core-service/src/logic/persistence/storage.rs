use std::fs;
use std::path::{Path, PathBuf};

use super::validate::RegistryEnvelope;
use crate::constants;
use crate::logic::error::{FusionError, FusionResult};
use crate::logic::model::ModelRegistry;

/// Get default registry path
pub fn default_registry_path() -> PathBuf {
    constants::get_data_dir().join(constants::REGISTRY_FILE)
}

/// Save registry to disk, replacing any previous file atomically
pub fn save_registry(registry: &ModelRegistry, path: &Path) -> FusionResult<()> {
    // Ensure directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let envelope = RegistryEnvelope::seal(registry)?;
    let json = serde_json::to_vec_pretty(&envelope)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    log::info!(
        "Model registry saved to {:?} (schema {:08x})",
        path,
        envelope.schema_hash
    );
    Ok(())
}

/// Load registry from disk with validation
pub fn load_registry(path: &Path) -> FusionResult<ModelRegistry> {
    if !path.exists() {
        return Err(FusionError::PersistenceUnavailable(path.to_path_buf()));
    }

    let data = fs::read(path)?;
    let envelope: RegistryEnvelope = serde_json::from_slice(&data)
        .map_err(|e| FusionError::PersistenceCorrupt(format!("unreadable envelope: {}", e)))?;

    let registry = envelope.open()?;
    log::info!(
        "Model registry loaded from {:?} (run {})",
        path,
        registry.summary.run_id
    );
    Ok(registry)
}
