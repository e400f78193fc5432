//! Persistence Module - Model registry on disk
//!
//! The whole registry is stored as one sealed envelope so the schema, the
//! scaler and the predictors can only ever be loaded together.

pub mod storage;
pub mod validate;


pub use storage::{default_registry_path, load_registry, save_registry};
pub use validate::{RegistryEnvelope, FORMAT_VERSION};
