//! Features Module - Feature Codec
//!
//! Turns records into fixed-order numeric vectors laid out on a frozen
//! [`FeatureSchema`]. Adding a column means touching `layout` and bumping
//! its version, nothing else.

pub mod codec;
pub mod layout;
pub mod network;
pub mod user_agent;
pub mod vector;


// Re-export common types
pub use codec::{encode, encode_frame, EncodedFrame, EncodedRecord};
pub use layout::{FeatureSchema, FEATURE_VERSION};
pub use vector::FeatureVector;
