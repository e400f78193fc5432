//! Feature Layout - Frozen Feature Schema
//!
//! **CRITICAL: the schema captured at training is the only valid layout at
//! inference.**
//!
//! ## Rules (NEVER break these):
//! 1. Columns are named; order is the order captured from the training frame
//! 2. Inference vectors are reindexed onto the frozen schema, never the reverse
//! 3. Any change to how columns are derived → increment FEATURE_VERSION
//!
//! The layout hash travels with every vector and with the persisted registry
//! so a drifted layout is caught before it reaches a model.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::logic::error::FusionError;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature derivation version
/// MUST be incremented when column derivation changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// COLUMN NAMES
// ============================================================================

/// Numeric columns every record produces, in frozen order
pub const BASE_COLUMNS: &[&str] = &[
    "Source IP",         // 0: IPv4 as u32
    "Destination IP",    // 1: IPv4 as u32
    "Timestamp",         // 2: epoch seconds, truncated
    "Attack Severity",   // 3: ordinal 0-4
    "Data Exfiltrated",  // 4: 0/1
];

/// One-hot user agent columns, present when the training frame had user agents
pub const USER_AGENT_COLUMNS: &[&str] = &[
    "Browser_Chrome",
    "Browser_Firefox",
    "Browser_Safari",
    "Device_Mobile",
    "Device_Desktop",
    "Device_Tablet",
];

/// Prefix of one-hot response action columns
pub const RESPONSE_ACTION_PREFIX: &str = "Response Action_";

pub fn response_action_column(action: &str) -> String {
    format!("{}{}", RESPONSE_ACTION_PREFIX, action)
}

// ============================================================================
// FEATURE SCHEMA
// ============================================================================

/// Ordered list of column names a model registry expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u8,
    pub columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            version: FEATURE_VERSION,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// CRC32 over version + column names in order
    pub fn hash(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&[self.version]);

        for name in &self.columns {
            hasher.update(name.as_bytes());
            hasher.update(&[0]); // Separator
        }

        hasher.finalize()
    }

    /// Column index by name (O(n) but columns are few)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    /// Response action categories frozen into this schema
    pub fn response_actions(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter_map(|c| c.strip_prefix(RESPONSE_ACTION_PREFIX))
    }

    /// Check a vector's width and hash against this schema
    pub fn check(&self, width: usize, hash: u32) -> Result<(), FusionError> {
        let expected_hash = self.hash();
        if width != self.len() || hash != expected_hash {
            return Err(FusionError::SchemaMismatch {
                expected_columns: self.len(),
                expected_hash,
                actual_columns: width,
                actual_hash: hash,
            });
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
