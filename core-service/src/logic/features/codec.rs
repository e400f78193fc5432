//! Feature Codec - Record → fixed-order numeric vector
//!
//! Two modes:
//! - **training**: no schema supplied, the schema is captured from the frame
//! - **inference**: the frozen schema is supplied and every record is
//!   reindexed onto it (extra columns dropped, missing columns zero-filled)
//!
//! Single bad fields never fail encoding. They are replaced by a safe default
//! and reported as [`FieldCoercionDefaulted`].

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::layout::{response_action_column, FeatureSchema, BASE_COLUMNS, USER_AGENT_COLUMNS};
use super::network::ipv4_to_u32;
use super::user_agent;
use super::vector::FeatureVector;
use crate::logic::dataset::record::{
    FIELD_DATA_EXFILTRATED, FIELD_DESTINATION_IP, FIELD_SEVERITY, FIELD_SOURCE_IP, FIELD_TIMESTAMP,
};
use crate::logic::dataset::{AttackType, Record, Severity};
use crate::logic::error::FieldCoercionDefaulted;

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// One encoded record
#[derive(Debug, Clone)]
pub struct EncodedRecord {
    /// Scoring features (label excluded)
    pub vector: FeatureVector,
    /// Training label, kept beside the features
    pub label: AttackType,
    /// Fields that fell back to defaults
    pub coercions: Vec<FieldCoercionDefaulted>,
}

/// A batch of records encoded on one schema
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub schema: FeatureSchema,
    pub rows: Vec<EncodedRecord>,
}

impl EncodedFrame {
    pub fn vectors(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.vector.values.clone()).collect()
    }

    pub fn labels(&self) -> Vec<AttackType> {
        self.rows.iter().map(|r| r.label).collect()
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Encode one record onto a frozen schema (inference mode)
pub fn encode(record: &Record, schema: &FeatureSchema) -> EncodedRecord {
    let extracted = extract(record);
    extracted.into_encoded(schema)
}

/// Encode a frame. Without a schema the schema is captured from the frame.
pub fn encode_frame(records: &[Record], schema: Option<&FeatureSchema>) -> EncodedFrame {
    let extracted: Vec<Extracted> = records.iter().map(extract).collect();

    let schema = match schema {
        Some(s) => s.clone(),
        None => capture_schema(&extracted),
    };

    let rows = extracted
        .into_iter()
        .map(|e| e.into_encoded(&schema))
        .collect();

    EncodedFrame { schema, rows }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Named columns pulled from one record before reindexing
struct Extracted {
    columns: Vec<(String, f64)>,
    has_user_agent: bool,
    response_action: Option<String>,
    label: AttackType,
    coercions: Vec<FieldCoercionDefaulted>,
}

impl Extracted {
    fn into_encoded(self, schema: &FeatureSchema) -> EncodedRecord {
        EncodedRecord {
            vector: reindex(&self.columns, schema),
            label: self.label,
            coercions: self.coercions,
        }
    }
}

fn extract(record: &Record) -> Extracted {
    let mut coercions = Vec::new();
    let mut columns = Vec::with_capacity(BASE_COLUMNS.len() + USER_AGENT_COLUMNS.len() + 1);

    let source = encode_ip(FIELD_SOURCE_IP, &record.source_ip, &mut coercions);
    let destination = encode_ip(FIELD_DESTINATION_IP, &record.destination_ip, &mut coercions);
    let timestamp = encode_timestamp(&record.timestamp, &mut coercions);
    let severity = encode_severity(record.severity.as_deref(), &mut coercions);
    let exfiltrated = encode_flag(record.data_exfiltrated.as_deref(), &mut coercions);

    for (name, value) in BASE_COLUMNS
        .iter()
        .zip([source, destination, timestamp, severity, exfiltrated])
    {
        columns.push((name.to_string(), value));
    }

    let user_agent = record.user_agent.as_deref();
    if let Some(ua) = user_agent {
        for (name, value) in user_agent::one_hot(ua) {
            columns.push((name.to_string(), value));
        }
    }

    let response_action = record
        .response_action
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);
    if let Some(action) = &response_action {
        columns.push((response_action_column(action), 1.0));
    }

    Extracted {
        columns,
        has_user_agent: user_agent.is_some(),
        response_action,
        label: record.label(),
        coercions,
    }
}

/// Base columns, then user agent columns if any record had one, then the
/// observed response actions in sorted order
fn capture_schema(frame: &[Extracted]) -> FeatureSchema {
    let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|s| s.to_string()).collect();

    if frame.iter().any(|e| e.has_user_agent) {
        columns.extend(USER_AGENT_COLUMNS.iter().map(|s| s.to_string()));
    }

    let actions: BTreeSet<&str> = frame
        .iter()
        .filter_map(|e| e.response_action.as_deref())
        .collect();
    columns.extend(actions.into_iter().map(response_action_column));

    FeatureSchema::new(columns)
}

/// Force a record's columns onto the schema
fn reindex(columns: &[(String, f64)], schema: &FeatureSchema) -> FeatureVector {
    let named: HashMap<&str, f64> = columns.iter().map(|(n, v)| (n.as_str(), *v)).collect();

    if log::log_enabled!(log::Level::Debug) {
        for (name, _) in columns {
            if schema.index_of(name).is_none() {
                log::debug!("Dropping column '{}' not present in schema", name);
            }
        }
    }

    FeatureVector {
        layout_hash: schema.hash(),
        values: schema
            .columns
            .iter()
            .map(|c| named.get(c.as_str()).copied().unwrap_or(0.0))
            .collect(),
    }
}

// ============================================================================
// FIELD COERCION
// ============================================================================

fn encode_ip(field: &str, raw: &str, coercions: &mut Vec<FieldCoercionDefaulted>) -> f64 {
    match ipv4_to_u32(raw) {
        Some(n) => n as f64,
        None => {
            coercions.push(FieldCoercionDefaulted::new(field, raw, 0.0));
            0.0
        }
    }
}

fn encode_timestamp(raw: &str, coercions: &mut Vec<FieldCoercionDefaulted>) -> f64 {
    match parse_timestamp(raw) {
        Some(secs) => secs as f64,
        None => {
            coercions.push(FieldCoercionDefaulted::new(FIELD_TIMESTAMP, raw, 0.0));
            0.0
        }
    }
}

fn encode_severity(raw: Option<&str>, coercions: &mut Vec<FieldCoercionDefaulted>) -> f64 {
    let Some(raw) = raw else {
        return Severity::Unknown.code() as f64;
    };

    match Severity::from_label(raw) {
        Some(severity) => severity.code() as f64,
        None => {
            coercions.push(FieldCoercionDefaulted::new(FIELD_SEVERITY, raw, 0.0));
            0.0
        }
    }
}

fn encode_flag(raw: Option<&str>, coercions: &mut Vec<FieldCoercionDefaulted>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => 1.0,
        "false" | "0" | "" => 0.0,
        _ => {
            coercions.push(FieldCoercionDefaulted::new(FIELD_DATA_EXFILTRATED, raw, 0.0));
            0.0
        }
    }
}

/// Epoch seconds, truncating any fractional part
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();

    if let Ok(secs) = raw.parse::<f64>() {
        return secs.is_finite().then(|| secs.trunc() as i64);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().timestamp());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp())
}
