//! Dataset Module - Record ingestion boundary
//!
//! Turns ingested key/value maps (JSON array, single object, or JSON Lines)
//! into [`Record`]s. Structural defects reject one record, never the batch.

pub mod record;

#[cfg(test)]
pub(crate) mod fixtures;

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::logic::error::{FusionError, FusionResult};
pub use record::{AttackType, Record, Severity};

/// Read every record-like value from a file
pub fn read_values(path: &Path) -> FusionResult<Vec<Value>> {
    let text = fs::read_to_string(path)?;
    let values = parse_values(&text)?;
    log::info!("Read {} values from {:?}", values.len(), path);
    Ok(values)
}

/// Parse a JSON array, a single JSON object, or JSON Lines.
///
/// An unparseable line keeps its slot as `null`, so it is rejected as a
/// malformed record at its own index without losing the rest of the file.
pub fn parse_values(text: &str) -> FusionResult<Vec<Value>> {
    let trimmed = text.trim_start();

    if trimmed.starts_with('[') {
        return match serde_json::from_str(trimmed)? {
            Value::Array(items) => Ok(items),
            other => Ok(vec![other]),
        };
    }

    // One object, or one object per line
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(vec![value]);
    }

    Ok(trimmed
        .lines()
        .enumerate()
        .map(|(n, line)| (n, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).unwrap_or_else(|e| {
                log::warn!("Unparseable line {}: {}", n + 1, e);
                Value::Null
            })
        })
        .collect())
}

/// Convert values to records, keeping the index of every rejected value
pub fn records_from_values(values: &[Value]) -> (Vec<Record>, Vec<(usize, FusionError)>) {
    let mut records = Vec::with_capacity(values.len());
    let mut rejected = Vec::new();

    for (index, value) in values.iter().enumerate() {
        match Record::from_value(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::warn!("Rejected record #{}: {}", index, e);
                rejected.push((index, e));
            }
        }
    }

    (records, rejected)
}

/// Load a labeled training dataset, skipping values that are not records
pub fn load_records(path: &Path) -> FusionResult<Vec<Record>> {
    let values = read_values(path)?;
    let (records, rejected) = records_from_values(&values);

    if !rejected.is_empty() {
        log::warn!("Skipped {} malformed records in {:?}", rejected.len(), path);
    }

    Ok(records)
}
