use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logic::error::{FusionError, FusionResult};

// ============================================================================
// FIELD NAMES
// ============================================================================

pub const FIELD_SOURCE_IP: &str = "Source IP";
pub const FIELD_DESTINATION_IP: &str = "Destination IP";
pub const FIELD_TIMESTAMP: &str = "Timestamp";
pub const FIELD_SEVERITY: &str = "Attack Severity";
pub const FIELD_ATTACK_TYPE: &str = "Attack Type";
pub const FIELD_DATA_EXFILTRATED: &str = "Data Exfiltrated";
pub const FIELD_USER_AGENT: &str = "User Agent";
pub const FIELD_RESPONSE_ACTION: &str = "Response Action";

/// Keys a JSON object must carry to count as a record at all
const REQUIRED_FIELDS: [&str; 3] = [FIELD_SOURCE_IP, FIELD_DESTINATION_IP, FIELD_TIMESTAMP];

// ============================================================================
// RECORD
// ============================================================================

/// One observed security event.
///
/// Fields hold the raw text handed over by ingestion. Coercion (IP parsing,
/// severity lookup, timestamp conversion) happens once, in the feature codec,
/// where every substituted default is recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "Source IP")]
    pub source_ip: String,
    #[serde(rename = "Destination IP")]
    pub destination_ip: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Attack Severity")]
    pub severity: Option<String>,
    #[serde(rename = "Attack Type")]
    pub attack_type: Option<String>,
    #[serde(rename = "Data Exfiltrated")]
    pub data_exfiltrated: Option<String>,
    #[serde(rename = "User Agent")]
    pub user_agent: Option<String>,
    #[serde(rename = "Response Action")]
    pub response_action: Option<String>,
}

impl Record {
    /// Build a record from one ingested key/value map.
    ///
    /// Fails only when the value is not record-shaped: not an object, or
    /// missing one of the address/timestamp keys. Bad values inside present
    /// keys are left for the codec to default.
    pub fn from_value(value: &Value) -> FusionResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            FusionError::MalformedRecord(format!("expected a JSON object, got {}", json_kind(value)))
        })?;

        if let Some(missing) = REQUIRED_FIELDS.iter().find(|k| !map.contains_key(**k)) {
            return Err(FusionError::MalformedRecord(format!("missing field '{}'", missing)));
        }

        let text = |key: &str| map.get(key).and_then(scalar_text);

        Ok(Self {
            source_ip: text(FIELD_SOURCE_IP).unwrap_or_default(),
            destination_ip: text(FIELD_DESTINATION_IP).unwrap_or_default(),
            timestamp: text(FIELD_TIMESTAMP).unwrap_or_default(),
            severity: text(FIELD_SEVERITY),
            attack_type: text(FIELD_ATTACK_TYPE),
            data_exfiltrated: text(FIELD_DATA_EXFILTRATED),
            user_agent: text(FIELD_USER_AGENT),
            response_action: text(FIELD_RESPONSE_ACTION),
        })
    }

    /// Declared attack type, `Unknown` when absent or unmapped
    pub fn label(&self) -> AttackType {
        self.attack_type
            .as_deref()
            .map(AttackType::from_label)
            .unwrap_or_default()
    }

    /// Declared severity as reported on a verdict.
    ///
    /// Numeric strings parse directly, otherwise the ordinal table applies,
    /// otherwise 0.
    pub fn declared_severity(&self) -> u8 {
        let Some(raw) = self.severity.as_deref().map(str::trim) else {
            return Severity::Unknown.code();
        };

        if let Ok(n) = raw.parse::<u8>() {
            if Severity::from_code(n).is_some() {
                return n;
            }
        }

        Severity::from_label(raw).unwrap_or_default().code()
    }
}

/// Scalars become text, null and containers become absent
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// SEVERITY
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn code(&self) -> u8 {
        match self {
            Severity::Unknown => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Severity::Unknown),
            1 => Some(Severity::Low),
            2 => Some(Severity::Medium),
            3 => Some(Severity::High),
            4 => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Ordinal table lookup. Exact labels only.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Low" => Some(Severity::Low),
            "Medium" => Some(Severity::Medium),
            "High" => Some(Severity::High),
            "Critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

// ============================================================================
// ATTACK TYPE
// ============================================================================

/// Training label and classifier output class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttackType {
    #[default]
    Unknown,
    Malware,
    Phishing,
    InsiderThreat,
    Ransomware,
    DDoS,
}

impl AttackType {
    /// Number of classifier classes (Unknown included)
    pub const COUNT: usize = 6;

    pub const ALL: [AttackType; Self::COUNT] = [
        AttackType::Unknown,
        AttackType::Malware,
        AttackType::Phishing,
        AttackType::InsiderThreat,
        AttackType::Ransomware,
        AttackType::DDoS,
    ];

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn index(&self) -> usize {
        self.code() as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttackType::Unknown => "Unknown",
            AttackType::Malware => "Malware",
            AttackType::Phishing => "Phishing",
            AttackType::InsiderThreat => "Insider Threat",
            AttackType::Ransomware => "Ransomware",
            AttackType::DDoS => "DDoS",
        }
    }

    /// Categorical table lookup, `Unknown` for anything unmapped
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.label() == label)
            .unwrap_or_default()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_reads_named_fields() {
        let value = json!({
            "Source IP": "10.0.0.1",
            "Destination IP": "192.168.1.9",
            "Timestamp": "2023-05-01 12:00:00",
            "Attack Severity": "High",
            "Attack Type": "Ransomware",
            "Data Exfiltrated": true,
            "User Agent": "Mozilla/5.0 Firefox/115.0",
            "Response Action": "Blocked",
            "Event ID": 77
        });

        let record = Record::from_value(&value).unwrap();
        assert_eq!(record.source_ip, "10.0.0.1");
        assert_eq!(record.severity.as_deref(), Some("High"));
        assert_eq!(record.data_exfiltrated.as_deref(), Some("true"));
        assert_eq!(record.label(), AttackType::Ransomware);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        let err = Record::from_value(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, FusionError::MalformedRecord(_)));
    }

    #[test]
    fn test_from_value_rejects_missing_required_field() {
        let err = Record::from_value(&json!({
            "Source IP": "10.0.0.1",
            "Timestamp": 1_700_000_000
        }))
        .unwrap_err();

        match err {
            FusionError::MalformedRecord(msg) => assert!(msg.contains("Destination IP")),
            other => panic!("Expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_null_optional_fields_are_absent() {
        let record = Record::from_value(&json!({
            "Source IP": "10.0.0.1",
            "Destination IP": "10.0.0.2",
            "Timestamp": 1_700_000_000,
            "User Agent": null
        }))
        .unwrap();

        assert_eq!(record.timestamp, "1700000000");
        assert!(record.user_agent.is_none());
        assert_eq!(record.label(), AttackType::Unknown);
    }

    #[test]
    fn test_declared_severity_coercion() {
        let with = |s: Option<&str>| Record {
            severity: s.map(String::from),
            ..Default::default()
        };

        assert_eq!(with(Some("3")).declared_severity(), 3);
        assert_eq!(with(Some("Critical")).declared_severity(), 4);
        assert_eq!(with(Some("Severe")).declared_severity(), 0);
        assert_eq!(with(Some("9")).declared_severity(), 0);
        assert_eq!(with(None).declared_severity(), 0);
    }

    #[test]
    fn test_attack_type_table() {
        assert_eq!(AttackType::from_label("Insider Threat"), AttackType::InsiderThreat);
        assert_eq!(AttackType::from_label("DDoS").code(), 5);
        assert_eq!(AttackType::from_label("Botnet"), AttackType::Unknown);
        assert_eq!(AttackType::from_code(2), Some(AttackType::Phishing));
        assert_eq!(AttackType::from_code(6), None);
    }
}
