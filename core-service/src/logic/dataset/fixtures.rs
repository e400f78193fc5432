//! Deterministic synthetic records shared by tests.

use serde_json::Value;

use super::record::Record;

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 Version/16.0 Safari/604.1",
    "Mozilla/5.0 (X11; Linux x86_64; rv:115.0) Gecko/20100101 Firefox/115.0",
    "Mozilla/5.0 (iPad; CPU OS 15_0 like Mac OS X) AppleWebKit/605.1.15 Version/15.0 Safari/604.1",
];

/// Three attack families with distinct, learnable footprints
pub(crate) fn sample_record(i: usize) -> Record {
    let family = i % 3;
    let jitter = (i * 7919) % 97;

    let (attack, severity, action, ua, exfil, subnet) = match family {
        0 => ("Malware", "High", "Blocked", USER_AGENTS[0], false, 10),
        1 => ("Phishing", "Low", "Logged", USER_AGENTS[1], true, 172),
        _ => ("DDoS", "Critical", "Ignored", USER_AGENTS[2], false, 192),
    };

    Record {
        source_ip: format!("{}.{}.{}.{}", subnet, jitter % 16, jitter, (i % 250) + 1),
        destination_ip: format!("203.0.{}.{}", family, jitter + 1),
        timestamp: (1_680_000_000 + (i as i64) * 3_600 + jitter as i64).to_string(),
        severity: Some(severity.to_string()),
        attack_type: Some(attack.to_string()),
        data_exfiltrated: Some(exfil.to_string()),
        user_agent: Some(ua.to_string()),
        response_action: Some(action.to_string()),
    }
}

pub(crate) fn sample_records(n: usize) -> Vec<Record> {
    (0..n).map(sample_record).collect()
}

pub(crate) fn sample_values(n: usize) -> Vec<Value> {
    sample_records(n)
        .iter()
        .map(|r| serde_json::to_value(r).unwrap())
        .collect()
}

/// A record far outside every training family
pub(crate) fn outlandish_record() -> Record {
    Record {
        source_ip: "255.255.255.254".to_string(),
        destination_ip: "1.1.1.1".to_string(),
        timestamp: "4000000000".to_string(),
        severity: Some("Medium".to_string()),
        attack_type: None,
        data_exfiltrated: Some("true".to_string()),
        user_agent: Some(USER_AGENTS[3].to_string()),
        response_action: Some("Quarantined".to_string()),
    }
}
