use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw log line, parsed but not yet normalized. No schema is guaranteed.
pub type RawAlert = Map<String, Value>;

/// The endpoint that emitted an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub ip: Option<String>,
}

/// MITRE ATT&CK mapping attached to a rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MitreInfo {
    #[serde(default)]
    pub id: Vec<String>,
    #[serde(default)]
    pub tactic: Vec<String>,
    #[serde(default)]
    pub technique: Vec<String>,
}

/// The detection rule that matched, with its severity level (0-15).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub id: String,
    pub level: u8,
    pub description: String,
    pub groups: Vec<String>,
    pub mitre: Option<MitreInfo>,
    pub fired_count: Option<u64>,
}

/// Common network/process fields extracted from the alert's data section.
/// Anything unmapped stays available through `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Payload {
    pub src_ip: Option<String>,
    pub src_port: Option<String>,
    pub dst_ip: Option<String>,
    pub dst_port: Option<String>,
    pub dst_user: Option<String>,
    pub src_user: Option<String>,
    pub process_name: Option<String>,
    pub process_id: Option<String>,
    pub win_eventdata: Option<Map<String, Value>>,
    pub win_system: Option<Map<String, Value>>,
    pub extra: Option<Map<String, Value>>,
}

/// A normalized security alert with a deterministic, content-derived identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub source: Source,
    pub classification: Classification,
    pub payload: Option<Payload>,
    pub location: Option<String>,
    pub full_log: Option<String>,
    pub decoder: Option<Map<String, Value>>,
}

/// Coarse severity band derived from the rule level. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    pub fn from_rule_level(level: u8) -> Self {
        match level {
            0..=4 => SeverityLevel::Low,
            5..=9 => SeverityLevel::Medium,
            10..=12 => SeverityLevel::High,
            _ => SeverityLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Low => "low",
            SeverityLevel::Medium => "medium",
            SeverityLevel::High => "high",
            SeverityLevel::Critical => "critical",
        }
    }
}
