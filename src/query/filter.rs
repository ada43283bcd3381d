use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::Alert;

/// Structured query filters. All fields are optional; an empty filter
/// matches every alert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterParams {
    pub severity_min: Option<u8>,
    pub severity_max: Option<u8>,
    pub agent_id: Option<String>,
    pub agent_name: Option<String>,
    pub rule_id: Option<String>,
    pub rule_group: Option<String>,
    pub mitre_technique: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl FilterParams {
    pub fn matches(&self, alert: &Alert) -> bool {
        let level = alert.classification.level;
        if let Some(min) = self.severity_min {
            if level < min {
                return false;
            }
        }
        if let Some(max) = self.severity_max {
            if level > max {
                return false;
            }
        }

        if let Some(agent_id) = &self.agent_id {
            if alert.source.id != *agent_id {
                return false;
            }
        }
        if let Some(agent_name) = &self.agent_name {
            if alert.source.name != *agent_name {
                return false;
            }
        }

        if let Some(rule_id) = &self.rule_id {
            if alert.classification.id != *rule_id {
                return false;
            }
        }
        if let Some(group) = &self.rule_group {
            if !alert.classification.groups.contains(group) {
                return false;
            }
        }

        if let Some(technique) = &self.mitre_technique {
            match &alert.classification.mitre {
                Some(mitre) if mitre.id.contains(technique) => {}
                _ => return false,
            }
        }

        if let Some(start) = self.start_time {
            if alert.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if alert.timestamp > end {
                return false;
            }
        }

        true
    }
}
