use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::core::types::Alert;

/// Derived lookup structures over alert identities.
///
/// Rebuilt wholesale on every load. Membership is a hint only: an identity
/// listed here may have been evicted from the cache, and consumers must
/// treat such identities as absent.
#[derive(Debug, Default)]
pub struct AlertIndexes {
    /// agent id -> identities in ingestion order
    pub by_agent: HashMap<String, Vec<String>>,
    /// rule id -> identities in ingestion order
    pub by_rule: HashMap<String, Vec<String>>,
    /// (timestamp, identity), sorted ascending after a load completes
    pub by_time: Vec<(DateTime<Utc>, String)>,
}

impl AlertIndexes {
    pub fn new() -> Self {
        AlertIndexes::default()
    }

    pub fn clear(&mut self) {
        self.by_agent.clear();
        self.by_rule.clear();
        self.by_time.clear();
    }

    pub fn insert(&mut self, alert: &Alert) {
        self.by_agent
            .entry(alert.source.id.clone())
            .or_default()
            .push(alert.id.clone());
        self.by_rule
            .entry(alert.classification.id.clone())
            .or_default()
            .push(alert.id.clone());
        self.by_time.push((alert.timestamp, alert.id.clone()));
    }

    /// Restore the ascending time order after a newest-first load.
    pub fn sort_time_index(&mut self) {
        self.by_time.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pub fn len(&self) -> usize {
        self.by_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_time.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::core::types::{Classification, Source};

    fn alert(id: &str, agent: &str, rule: &str, hour: u32) -> Alert {
        Alert {
            id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            source: Source {
                id: agent.to_string(),
                name: agent.to_string(),
                ip: None,
            },
            classification: Classification {
                id: rule.to_string(),
                level: 3,
                description: String::new(),
                groups: Vec::new(),
                mitre: None,
                fired_count: None,
            },
            payload: None,
            location: None,
            full_log: None,
            decoder: None,
        }
    }

    #[test]
    fn insert_populates_all_three_indexes() {
        let mut indexes = AlertIndexes::new();
        indexes.insert(&alert("id1", "a1", "100", 1));
        indexes.insert(&alert("id2", "a1", "200", 2));

        assert_eq!(indexes.by_agent["a1"], vec!["id1", "id2"]);
        assert_eq!(indexes.by_rule["100"], vec!["id1"]);
        assert_eq!(indexes.len(), 2);
    }

    #[test]
    fn time_index_sorts_ascending() {
        let mut indexes = AlertIndexes::new();
        // Newest-first, as delivered by a reverse-mode load.
        indexes.insert(&alert("id3", "a1", "100", 3));
        indexes.insert(&alert("id2", "a1", "100", 2));
        indexes.insert(&alert("id1", "a1", "100", 1));
        indexes.sort_time_index();

        let ids: Vec<_> = indexes.by_time.iter().map(|(_, id)| id.as_str()).collect();
        assert_eq!(ids, vec!["id1", "id2", "id3"]);
    }

    #[test]
    fn clear_empties_everything() {
        let mut indexes = AlertIndexes::new();
        indexes.insert(&alert("id1", "a1", "100", 1));
        indexes.clear();
        assert!(indexes.is_empty());
        assert!(indexes.by_agent.is_empty());
        assert!(indexes.by_rule.is_empty());
    }
}
