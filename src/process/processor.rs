use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::core::types::{Alert, Classification, MitreInfo, Payload, RawAlert, Source};
use crate::process::enrich::Enricher;
use crate::process::normalize::FieldNormalizer;

const MAX_RULE_LEVEL: u8 = 15;

/// Converts raw records into normalized alerts.
///
/// Fault tolerant: a record that cannot be normalized is dropped, never an
/// error to the caller. Identities are deterministic over the aliased raw
/// content, which is what makes reloads of an unchanged file idempotent.
pub struct AlertProcessor {
    normalizer: FieldNormalizer,
    enrichers: Vec<Box<dyn Enricher>>,
    rejected: AtomicU64,
}

impl AlertProcessor {
    pub fn new() -> Self {
        AlertProcessor {
            normalizer: FieldNormalizer::new(),
            enrichers: Vec::new(),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn with_enricher(mut self, enricher: Box<dyn Enricher>) -> Self {
        info!(name = enricher.name(), "registered enricher");
        self.enrichers.push(enricher);
        self
    }

    /// Records dropped by validation since construction.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Normalize one raw record. Returns `None` when the record fails
    /// validation; the drop is counted, not raised.
    pub fn process(&self, raw: &RawAlert) -> Option<Alert> {
        let raw = self.normalizer.normalize(raw);

        let mut alert = Alert {
            id: alert_identity(&raw),
            timestamp: parse_timestamp(raw.get("timestamp").and_then(Value::as_str)),
            source: parse_source(raw.get("agent")),
            classification: parse_classification(raw.get("rule")),
            payload: parse_payload(raw.get("data")),
            location: opt_string(raw.get("location")),
            full_log: opt_string(raw.get("full_log")),
            decoder: raw.get("decoder").and_then(Value::as_object).cloned(),
        };

        for enricher in &self.enrichers {
            match enricher.enrich(&raw, alert.clone()) {
                Ok(enriched) => alert = enriched,
                Err(err) => {
                    warn!(name = enricher.name(), %err, "enricher failed, step skipped");
                }
            }
        }

        if let Err(reason) = validate(&alert) {
            warn!(reason, "invalid alert dropped");
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        Some(alert)
    }

    /// Process a batch, keeping accepted alerts in input order. Rejected
    /// records are omitted, never failing the batch.
    pub fn process_batch(&self, raws: &[RawAlert]) -> Vec<Alert> {
        raws.iter().filter_map(|raw| self.process(raw)).collect()
    }
}

impl Default for AlertProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic identity: `{compact-timestamp}_{10-hex digest}`.
///
/// The digest is xxh3 over the key-sorted serialization of the aliased raw
/// record (serde_json maps are BTree-backed, so serialization is already
/// canonical). Fast and stable, not a security hash.
fn alert_identity(raw: &RawAlert) -> String {
    let canonical = Value::Object(raw.clone()).to_string();
    let digest = format!("{:016x}", xxh3_64(canonical.as_bytes()));

    let ts = raw.get("timestamp").and_then(Value::as_str).unwrap_or("");
    let compact: String = ts.chars().filter(|c| *c != ':' && *c != '-').collect();

    format!("{compact}_{}", &digest[..10])
}

/// RFC 3339 with trailing `Z` accepted, converted to UTC. Unparsable or
/// absent timestamps fall back to ingestion time.
fn parse_timestamp(text: Option<&str>) -> DateTime<Utc> {
    let Some(text) = text else {
        return Utc::now();
    };
    match DateTime::parse_from_rfc3339(text) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            warn!(timestamp = text, "invalid timestamp, using ingestion time");
            Utc::now()
        }
    }
}

fn parse_source(value: Option<&Value>) -> Source {
    let obj = value.and_then(Value::as_object);
    Source {
        id: obj
            .and_then(|o| opt_string(o.get("id")))
            .unwrap_or_else(|| "unknown".to_string()),
        name: obj
            .and_then(|o| opt_string(o.get("name")))
            .unwrap_or_else(|| "unknown".to_string()),
        ip: obj.and_then(|o| opt_string(o.get("ip"))),
    }
}

fn parse_classification(value: Option<&Value>) -> Classification {
    let obj = value.and_then(Value::as_object);

    let level = match obj.and_then(|o| o.get("level")).and_then(Value::as_i64) {
        Some(n) if (0..=MAX_RULE_LEVEL as i64).contains(&n) => n as u8,
        // Out-of-range levels are preserved as invalid so validation drops
        // the record instead of silently clamping.
        Some(_) => u8::MAX,
        None => 0,
    };

    let mitre = obj.and_then(|o| o.get("mitre")).and_then(Value::as_object).map(|m| MitreInfo {
        id: string_list(m.get("id")),
        tactic: string_list(m.get("tactic")),
        technique: string_list(m.get("technique")),
    });

    Classification {
        id: obj
            .and_then(|o| opt_string(o.get("id")))
            .unwrap_or_else(|| "unknown".to_string()),
        level,
        description: obj
            .and_then(|o| opt_string(o.get("description")))
            .unwrap_or_default(),
        groups: obj.map(|o| string_list(o.get("groups"))).unwrap_or_default(),
        mitre,
        fired_count: obj.and_then(|o| o.get("firedtimes")).and_then(Value::as_u64),
    }
}

fn parse_payload(value: Option<&Value>) -> Option<Payload> {
    let data = value.and_then(Value::as_object)?;
    let win = data.get("win").and_then(Value::as_object);

    Some(Payload {
        src_ip: opt_string(data.get("srcip")),
        src_port: opt_string(data.get("srcport")),
        dst_ip: opt_string(data.get("dstip")),
        dst_port: opt_string(data.get("dstport")),
        dst_user: opt_string(data.get("dstuser")),
        src_user: opt_string(data.get("srcuser")),
        process_name: opt_string(data.get("process_name")),
        process_id: opt_string(data.get("process_id")),
        win_eventdata: win
            .and_then(|w| w.get("eventdata"))
            .and_then(Value::as_object)
            .cloned(),
        win_system: win
            .and_then(|w| w.get("system"))
            .and_then(Value::as_object)
            .cloned(),
        extra: Some(data.clone()),
    })
}

fn validate(alert: &Alert) -> std::result::Result<(), &'static str> {
    if alert.id.is_empty() {
        return Err("missing alert id");
    }
    if alert.source.id.is_empty() {
        return Err("missing agent id");
    }
    if alert.classification.id.is_empty() {
        return Err("missing rule id");
    }
    if alert.classification.level > MAX_RULE_LEVEL {
        return Err("severity level out of range");
    }
    Ok(())
}

/// String coercion for scalar fields that arrive as either text or numbers.
fn opt_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| opt_string(Some(v))).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{Error, ErrorKind, Result};

    fn raw(json: &str) -> RawAlert {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn identity_is_deterministic() {
        let processor = AlertProcessor::new();
        let record = raw(
            r#"{"timestamp":"2024-01-01T00:00:00Z","agent":{"id":"a1"},"rule":{"id":"100","level":3}}"#,
        );

        let first = processor.process(&record).unwrap();
        let second = processor.process(&record).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn identity_embeds_compact_timestamp() {
        let processor = AlertProcessor::new();
        let record = raw(
            r#"{"timestamp":"2024-01-01T00:30:00Z","agent":{"id":"a1"},"rule":{"id":"100","level":3}}"#,
        );
        let alert = processor.process(&record).unwrap();

        let (prefix, digest) = alert.id.split_once('_').unwrap();
        assert_eq!(prefix, "20240101T003000Z");
        assert_eq!(digest.len(), 10);
    }

    #[test]
    fn identity_differs_for_different_content() {
        let processor = AlertProcessor::new();
        let a = raw(r#"{"timestamp":"2024-01-01T00:00:00Z","agent":{"id":"a1"},"rule":{"id":"100","level":3}}"#);
        let b = raw(r#"{"timestamp":"2024-01-01T00:00:00Z","agent":{"id":"a2"},"rule":{"id":"100","level":3}}"#);

        let alert_a = processor.process(&a).unwrap();
        let alert_b = processor.process(&b).unwrap();
        assert_ne!(alert_a.id, alert_b.id);
    }

    #[test]
    fn aliased_fields_feed_identity_and_payload() {
        let processor = AlertProcessor::new();
        let aliased = raw(r#"{"agent":{"id":"a1"},"rule":{"id":"1","level":1},"data":{"source_ip":"10.0.0.1"}}"#);
        // Aliasing happens at the record root, not inside "data".
        let alert = processor.process(&aliased).unwrap();
        assert!(alert.payload.is_some());

        let rooted = raw(r#"{"agent":{"id":"a1"},"rule":{"id":"1","level":1},"source_ip":"10.0.0.1"}"#);
        let canonical = raw(r#"{"agent":{"id":"a1"},"rule":{"id":"1","level":1},"srcip":"10.0.0.1"}"#);
        let from_alias = processor.process(&rooted).unwrap();
        let from_canonical = processor.process(&canonical).unwrap();
        assert_eq!(from_alias.id, from_canonical.id);
    }

    #[test]
    fn unparsable_timestamp_falls_back_to_now() {
        let processor = AlertProcessor::new();
        let record = raw(r#"{"timestamp":"yesterday","agent":{"id":"a1"},"rule":{"id":"1","level":1}}"#);
        let before = Utc::now();
        let alert = processor.process(&record).unwrap();
        assert!(alert.timestamp >= before);
    }

    #[test]
    fn missing_agent_defaults_to_unknown() {
        let processor = AlertProcessor::new();
        let record = raw(r#"{"timestamp":"2024-01-01T00:00:00Z","rule":{"id":"1","level":1}}"#);
        let alert = processor.process(&record).unwrap();
        assert_eq!(alert.source.id, "unknown");
        assert_eq!(alert.source.name, "unknown");
    }

    #[test]
    fn out_of_range_level_is_rejected_and_counted() {
        let processor = AlertProcessor::new();
        let record = raw(r#"{"timestamp":"2024-01-01T00:00:00Z","agent":{"id":"a1"},"rule":{"id":"1","level":99}}"#);
        assert!(processor.process(&record).is_none());
        assert_eq!(processor.rejected_count(), 1);
    }

    #[test]
    fn empty_rule_id_is_rejected() {
        let processor = AlertProcessor::new();
        let record = raw(r#"{"timestamp":"2024-01-01T00:00:00Z","agent":{"id":"a1"},"rule":{"id":"","level":1}}"#);
        assert!(processor.process(&record).is_none());
    }

    #[test]
    fn mitre_mapping_is_parsed() {
        let processor = AlertProcessor::new();
        let record = raw(
            r#"{"timestamp":"2024-01-01T00:00:00Z","agent":{"id":"a1"},
                "rule":{"id":"1","level":7,"mitre":{"id":["T1110"],"tactic":["Credential Access"],"technique":["Brute Force"]}}}"#,
        );
        let alert = processor.process(&record).unwrap();
        let mitre = alert.classification.mitre.unwrap();
        assert_eq!(mitre.id, vec!["T1110"]);
        assert_eq!(mitre.technique, vec!["Brute Force"]);
    }

    struct TagEnricher;

    impl Enricher for TagEnricher {
        fn name(&self) -> &str {
            "tag"
        }

        fn enrich(&self, _raw: &RawAlert, mut alert: Alert) -> Result<Alert> {
            alert.location = Some("tagged".to_string());
            Ok(alert)
        }
    }

    struct FailingEnricher;

    impl Enricher for FailingEnricher {
        fn name(&self) -> &str {
            "failing"
        }

        fn enrich(&self, _raw: &RawAlert, _alert: Alert) -> Result<Alert> {
            Err(Error::new(ErrorKind::Internal, "boom".to_string()))
        }
    }

    #[test]
    fn failing_enricher_is_isolated() {
        let processor = AlertProcessor::new()
            .with_enricher(Box::new(FailingEnricher))
            .with_enricher(Box::new(TagEnricher));
        let record = raw(r#"{"timestamp":"2024-01-01T00:00:00Z","agent":{"id":"a1"},"rule":{"id":"1","level":1}}"#);

        // The failing step is skipped; the later step still runs.
        let alert = processor.process(&record).unwrap();
        assert_eq!(alert.location.as_deref(), Some("tagged"));
    }

    #[test]
    fn batch_keeps_input_order_and_drops_rejects() {
        let processor = AlertProcessor::new();
        let records = vec![
            raw(r#"{"timestamp":"2024-01-01T00:00:00Z","agent":{"id":"a1"},"rule":{"id":"1","level":1}}"#),
            raw(r#"{"timestamp":"2024-01-01T01:00:00Z","agent":{"id":"a2"},"rule":{"id":"2","level":99}}"#),
            raw(r#"{"timestamp":"2024-01-01T02:00:00Z","agent":{"id":"a3"},"rule":{"id":"3","level":3}}"#),
        ];
        let alerts = processor.process_batch(&records);

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].source.id, "a1");
        assert_eq!(alerts[1].source.id, "a3");
    }
}
