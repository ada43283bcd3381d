use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;

use crate::core::types::SeverityLevel;
use crate::store::store::AlertStore;

/// Per-band alert counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

impl SeverityCounts {
    pub fn record(&mut self, band: SeverityLevel) {
        match band {
            SeverityLevel::Low => self.low += 1,
            SeverityLevel::Medium => self.medium += 1,
            SeverityLevel::High => self.high += 1,
            SeverityLevel::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.low + self.medium + self.high + self.critical
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentMetric {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_ip: Option<String>,
    pub alert_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleCount {
    pub rule_id: String,
    pub count: u64,
}

/// One timeline bucket: `[timestamp, timestamp + interval)`.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineBucket {
    pub timestamp: DateTime<Utc>,
    pub total: u64,
    pub severity: SeverityCounts,
    pub top_rules: Vec<RuleCount>,
}

const TOP_RULES_PER_BUCKET: usize = 3;

/// Recognized timeline intervals. Anything else falls back to one hour.
pub fn parse_interval(interval: &str) -> Duration {
    match interval {
        "1m" => Duration::minutes(1),
        "5m" => Duration::minutes(5),
        "15m" => Duration::minutes(15),
        "1h" => Duration::hours(1),
        "6h" => Duration::hours(6),
        "1d" => Duration::days(1),
        other => {
            warn!(interval = other, "unrecognized timeline interval, using 1h");
            Duration::hours(1)
        }
    }
}

impl AlertStore {
    /// Count alerts per severity band, linear scan over the time index.
    pub fn severity_distribution(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> SeverityCounts {
        let indexes = self.indexes().read();
        let mut counts = SeverityCounts::default();

        for (_, id) in &indexes.by_time {
            let Some(alert) = self.cache().get(id) else {
                continue;
            };
            if !in_window(alert.timestamp, start, end) {
                continue;
            }
            counts.record(SeverityLevel::from_rule_level(alert.classification.level));
        }

        counts
    }

    /// Top agents by alert count within an optional window.
    pub fn agent_metrics(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        top_n: usize,
    ) -> Vec<AgentMetric> {
        let indexes = self.indexes().read();
        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut info: HashMap<String, (String, Option<String>)> = HashMap::new();

        for (_, id) in &indexes.by_time {
            let Some(alert) = self.cache().get(id) else {
                continue;
            };
            if !in_window(alert.timestamp, start, end) {
                continue;
            }
            *counts.entry(alert.source.id.clone()).or_default() += 1;
            info.insert(
                alert.source.id.clone(),
                (alert.source.name.clone(), alert.source.ip.clone()),
            );
        }

        let mut ranked: Vec<AgentMetric> = counts
            .into_iter()
            .map(|(agent_id, alert_count)| {
                let (agent_name, agent_ip) = info.remove(&agent_id).unwrap_or_default();
                AgentMetric {
                    agent_id,
                    agent_name,
                    agent_ip,
                    alert_count,
                }
            })
            .collect();

        // Count descending, agent id ascending for a stable ranking.
        ranked.sort_by(|a, b| {
            b.alert_count
                .cmp(&a.alert_count)
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        });
        ranked.truncate(top_n);
        ranked
    }

    /// Time-bucketed histogram. Bucket boundaries are `start + k * interval`
    /// for the smallest k placing each timestamp in its bucket.
    pub fn timeline(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        interval: &str,
    ) -> Vec<TimelineBucket> {
        let indexes = self.indexes().read();
        if indexes.by_time.is_empty() {
            return Vec::new();
        }

        let bucket_width = parse_interval(interval);
        let bucket_secs = bucket_width.num_seconds().max(1);

        let start = start.unwrap_or(indexes.by_time[0].0);
        let end = end.unwrap_or(indexes.by_time[indexes.by_time.len() - 1].0);

        struct Accum {
            total: u64,
            severity: SeverityCounts,
            rules: HashMap<String, u64>,
        }

        let mut buckets: BTreeMap<DateTime<Utc>, Accum> = BTreeMap::new();

        for (_, id) in &indexes.by_time {
            let Some(alert) = self.cache().get(id) else {
                continue;
            };
            if alert.timestamp < start || alert.timestamp > end {
                continue;
            }

            let offset_secs = (alert.timestamp - start).num_seconds();
            let k = offset_secs.div_euclid(bucket_secs);
            let bucket_time = start + Duration::seconds(k * bucket_secs);

            let accum = buckets.entry(bucket_time).or_insert_with(|| Accum {
                total: 0,
                severity: SeverityCounts::default(),
                rules: HashMap::new(),
            });
            accum.total += 1;
            accum
                .severity
                .record(SeverityLevel::from_rule_level(alert.classification.level));
            *accum.rules.entry(alert.classification.id.clone()).or_default() += 1;
        }

        buckets
            .into_iter()
            .map(|(timestamp, accum)| {
                let mut rules: Vec<RuleCount> = accum
                    .rules
                    .into_iter()
                    .map(|(rule_id, count)| RuleCount { rule_id, count })
                    .collect();
                rules.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rule_id.cmp(&b.rule_id)));
                rules.truncate(TOP_RULES_PER_BUCKET);

                TimelineBucket {
                    timestamp,
                    total: accum.total,
                    severity: accum.severity,
                    top_rules: rules,
                }
            })
            .collect()
    }
}

fn in_window(ts: DateTime<Utc>, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
    if let Some(start) = start {
        if ts < start {
            return false;
        }
    }
    if let Some(end) = end {
        if ts > end {
            return false;
        }
    }
    true
}
