use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{error, info};

use crate::cache::alert_cache::{AlertCache, CacheStats};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::Alert;
use crate::process::processor::AlertProcessor;
use crate::query::field_path::{as_search_text, lookup};
use crate::query::filter::FilterParams;
use crate::reader::log_file::{LogFile, ReadOptions};
use crate::store::indexes::AlertIndexes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Empty,
    Loading,
    Ready,
}

/// In-memory indexed store over the alert log.
///
/// Owns the cache, the processor, and the derived indexes. Loads are
/// serialized through the index write lock; queries run concurrently on
/// the read side and never mutate shared state. The cache is the source
/// of truth: every index candidate is re-validated against it.
pub struct AlertStore {
    log: LogFile,
    processor: AlertProcessor,
    cache: AlertCache,
    indexes: RwLock<AlertIndexes>,
    state: RwLock<StoreState>,
}

impl AlertStore {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_processor(config, AlertProcessor::new())
    }

    /// Construct with a processor carrying custom enrichment steps.
    pub fn with_processor(config: &Config, processor: AlertProcessor) -> Result<Self> {
        let log = LogFile::open(&config.alerts_path)?.with_chunk_size(config.chunk_size);
        let cache = AlertCache::new(config.cache_capacity)?;

        info!(path = %config.alerts_path.display(), capacity = config.cache_capacity, "alert store initialized");

        Ok(AlertStore {
            log,
            processor,
            cache,
            indexes: RwLock::new(AlertIndexes::new()),
            state: RwLock::new(StoreState::Empty),
        })
    }

    pub fn state(&self) -> StoreState {
        *self.state.read()
    }

    /// Clear all state and re-stream the log newest-first, bounded by
    /// `now - window`. Returns the number of accepted records.
    ///
    /// A missing file counts as zero alerts and leaves the store ready;
    /// any other I/O failure clears the partial state and propagates.
    pub fn load(&self, window: Duration) -> Result<usize> {
        let mut indexes = self.indexes.write();
        *self.state.write() = StoreState::Loading;
        indexes.clear();
        self.cache.clear();

        let start = Utc::now() - window;
        let options = ReadOptions {
            start: Some(start),
            end: None,
            max: None,
        };

        let reader = match self.log.reverse(options) {
            Ok(reader) => reader,
            Err(err) if err.is_not_found() => {
                error!(%err, "alert log missing at load time, store stays empty");
                *self.state.write() = StoreState::Ready;
                return Ok(0);
            }
            Err(err) => {
                *self.state.write() = StoreState::Ready;
                return Err(err);
            }
        };

        let mut loaded = 0usize;
        let mut failed = 0usize;

        for record in reader {
            let raw = match record {
                Ok(raw) => raw,
                Err(err) => {
                    // Mid-stream I/O failure: drop the partial rebuild so
                    // index invariants hold, then propagate.
                    indexes.clear();
                    self.cache.clear();
                    *self.state.write() = StoreState::Ready;
                    return Err(err);
                }
            };
            match self.processor.process(&raw) {
                Some(alert) => {
                    indexes.insert(&alert);
                    self.cache.put(alert.id.clone(), alert);
                    loaded += 1;
                }
                None => failed += 1,
            }
        }

        // Reverse delivery is newest-first; restore ascending order.
        indexes.sort_time_index();
        *self.state.write() = StoreState::Ready;

        info!(loaded, failed, cache_size = self.cache.size(), "alert load complete");
        Ok(loaded)
    }

    pub fn get_by_id(&self, id: &str) -> Option<Alert> {
        self.cache.get(id)
    }

    /// Filtered, newest-first, paginated listing. The returned total is
    /// the size of the full filtered set, not the page.
    pub fn list(
        &self,
        filters: Option<&FilterParams>,
        limit: usize,
        offset: usize,
    ) -> (Vec<Alert>, usize) {
        let indexes = self.indexes.read();
        let ids = self.filtered_ids(&indexes, filters);
        let total = ids.len();

        let page = ids
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| self.cache.get(&id))
            .collect();

        (page, total)
    }

    /// Case-insensitive substring search over dotted-path fields,
    /// scanning the time index newest-first. Not index-accelerated.
    pub fn search(
        &self,
        query: &str,
        fields: &[String],
        filters: Option<&FilterParams>,
        limit: usize,
        offset: usize,
    ) -> (Vec<Alert>, usize) {
        let needle = query.to_lowercase();
        let indexes = self.indexes.read();

        let mut matched: Vec<String> = Vec::new();
        for (_, id) in indexes.by_time.iter().rev() {
            let Some(alert) = self.cache.get(id) else {
                continue;
            };
            if !matches_query(&alert, &needle, fields) {
                continue;
            }
            if let Some(filters) = filters {
                if !filters.matches(&alert) {
                    continue;
                }
            }
            matched.push(id.clone());
        }

        let total = matched.len();
        let page = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| self.cache.get(&id))
            .collect();

        (page, total)
    }

    /// Candidate identities for `list`: index intersection where the agent
    /// or rule filter allows it, otherwise the whole time index, always
    /// re-validated against the cache and sorted newest-first.
    fn filtered_ids(&self, indexes: &AlertIndexes, filters: Option<&FilterParams>) -> Vec<String> {
        let Some(filters) = filters else {
            return indexes
                .by_time
                .iter()
                .rev()
                .filter(|(_, id)| self.cache.contains(id))
                .map(|(_, id)| id.clone())
                .collect();
        };

        let mut candidates: Option<HashSet<String>> = None;

        if let Some(agent_id) = &filters.agent_id {
            let ids: HashSet<String> = indexes
                .by_agent
                .get(agent_id)
                .map(|v| v.iter().cloned().collect())
                .unwrap_or_default();
            candidates = Some(ids);
        }
        if let Some(rule_id) = &filters.rule_id {
            let ids: HashSet<String> = indexes
                .by_rule
                .get(rule_id)
                .map(|v| v.iter().cloned().collect())
                .unwrap_or_default();
            candidates = Some(match candidates {
                Some(existing) => existing.intersection(&ids).cloned().collect(),
                None => ids,
            });
        }

        let candidates = candidates
            .unwrap_or_else(|| indexes.by_time.iter().map(|(_, id)| id.clone()).collect());

        let mut survivors: Vec<(DateTime<Utc>, String)> = candidates
            .into_iter()
            .filter_map(|id| self.cache.get(&id).map(|alert| (alert, id)))
            .filter(|(alert, _)| filters.matches(alert))
            .map(|(alert, id)| (alert.timestamp, id))
            .collect();

        survivors.sort_by(|a, b| b.0.cmp(&a.0));
        survivors.into_iter().map(|(_, id)| id).collect()
    }

    pub fn rejected_count(&self) -> u64 {
        self.processor.rejected_count()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_size(&self) -> usize {
        self.cache.size()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub(crate) fn cache(&self) -> &AlertCache {
        &self.cache
    }

    pub(crate) fn indexes(&self) -> &RwLock<AlertIndexes> {
        &self.indexes
    }
}

fn matches_query(alert: &Alert, needle: &str, fields: &[String]) -> bool {
    let Ok(doc) = serde_json::to_value(alert) else {
        return false;
    };
    fields.iter().any(|field| {
        lookup(&doc, field)
            .map(|value| as_search_text(value).to_lowercase().contains(needle))
            .unwrap_or(false)
    })
}
