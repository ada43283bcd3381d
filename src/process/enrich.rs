use crate::core::error::Result;
use crate::core::types::{Alert, RawAlert};

/// A pluggable transformation step run after parsing and before validation.
///
/// Steps receive the aliased raw record and the in-progress alert, and
/// return a possibly modified alert. A failing step is skipped with a
/// warning; it never aborts the record or the batch.
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;

    fn enrich(&self, raw: &RawAlert, alert: Alert) -> Result<Alert>;
}
