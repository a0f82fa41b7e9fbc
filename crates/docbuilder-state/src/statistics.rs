//! Narrow typed interface over the aggregate `Statistics` counters.

use crate::models::Statistics;
use crate::store::Inner;
use chrono::Utc;
use docbuilder_core::error::{Error, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct StatisticsStore {
    inner: Arc<Inner>,
}

impl StatisticsStore {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        StatisticsStore { inner }
    }

    pub fn get(&self) -> Result<Statistics> {
        let guard = self
            .inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        Ok(guard.statistics.clone())
    }

    /// Fold a completed build's outcome into the running average.
    /// Skipped builds do not count (they never reach this call).
    pub fn record_build(&self, success: bool, duration_ms: u64) -> Result<Statistics> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        guard.statistics.record_build(success, duration_ms);
        let result = guard.statistics.clone();
        self.inner.maybe_save(&guard)?;
        Ok(result)
    }

    pub fn record_discovery(&self, documents_found: u64) -> Result<Statistics> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        guard.statistics.total_discoveries += 1;
        guard.statistics.documents_found += documents_found;
        guard.statistics.last_updated = Utc::now();
        let result = guard.statistics.clone();
        self.inner.maybe_save(&guard)?;
        Ok(result)
    }

    pub fn reset(&self) -> Result<Statistics> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        guard.statistics = Statistics {
            last_stat_reset: Utc::now(),
            ..Statistics::default()
        };
        let result = guard.statistics.clone();
        self.inner.maybe_save(&guard)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StateStore;

    #[test]
    fn record_build_updates_totals() {
        let store = StateStore::open_in_memory("0.1.0");
        let stats = store.statistics();
        stats.record_build(true, 100).unwrap();
        stats.record_build(true, 200).unwrap();
        let s = stats.get().unwrap();
        assert_eq!(s.total_builds, 2);
        assert_eq!(s.successful_builds, 2);
    }

    #[test]
    fn reset_clears_counters_but_stamps_reset_time() {
        let store = StateStore::open_in_memory("0.1.0");
        let stats = store.statistics();
        stats.record_build(true, 100).unwrap();
        let reset = stats.reset().unwrap();
        assert_eq!(reset.total_builds, 0);
    }
}
