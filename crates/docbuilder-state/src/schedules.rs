//! Narrow typed interface over persisted `Schedule` rows.

use crate::models::Schedule;
use crate::store::Inner;
use chrono::Utc;
use docbuilder_core::error::{Error, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct Schedules {
    inner: Arc<Inner>,
}

impl Schedules {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Schedules { inner }
    }

    pub fn get(&self, id: &str) -> Result<Option<Schedule>> {
        let guard = self
            .inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        Ok(guard.schedules.get(id).cloned())
    }

    pub fn list(&self) -> Result<Vec<Schedule>> {
        let guard = self
            .inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        Ok(guard.schedules.values().cloned().collect())
    }

    pub fn create(&self, schedule: Schedule) -> Result<Schedule> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        guard
            .schedules
            .insert(schedule.id.clone(), schedule.clone());
        self.inner.maybe_save(&guard)?;
        Ok(schedule)
    }

    pub fn record_run(&self, id: &str, ok: bool, next_run: Option<chrono::DateTime<Utc>>) -> Result<Schedule> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        let schedule = guard
            .schedules
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("schedule not found: {id}")))?;
        schedule.run_count += 1;
        if !ok {
            schedule.failure_count += 1;
        }
        schedule.last_run = Some(Utc::now());
        schedule.next_run = next_run;
        schedule.updated_at = Utc::now();
        let result = schedule.clone();
        self.inner.maybe_save(&guard)?;
        Ok(result)
    }

    pub fn set_active(&self, id: &str, active: bool) -> Result<Schedule> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        let schedule = guard
            .schedules
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("schedule not found: {id}")))?;
        schedule.is_active = active;
        schedule.updated_at = Utc::now();
        let result = schedule.clone();
        self.inner.maybe_save(&guard)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleTrigger;
    use crate::store::StateStore;

    fn schedule(id: &str) -> Schedule {
        let now = Utc::now();
        Schedule {
            id: id.to_string(),
            name: "nightly".into(),
            trigger: ScheduleTrigger::Cron("0 0 * * *".into()),
            is_active: true,
            last_run: None,
            next_run: None,
            run_count: 0,
            failure_count: 0,
            config: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn record_run_increments_counters() {
        let store = StateStore::open_in_memory("0.1.0");
        store.schedules().create(schedule("s1")).unwrap();
        let updated = store.schedules().record_run("s1", false, None).unwrap();
        assert_eq!(updated.run_count, 1);
        assert_eq!(updated.failure_count, 1);
        assert!(updated.last_run.is_some());
    }

    #[test]
    fn set_active_toggles_flag() {
        let store = StateStore::open_in_memory("0.1.0");
        store.schedules().create(schedule("s1")).unwrap();
        let updated = store.schedules().set_active("s1", false).unwrap();
        assert!(!updated.is_active);
    }
}
