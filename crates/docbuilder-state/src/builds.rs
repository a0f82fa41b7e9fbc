//! Narrow typed interface over persisted `Build` rows.

use crate::models::{Build, BuildStatus};
use crate::store::Inner;
use chrono::Utc;
use docbuilder_core::error::{Error, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct Builds {
    inner: Arc<Inner>,
}

impl Builds {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Builds { inner }
    }

    pub fn get(&self, id: &str) -> Result<Option<Build>> {
        let guard = self
            .inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        Ok(guard.builds.get(id).cloned())
    }

    pub fn list(&self) -> Result<Vec<Build>> {
        let guard = self
            .inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        Ok(guard.builds.values().cloned().collect())
    }

    /// Create a new build entry. A build row is created when execution
    /// starts.
    pub fn create(&self, build: Build) -> Result<Build> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        guard.builds.insert(build.id.clone(), build.clone());
        self.inner.maybe_save(&guard)?;
        Ok(build)
    }

    /// Transition a build's status. Fails with `validation` if the
    /// build is already in a terminal status (terminal statuses are
    /// irreversible).
    pub fn update_status(
        &self,
        id: &str,
        status: BuildStatus,
        error_msg: Option<String>,
    ) -> Result<Build> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        let build = guard
            .builds
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("build not found: {id}")))?;
        if build.status.is_terminal() {
            return Err(Error::validation(format!(
                "build {id} is already terminal ({:?}), cannot transition to {:?}",
                build.status, status
            )));
        }
        build.status = status;
        if status.is_terminal() {
            let now = Utc::now();
            build.end_time = Some(now);
            build.duration = Some((now - build.start_time).to_std().unwrap_or_default());
        }
        if let Some(msg) = error_msg {
            build.error_msg = Some(msg);
        }
        build.updated_at = Utc::now();
        let result = build.clone();
        self.inner.maybe_save(&guard)?;
        Ok(result)
    }

    /// Keep the N newest builds (by `created_at`), deleting the rest
    /// atomically. Idempotent once the count is already `<= max_builds`.
    pub fn cleanup(&self, max_builds: usize) -> Result<usize> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;

        if guard.builds.len() <= max_builds {
            return Ok(0);
        }

        let mut sorted: Vec<(String, chrono::DateTime<Utc>)> = guard
            .builds
            .iter()
            .map(|(id, b)| (id.clone(), b.created_at))
            .collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));

        let to_remove: Vec<String> = sorted.into_iter().skip(max_builds).map(|(id, _)| id).collect();
        let removed = to_remove.len();
        for id in to_remove {
            guard.builds.remove(&id);
        }
        self.inner.maybe_save(&guard)?;
        Ok(removed)
    }
}
