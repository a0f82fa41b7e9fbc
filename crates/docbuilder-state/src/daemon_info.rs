//! Narrow typed interface over the daemon's own status record.

use crate::models::{DaemonInfo, DaemonStatus};
use crate::store::Inner;
use chrono::Utc;
use docbuilder_core::error::{Error, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct DaemonInfoStore {
    inner: Arc<Inner>,
}

impl DaemonInfoStore {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        DaemonInfoStore { inner }
    }

    pub fn get(&self) -> Result<DaemonInfo> {
        let guard = self
            .inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        Ok(guard.daemon_info())
    }

    /// Transition the daemon's status:
    /// `starting -> running -> stopping -> stopped`, or `unhealthy` on
    /// store failure from any state.
    pub fn set_status(&self, status: DaemonStatus) -> Result<DaemonInfo> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        guard.status = status;
        guard.last_update = Utc::now();
        let result = guard.daemon_info();
        self.inner.maybe_save(&guard)?;
        Ok(result)
    }
}
