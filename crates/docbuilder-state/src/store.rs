//! The composite state store: one shared `RwLock<Snapshot>`, a set of
//! narrow sub-store accessors, and a cooperative transaction boundary.

use crate::snapshot::Snapshot;
use docbuilder_core::error::{Error, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

pub(crate) struct Inner {
    pub(crate) snapshot: RwLock<Snapshot>,
    pub(crate) path: PathBuf,
    pub(crate) auto_save: bool,
    in_transaction: AtomicBool,
}

impl Inner {
    /// Persist the current snapshot to disk if auto-save is enabled.
    /// Called while still holding the write lock, per the single
    /// reader-writer-lock-per-store-instance contract.
    pub(crate) fn maybe_save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.auto_save {
            snapshot.save(&self.path)?;
        }
        Ok(())
    }
}

/// Composite persistent state store. Cheaply `Clone`-able — every
/// clone shares the same underlying lock and snapshot.
#[derive(Clone)]
pub struct StateStore {
    pub(crate) inner: Arc<Inner>,
}

impl StateStore {
    /// Open (or create) the state store backed by the JSON snapshot at
    /// `path`.
    pub fn open(path: impl Into<PathBuf>, daemon_version: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let snapshot = Snapshot::load(&path)?.unwrap_or_else(|| Snapshot::empty(daemon_version));
        Ok(StateStore {
            inner: Arc::new(Inner {
                snapshot: RwLock::new(snapshot),
                path,
                auto_save: true,
                in_transaction: AtomicBool::new(false),
            }),
        })
    }

    /// Open an in-memory-only store (auto-save disabled) for tests.
    pub fn open_in_memory(daemon_version: impl Into<String>) -> Self {
        StateStore {
            inner: Arc::new(Inner {
                snapshot: RwLock::new(Snapshot::empty(daemon_version)),
                path: PathBuf::new(),
                auto_save: false,
                in_transaction: AtomicBool::new(false),
            }),
        }
    }

    pub fn repositories(&self) -> crate::repositories::Repositories {
        crate::repositories::Repositories::new(self.inner.clone())
    }

    pub fn builds(&self) -> crate::builds::Builds {
        crate::builds::Builds::new(self.inner.clone())
    }

    pub fn schedules(&self) -> crate::schedules::Schedules {
        crate::schedules::Schedules::new(self.inner.clone())
    }

    pub fn statistics(&self) -> crate::statistics::StatisticsStore {
        crate::statistics::StatisticsStore::new(self.inner.clone())
    }

    pub fn configuration(&self) -> crate::configuration::Configuration {
        crate::configuration::Configuration::new(self.inner.clone())
    }

    pub fn daemon_info(&self) -> crate::daemon_info::DaemonInfoStore {
        crate::daemon_info::DaemonInfoStore::new(self.inner.clone())
    }

    /// Take the write lock, invoke `f` with a mutable view of the
    /// whole snapshot, and on `Ok` perform a single post-commit save.
    /// On `Err`, the snapshot is restored to its pre-transaction state
    /// (this store's chosen resolution of the "transactional boundary
    /// vs. lock" design question — see DESIGN.md). Nested
    /// transactions fail with `internal`.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> Result<T>,
    {
        if self
            .inner
            .in_transaction
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::internal("nested transactions are forbidden"));
        }

        let result = (|| {
            let mut guard = self
                .inner
                .snapshot
                .write()
                .map_err(|_| Error::internal("state store lock poisoned"))?;
            let backup = guard.clone();
            match f(&mut guard) {
                Ok(value) => {
                    self.inner.maybe_save(&guard)?;
                    Ok(value)
                }
                Err(e) => {
                    *guard = backup;
                    Err(e)
                }
            }
        })();

        self.inner.in_transaction.store(false, Ordering::SeqCst);
        result
    }

    /// Health check: confirm the lock is acquirable and the snapshot
    /// is in memory.
    pub fn health(&self) -> Result<()> {
        self.inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        Ok(())
    }

    /// Flush a final save and release resources. Safe to call more
    /// than once.
    pub fn close(&self) -> Result<()> {
        let guard = self
            .inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        self.inner.maybe_save(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_transactions_are_rejected() {
        let store = StateStore::open_in_memory("0.1.0");
        let result = store.with_transaction(|_snap| {
            let inner = store.with_transaction(|_| Ok(()));
            assert!(inner.is_err());
            Ok(())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn transaction_error_restores_prior_snapshot() {
        let store = StateStore::open_in_memory("0.1.0");
        store
            .configuration()
            .set("k", serde_json::json!("v1"))
            .unwrap();

        let result: Result<()> = store.with_transaction(|snap| {
            snap.configuration
                .insert("k".to_string(), serde_json::json!("v2"));
            Err(Error::internal("boom"))
        });
        assert!(result.is_err());

        let value = store.configuration().get("k").unwrap();
        assert_eq!(value, Some(serde_json::json!("v1")));
    }

    #[test]
    fn transaction_success_persists_mutations() {
        let store = StateStore::open_in_memory("0.1.0");
        store
            .with_transaction(|snap| {
                snap.configuration
                    .insert("k".to_string(), serde_json::json!(42));
                Ok(())
            })
            .unwrap();
        assert_eq!(
            store.configuration().get("k").unwrap(),
            Some(serde_json::json!(42))
        );
    }

    #[test]
    fn health_reports_ok_on_fresh_store() {
        let store = StateStore::open_in_memory("0.1.0");
        assert!(store.health().is_ok());
    }
}
