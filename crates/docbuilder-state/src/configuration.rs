//! Narrow typed interface over the untyped configuration bag (global
//! hashes, checksums, and other process-wide scalars).

use crate::store::Inner;
use docbuilder_core::error::{Error, Result};
use std::sync::Arc;

#[derive(Clone)]
pub struct Configuration {
    inner: Arc<Inner>,
}

/// Well-known configuration key for the global doc-files hash used by
/// the delta analyzer's skip decision.
pub const LAST_GLOBAL_DOC_FILES_HASH: &str = "last_global_doc_files_hash";

impl Configuration {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Configuration { inner }
    }

    pub fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let guard = self
            .inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        Ok(guard.configuration.get(key).cloned())
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(key)?
            .and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get(key)?.and_then(|v| v.as_bool()))
    }

    pub fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        guard.configuration.insert(key.to_string(), value);
        self.inner.maybe_save(&guard)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))?;
        guard.configuration.remove(key);
        self.inner.maybe_save(&guard)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StateStore;

    #[test]
    fn set_then_get_round_trips() {
        let store = StateStore::open_in_memory("0.1.0");
        let config = store.configuration();
        config
            .set(LAST_GLOBAL_DOC_FILES_HASH, serde_json::json!("abc123"))
            .unwrap();
        assert_eq!(
            config.get_string(LAST_GLOBAL_DOC_FILES_HASH).unwrap(),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn missing_key_returns_none() {
        let store = StateStore::open_in_memory("0.1.0");
        assert!(store.configuration().get("nope").unwrap().is_none());
    }
}
