//! Narrow typed interface over persisted `Repository` rows.

use crate::models::Repository;
use crate::store::Inner;
use chrono::Utc;
use docbuilder_core::error::{Error, Result};
use std::sync::Arc;

/// Handle to the repositories sub-store. Cheap to clone; shares the
/// parent `StateStore`'s lock.
#[derive(Clone)]
pub struct Repositories {
    inner: Arc<Inner>,
}

impl Repositories {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Repositories { inner }
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, crate::snapshot::Snapshot>> {
        self.inner
            .snapshot
            .read()
            .map_err(|_| Error::internal("state store lock poisoned"))
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, crate::snapshot::Snapshot>> {
        self.inner
            .snapshot
            .write()
            .map_err(|_| Error::internal("state store lock poisoned"))
    }

    /// Not-found reads return `Ok(None)`, never an error.
    pub fn get(&self, url: &str) -> Result<Option<Repository>> {
        Ok(self.read_lock()?.repositories.get(url).cloned())
    }

    pub fn list(&self) -> Result<Vec<Repository>> {
        Ok(self.read_lock()?.repositories.values().cloned().collect())
    }

    /// Ensure a repository entry exists for `url`, creating a default
    /// one (derived name, `branch=main`) if absent. Idempotent after
    /// the first call.
    pub fn ensure(&self, url: &str) -> Result<Repository> {
        let mut guard = self.write_lock()?;
        let repo = guard
            .repositories
            .entry(url.to_string())
            .or_insert_with(|| Repository::new(url, None, None))
            .clone();
        self.inner.maybe_save(&guard)?;
        Ok(repo)
    }

    /// Increment build/error counters after a build attempt. Ensures
    /// the repository exists first (counter operations never fail on
    /// an unknown URL).
    pub fn increment_build_count(&self, url: &str, ok: bool) -> Result<Repository> {
        let mut guard = self.write_lock()?;
        let repo = guard
            .repositories
            .entry(url.to_string())
            .or_insert_with(|| Repository::new(url, None, None));
        repo.build_count += 1;
        if !ok {
            repo.error_count += 1;
        }
        repo.last_build = Some(Utc::now());
        repo.updated_at = Utc::now();
        let result = repo.clone();
        self.inner.maybe_save(&guard)?;
        Ok(result)
    }

    /// Explicit setters require the repository to already exist, so
    /// misspelled URLs surface early as `not_found`.
    pub fn set_commit(&self, url: &str, commit: impl Into<String>) -> Result<Repository> {
        self.mutate_existing(url, |repo| repo.last_commit = Some(commit.into()))
    }

    pub fn set_doc_files_hash(&self, url: &str, hash: impl Into<String>) -> Result<Repository> {
        self.mutate_existing(url, |repo| repo.doc_files_hash = Some(hash.into()))
    }

    pub fn set_doc_file_paths(&self, url: &str, mut paths: Vec<String>) -> Result<Repository> {
        paths.sort();
        paths.dedup();
        self.mutate_existing(url, |repo| {
            repo.document_count = paths.len() as u64;
            repo.doc_file_paths = paths.clone();
        })
    }

    pub fn set_last_discovery(&self, url: &str) -> Result<Repository> {
        self.mutate_existing(url, |repo| repo.last_discovery = Some(Utc::now()))
    }

    pub fn set_last_error(&self, url: &str, message: impl Into<String>) -> Result<Repository> {
        self.mutate_existing(url, |repo| repo.last_error = Some(message.into()))
    }

    fn mutate_existing(&self, url: &str, f: impl FnOnce(&mut Repository)) -> Result<Repository> {
        let mut guard = self.write_lock()?;
        let repo = guard
            .repositories
            .get_mut(url)
            .ok_or_else(|| Error::not_found(format!("repository not found: {url}")))?;
        f(repo);
        repo.updated_at = Utc::now();
        let result = repo.clone();
        self.inner.maybe_save(&guard)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StateStore;

    #[test]
    fn ensure_is_idempotent_after_first_call() {
        let store = StateStore::open_in_memory("0.1.0");
        let repos = store.repositories();
        let first = repos.ensure("https://example.com/a.git").unwrap();
        let second = repos.ensure("https://example.com/a.git").unwrap();
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(repos.list().unwrap().len(), 1);
    }

    #[test]
    fn explicit_setter_on_unknown_url_is_not_found() {
        let store = StateStore::open_in_memory("0.1.0");
        let result = store.repositories().set_commit("https://unknown", "abc123");
        assert!(matches!(
            result,
            Err(e) if e.category == docbuilder_core::error::ErrorCategory::NotFound
        ));
    }

    #[test]
    fn increment_build_count_updates_counters_and_timestamp() {
        let store = StateStore::open_in_memory("0.1.0");
        let repos = store.repositories();
        repos.ensure("https://x/y.git").unwrap();
        let before = repos.get("https://x/y.git").unwrap().unwrap();

        let after = repos.increment_build_count("https://x/y.git", false).unwrap();
        assert_eq!(after.build_count, 1);
        assert_eq!(after.error_count, 1);
        assert!(after.updated_at >= before.updated_at);

        let after_ok = repos.increment_build_count("https://x/y.git", true).unwrap();
        assert_eq!(after_ok.build_count, 2);
        assert_eq!(after_ok.error_count, 1);
    }

    #[test]
    fn set_doc_file_paths_sorts_and_dedups() {
        let store = StateStore::open_in_memory("0.1.0");
        let repos = store.repositories();
        repos.ensure("https://x/y.git").unwrap();
        let repo = repos
            .set_doc_file_paths(
                "https://x/y.git",
                vec!["b.md".into(), "a.md".into(), "a.md".into()],
            )
            .unwrap();
        assert_eq!(repo.doc_file_paths, vec!["a.md".to_string(), "b.md".to_string()]);
        assert_eq!(repo.document_count, 2);
    }

    #[test]
    fn not_found_read_is_ok_none() {
        let store = StateStore::open_in_memory("0.1.0");
        assert!(store.repositories().get("https://nope").unwrap().is_none());
    }
}
