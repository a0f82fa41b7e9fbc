//! Version-control acquisition: bring a repository's working tree up
//! to date locally and report its tip commit.

use async_trait::async_trait;
use docbuilder_core::config::RepositoryConfig;
use docbuilder_core::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

/// The result of acquiring one repository's working tree.
#[derive(Debug, Clone)]
pub struct AcquiredRepo {
    pub workspace: PathBuf,
    pub commit: String,
}

/// Brings a repository's content to a local path. One production
/// implementation shells out to `git`; tests substitute
/// `FakeVcsProvider`.
#[async_trait]
pub trait VcsProvider: Send + Sync {
    async fn acquire(&self, repo: &RepositoryConfig, workspace_root: &Path) -> Result<AcquiredRepo>;
}

/// Clones on first sight, fetches and fast-forwards on subsequent
/// calls. Each repository gets its own subdirectory of
/// `workspace_root` named after `RepositoryConfig::name`.
pub struct GitVcsProvider;

impl GitVcsProvider {
    pub fn new() -> Self {
        GitVcsProvider
    }

    fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| Error::network(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::network(format!(
                "git {args:?} failed: {stderr}"
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for GitVcsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VcsProvider for GitVcsProvider {
    async fn acquire(&self, repo: &RepositoryConfig, workspace_root: &Path) -> Result<AcquiredRepo> {
        let dest = workspace_root.join(&repo.name);
        let url = repo.url.clone();
        let branch = repo.branch.clone();

        let commit = tokio::task::spawn_blocking(move || -> Result<String> {
            if dest.join(".git").is_dir() {
                Self::run_git(&dest, &["fetch", "origin", &branch])?;
                Self::run_git(
                    &dest,
                    &["reset", "--hard", &format!("origin/{branch}")],
                )?;
            } else {
                std::fs::create_dir_all(&dest)?;
                Self::run_git(
                    workspace_root_parent(&dest),
                    &[
                        "clone",
                        "--branch",
                        &branch,
                        "--single-branch",
                        &url,
                        dest.to_string_lossy().as_ref(),
                    ],
                )?;
            }
            Self::run_git(&dest, &["rev-parse", "HEAD"])
        })
        .await
        .map_err(|e| Error::internal(format!("git worker task panicked: {e}")))??;

        Ok(AcquiredRepo {
            workspace: workspace_root.join(&repo.name),
            commit,
        })
    }
}

fn workspace_root_parent(dest: &Path) -> &Path {
    dest.parent().unwrap_or(dest)
}

/// In-memory fake for orchestrator tests: pre-seeded workspace paths
/// and commit SHAs, no actual filesystem or process access beyond
/// what the test itself set up under `workspace_root`.
#[derive(Default)]
pub struct FakeVcsProvider {
    commits: Mutex<BTreeMap<String, String>>,
    fail_for: Mutex<Vec<String>>,
}

impl FakeVcsProvider {
    pub fn new() -> Self {
        FakeVcsProvider::default()
    }

    pub fn with_commit(self, url: impl Into<String>, commit: impl Into<String>) -> Self {
        self.commits.lock().unwrap().insert(url.into(), commit.into());
        self
    }

    pub fn failing_for(self, url: impl Into<String>) -> Self {
        self.fail_for.lock().unwrap().push(url.into());
        self
    }
}

#[async_trait]
impl VcsProvider for FakeVcsProvider {
    async fn acquire(&self, repo: &RepositoryConfig, workspace_root: &Path) -> Result<AcquiredRepo> {
        if self.fail_for.lock().unwrap().contains(&repo.url) {
            return Err(Error::network(format!("simulated fetch failure for {}", repo.url)));
        }
        let commit = self
            .commits
            .lock()
            .unwrap()
            .get(&repo.url)
            .cloned()
            .unwrap_or_else(|| "0".repeat(40));
        Ok(AcquiredRepo {
            workspace: workspace_root.join(&repo.name),
            commit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn repo(name: &str, url: &str) -> RepositoryConfig {
        RepositoryConfig {
            name: name.into(),
            url: url.into(),
            branch: "main".into(),
            paths: vec![],
            tags: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn fake_provider_reports_seeded_commit() {
        let provider = FakeVcsProvider::new().with_commit("https://x/a.git", "deadbeef");
        let acquired = provider
            .acquire(&repo("a", "https://x/a.git"), Path::new("/tmp/ws"))
            .await
            .unwrap();
        assert_eq!(acquired.commit, "deadbeef");
    }

    #[tokio::test]
    async fn fake_provider_honors_failure_injection() {
        let provider = FakeVcsProvider::new().failing_for("https://x/a.git");
        let result = provider
            .acquire(&repo("a", "https://x/a.git"), Path::new("/tmp/ws"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn git_provider_clones_and_reports_head() {
        let tmp = tempfile::tempdir().unwrap();
        let origin = tmp.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .args(args)
                .current_dir(&origin)
                .status()
                .unwrap();
            assert!(status.success());
        };
        run(&["init", "--initial-branch=main"]);
        run(&["config", "user.name", "test"]);
        run(&["config", "user.email", "test@example.com"]);
        std::fs::write(origin.join("README.md"), "hello").unwrap();
        run(&["add", "."]);
        run(&["commit", "-m", "initial"]);

        let workspace_root = tmp.path().join("workspaces");
        std::fs::create_dir_all(&workspace_root).unwrap();

        let provider = GitVcsProvider::new();
        let repo_config = RepositoryConfig {
            name: "origin-clone".into(),
            url: origin.to_string_lossy().to_string(),
            branch: "main".into(),
            paths: vec![],
            tags: BTreeMap::new(),
        };
        let acquired = provider
            .acquire(&repo_config, &workspace_root)
            .await
            .unwrap();
        assert_eq!(acquired.commit.len(), 40);
        assert!(acquired.workspace.join("README.md").exists());
    }
}
