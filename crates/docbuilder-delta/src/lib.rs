//! Delta analyzer: decides whether a build should run in full,
//! skip entirely, or re-process only the repositories that changed.

pub mod decision;

pub use decision::{aggregate, classify_repository, DeltaDecision, RepoClass, RepoReason};

use docbuilder_core::config::RepositoryConfig;
use docbuilder_core::error::Result;
use docbuilder_core::fingerprint::Fingerprint;
use docbuilder_discovery::quick_hash_repository;
use docbuilder_state::{StateStore, LAST_GLOBAL_DOC_FILES_HASH};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The outcome of one delta analysis pass.
#[derive(Debug, Clone)]
pub struct DeltaPlan {
    pub decision: DeltaDecision,
    pub reason: &'static str,
    pub changed_repos: Vec<String>,
    pub repo_reasons: Vec<RepoReason>,
}

/// Run delta analysis.
///
/// `commit_tips` optionally maps repository URL to its current VCS tip
/// commit, supplied by the caller after the VCS acquisition stage; an
/// absent entry simply means `commit_diff` can never be detected for
/// that repository (it degrades to `unchanged` or `quick_hash_diff`).
pub fn analyze(
    global_hash: &Fingerprint,
    repositories: &[RepositoryConfig],
    workspaces: &BTreeMap<String, PathBuf>,
    commit_tips: &BTreeMap<String, String>,
    state: &StateStore,
) -> Result<DeltaPlan> {
    let last_global_hash = state
        .configuration()
        .get_string(LAST_GLOBAL_DOC_FILES_HASH)?;

    if last_global_hash.as_deref() == Some(global_hash.as_str()) {
        tracing::debug!("global doc-files hash unchanged; skipping build");
        return Ok(DeltaPlan {
            decision: DeltaDecision::Skipped,
            reason: "content_unchanged",
            changed_repos: Vec::new(),
            repo_reasons: Vec::new(),
        });
    }

    let mut repo_reasons = Vec::with_capacity(repositories.len());
    for repo in repositories {
        let persisted = state.repositories().get(&repo.url)?;
        let persisted_hash = persisted.as_ref().and_then(|r| r.doc_files_hash.as_deref());
        let persisted_commit = persisted.as_ref().and_then(|r| r.last_commit.as_deref());

        let quick_hash = workspaces
            .get(&repo.name)
            .filter(|ws| ws.is_dir())
            .map(|ws| quick_hash_repository(repo, ws).to_string());

        let tip = commit_tips.get(&repo.url).map(|s| s.as_str());

        let reason = classify_repository(
            repo,
            persisted_hash,
            persisted_commit,
            quick_hash.as_deref(),
            tip,
        );
        tracing::debug!(repository = %repo.name, class = %reason.class, "classified repository");
        repo_reasons.push(reason);
    }

    let (decision, reason, changed_repos) = aggregate(&repo_reasons);
    tracing::info!(%decision, reason, "delta analysis complete");

    Ok(DeltaPlan {
        decision,
        reason,
        changed_repos,
        repo_reasons,
    })
}
