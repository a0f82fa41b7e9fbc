//! Per-repository classification and build-wide aggregation.

use docbuilder_core::config::RepositoryConfig;
use std::fmt;

/// A repository's classification for this delta analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoClass {
    /// Persisted hash matches the quick hash and a commit is on record.
    Unchanged,
    /// Persisted hash is present but disagrees with the quick hash.
    QuickHashDiff,
    /// Quick hash matches but the persisted commit disagrees with the
    /// external VCS tip.
    CommitDiff,
    /// No persisted hash (first time this repository is seen, or its
    /// workspace clone is absent).
    Unknown,
}

impl RepoClass {
    pub fn is_changed(self) -> bool {
        !matches!(self, RepoClass::Unchanged)
    }
}

impl fmt::Display for RepoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepoClass::Unchanged => "unchanged",
            RepoClass::QuickHashDiff => "quick_hash_diff",
            RepoClass::CommitDiff => "commit_diff",
            RepoClass::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One repository's classification plus a short human reason.
#[derive(Debug, Clone)]
pub struct RepoReason {
    pub url: String,
    pub name: String,
    pub class: RepoClass,
    pub detail: String,
}

/// Classify a single repository against its persisted state.
///
/// `workspace` is `None` when no local clone was found for this
/// repository — this is treated as `Unknown`, never as changed.
pub fn classify_repository(
    repo: &RepositoryConfig,
    persisted_hash: Option<&str>,
    persisted_commit: Option<&str>,
    quick_hash: Option<&str>,
    vcs_tip: Option<&str>,
) -> RepoReason {
    let (class, detail) = match (persisted_hash, quick_hash) {
        (None, _) => (RepoClass::Unknown, "no persisted hash".to_string()),
        (Some(_), None) => (
            RepoClass::Unknown,
            "no workspace clone to quick-hash".to_string(),
        ),
        (Some(persisted), Some(quick)) if persisted != quick => (
            RepoClass::QuickHashDiff,
            format!("quick hash {quick} != persisted {persisted}"),
        ),
        (Some(_), Some(_)) if persisted_commit.is_none() => (
            RepoClass::QuickHashDiff,
            "quick hash matches but no commit on record".to_string(),
        ),
        (Some(_), Some(_)) => match (persisted_commit, vcs_tip) {
            (Some(commit), Some(tip)) if commit != tip => (
                RepoClass::CommitDiff,
                format!("commit {commit} != vcs tip {tip}"),
            ),
            _ => (RepoClass::Unchanged, "quick hash and commit match".to_string()),
        },
    };

    RepoReason {
        url: repo.url.clone(),
        name: repo.name.clone(),
        class,
        detail,
    }
}

/// Overall build decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaDecision {
    Full,
    Partial,
    Skipped,
}

impl fmt::Display for DeltaDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeltaDecision::Full => "full",
            DeltaDecision::Partial => "partial",
            DeltaDecision::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Fold per-repository classes into a build-wide decision and reason.
///
/// An empty repository list yields `Full` (no work performed, nothing
/// to skip).
pub fn aggregate(reasons: &[RepoReason]) -> (DeltaDecision, &'static str, Vec<String>) {
    if reasons.is_empty() {
        return (DeltaDecision::Full, "empty_repository_list", Vec::new());
    }

    let changed: Vec<&RepoReason> = reasons.iter().filter(|r| r.class.is_changed()).collect();
    let changed_repos: Vec<String> = changed.iter().map(|r| r.url.clone()).collect();

    if changed.is_empty() {
        return (
            DeltaDecision::Full,
            "no_detected_repo_change",
            changed_repos,
        );
    }

    if changed.len() == reasons.len() {
        let all_unknown = changed.iter().all(|r| r.class == RepoClass::Unknown);
        let reason = if all_unknown {
            "all_repos_unknown_state"
        } else {
            "all_repos_changed"
        };
        return (DeltaDecision::Full, reason, changed_repos);
    }

    (DeltaDecision::Partial, "partial_change", changed_repos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn repo(url: &str) -> RepositoryConfig {
        RepositoryConfig {
            name: "r".into(),
            url: url.into(),
            branch: "main".into(),
            paths: vec![],
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn no_persisted_hash_is_unknown() {
        let r = classify_repository(&repo("u"), None, None, Some("q"), None);
        assert_eq!(r.class, RepoClass::Unknown);
    }

    #[test]
    fn missing_workspace_is_unknown_not_changed() {
        let r = classify_repository(&repo("u"), Some("h"), Some("c"), None, None);
        assert_eq!(r.class, RepoClass::Unknown);
    }

    #[test]
    fn mismatched_quick_hash_is_quick_hash_diff() {
        let r = classify_repository(&repo("u"), Some("h1"), Some("c"), Some("h2"), None);
        assert_eq!(r.class, RepoClass::QuickHashDiff);
    }

    #[test]
    fn matching_hash_without_commit_is_quick_hash_diff() {
        let r = classify_repository(&repo("u"), Some("h"), None, Some("h"), None);
        assert_eq!(r.class, RepoClass::QuickHashDiff);
    }

    #[test]
    fn matching_hash_and_commit_is_unchanged() {
        let r = classify_repository(&repo("u"), Some("h"), Some("c"), Some("h"), None);
        assert_eq!(r.class, RepoClass::Unchanged);
    }

    #[test]
    fn matching_hash_disagreeing_tip_is_commit_diff() {
        let r = classify_repository(&repo("u"), Some("h"), Some("c1"), Some("h"), Some("c2"));
        assert_eq!(r.class, RepoClass::CommitDiff);
    }

    #[test]
    fn empty_repo_list_yields_full() {
        let (decision, reason, changed) = aggregate(&[]);
        assert_eq!(decision, DeltaDecision::Full);
        assert_eq!(reason, "empty_repository_list");
        assert!(changed.is_empty());
    }

    #[test]
    fn all_unknown_yields_full_unknown_state() {
        let reasons = vec![
            RepoReason {
                url: "a".into(),
                name: "a".into(),
                class: RepoClass::Unknown,
                detail: "".into(),
            },
            RepoReason {
                url: "b".into(),
                name: "b".into(),
                class: RepoClass::Unknown,
                detail: "".into(),
            },
        ];
        let (decision, reason, _) = aggregate(&reasons);
        assert_eq!(decision, DeltaDecision::Full);
        assert_eq!(reason, "all_repos_unknown_state");
    }

    #[test]
    fn mixed_classes_yield_partial() {
        let reasons = vec![
            RepoReason {
                url: "a".into(),
                name: "a".into(),
                class: RepoClass::Unchanged,
                detail: "".into(),
            },
            RepoReason {
                url: "b".into(),
                name: "b".into(),
                class: RepoClass::QuickHashDiff,
                detail: "".into(),
            },
        ];
        let (decision, reason, changed) = aggregate(&reasons);
        assert_eq!(decision, DeltaDecision::Partial);
        assert_eq!(reason, "partial_change");
        assert_eq!(changed, vec!["b".to_string()]);
    }

    #[test]
    fn zero_changed_defensively_falls_back_to_full() {
        let reasons = vec![RepoReason {
            url: "a".into(),
            name: "a".into(),
            class: RepoClass::Unchanged,
            detail: "".into(),
        }];
        let (decision, reason, _) = aggregate(&reasons);
        assert_eq!(decision, DeltaDecision::Full);
        assert_eq!(reason, "no_detected_repo_change");
    }
}
