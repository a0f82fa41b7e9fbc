//! Persisted entity types. Every semantically optional field is
//! modeled as `Option<T>`, never a sentinel zero value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Identity `(URL, Name, Branch)` plus mutable bookkeeping. Keyed by
/// URL in the state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub url: String,
    pub name: String,
    pub branch: String,

    pub last_discovery: Option<DateTime<Utc>>,
    pub last_build: Option<DateTime<Utc>>,
    pub last_commit: Option<String>,

    pub document_count: u64,
    pub build_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,

    pub doc_files_hash: Option<String>,
    /// Sorted, forge-prefixed, duplicate-free.
    pub doc_file_paths: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    /// Create a fresh repository entry with default bookkeeping,
    /// deriving `name` from the URL's last path segment (stripping a
    /// trailing `.git`) when one isn't supplied.
    pub fn new(url: impl Into<String>, name: Option<String>, branch: Option<String>) -> Self {
        let url = url.into();
        let now = Utc::now();
        let name = name.unwrap_or_else(|| derive_name_from_url(&url));
        Repository {
            url,
            name,
            branch: branch.unwrap_or_else(|| "main".to_string()),
            last_discovery: None,
            last_build: None,
            last_commit: None,
            document_count: 0,
            build_count: 0,
            error_count: 0,
            last_error: None,
            doc_files_hash: None,
            doc_file_paths: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// `DocFilePaths` must be sorted ascending and free of duplicates.
    pub fn paths_well_formed(&self) -> bool {
        self.doc_file_paths.windows(2).all(|w| w[0] < w[1])
    }
}

/// Derive a default repository name from a URL: its last path segment
/// with a trailing `.git` stripped.
pub fn derive_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Build execution status. Terminal statuses are irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl BuildStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildStatus::Completed | BuildStatus::Failed | BuildStatus::Canceled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub id: String,
    pub status: BuildStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub triggered_by: String,
    pub commit_hash: Option<String>,
    pub error_msg: Option<String>,
    pub output_path: Option<String>,
    pub log_level: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Build {
    pub fn new(id: impl Into<String>, triggered_by: impl Into<String>, log_level: &str) -> Self {
        let now = Utc::now();
        Build {
            id: id.into(),
            status: BuildStatus::Pending,
            start_time: now,
            end_time: None,
            duration: None,
            triggered_by: triggered_by.into(),
            commit_hash: None,
            error_msg: None,
            output_path: None,
            log_level: log_level.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Either a cron expression or an interval, never both — modeled as a
/// sum type rather than two optional fields (resolves the Open
/// Question in `spec.md` §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScheduleTrigger {
    Cron(String),
    Interval(Duration),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    pub trigger: ScheduleTrigger,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub failure_count: u64,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counters, recomputed online rather than by full rescans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub total_builds: u64,
    pub successful_builds: u64,
    pub failed_builds: u64,
    pub total_discoveries: u64,
    pub documents_found: u64,
    pub average_build_duration_ms: f64,
    pub last_stat_reset: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub last_updated: DateTime<Utc>,
}

impl Default for Statistics {
    fn default() -> Self {
        let now = Utc::now();
        Statistics {
            total_builds: 0,
            successful_builds: 0,
            failed_builds: 0,
            total_discoveries: 0,
            documents_found: 0,
            average_build_duration_ms: 0.0,
            last_stat_reset: now,
            uptime_seconds: 0,
            last_updated: now,
        }
    }
}

impl Statistics {
    /// Fold a completed build's outcome and duration into the running
    /// average online (no need to keep every historical duration).
    pub fn record_build(&mut self, success: bool, duration_ms: u64) {
        let prior_total = self.total_builds;
        self.total_builds += 1;
        if success {
            self.successful_builds += 1;
        } else {
            self.failed_builds += 1;
        }
        let prior_sum = self.average_build_duration_ms * prior_total as f64;
        self.average_build_duration_ms =
            (prior_sum + duration_ms as f64) / self.total_builds as f64;
        self.last_updated = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonInfo {
    pub version: String,
    pub start_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub status: DaemonStatus,
}

/// Untyped string -> value configuration bag (global hashes, checksums, …).
pub type ConfigurationBag = BTreeMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_name_stripping_git_suffix() {
        assert_eq!(
            derive_name_from_url("https://github.com/acme/widgets.git"),
            "widgets"
        );
        assert_eq!(
            derive_name_from_url("https://github.com/acme/widgets"),
            "widgets"
        );
        assert_eq!(
            derive_name_from_url("https://github.com/acme/widgets/"),
            "widgets"
        );
    }

    #[test]
    fn new_repository_defaults_branch_to_main() {
        let r = Repository::new("https://example.com/acme/x.git", None, None);
        assert_eq!(r.branch, "main");
        assert_eq!(r.name, "x");
        assert_eq!(r.document_count, 0);
    }

    #[test]
    fn statistics_running_average_matches_manual_computation() {
        let mut s = Statistics::default();
        s.record_build(true, 100);
        s.record_build(false, 300);
        assert_eq!(s.total_builds, 2);
        assert_eq!(s.successful_builds, 1);
        assert_eq!(s.failed_builds, 1);
        assert!((s.average_build_duration_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn build_terminal_statuses_are_irreversible_by_convention() {
        assert!(BuildStatus::Completed.is_terminal());
        assert!(BuildStatus::Failed.is_terminal());
        assert!(BuildStatus::Canceled.is_terminal());
        assert!(!BuildStatus::Running.is_terminal());
        assert!(!BuildStatus::Pending.is_terminal());
    }

    #[test]
    fn paths_well_formed_rejects_unsorted_or_duplicate() {
        let mut r = Repository::new("https://x/y.git", None, None);
        r.doc_file_paths = vec!["a".into(), "b".into()];
        assert!(r.paths_well_formed());
        r.doc_file_paths = vec!["b".into(), "a".into()];
        assert!(!r.paths_well_formed());
        r.doc_file_paths = vec!["a".into(), "a".into()];
        assert!(!r.paths_well_formed());
    }
}
