//! Types describing a single build invocation and its outcome,
//! independent of how the invocation was triggered (CLI, webhook,
//! schedule, API).

use docbuilder_delta::DeltaDecision;
use serde::{Deserialize, Serialize};

/// Who or what asked for this build to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Cli,
    Webhook,
    Schedule,
    Api,
}

impl TriggerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Cli => "cli",
            TriggerSource::Webhook => "webhook",
            TriggerSource::Schedule => "schedule",
            TriggerSource::Api => "api",
        }
    }
}

/// One build invocation. `force_full` bypasses delta analysis
/// entirely, always running every repository.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub triggered_by: TriggerSource,
    pub force_full: bool,
}

impl BuildRequest {
    pub fn new(triggered_by: TriggerSource) -> Self {
        BuildRequest {
            triggered_by,
            force_full: false,
        }
    }

    pub fn forced(triggered_by: TriggerSource) -> Self {
        BuildRequest {
            triggered_by,
            force_full: true,
        }
    }
}

/// Per-repository outcome within a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoOutcome {
    pub url: String,
    pub name: String,
    pub documents_written: u64,
    pub error: Option<String>,
}

/// The final status of a build, mirroring
/// `docbuilder_state::BuildStatus` minus `Pending`/`Running` (those
/// only exist while the build is in flight).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    Completed,
    Failed,
    Canceled,
    Skipped,
}

/// A completed (or skipped/canceled/failed) build, suitable for
/// logging, persisting, and returning to API callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub build_id: String,
    pub outcome: BuildOutcome,
    pub decision_reason: String,
    pub repositories: Vec<RepoOutcome>,
    pub documents_written: u64,
    /// Files detected as removed from an unchanged repository's
    /// persisted path list during a deletion-detection re-walk.
    pub deletions: u64,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl BuildReport {
    pub fn skipped(build_id: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildReport {
            build_id: build_id.into(),
            outcome: BuildOutcome::Skipped,
            decision_reason: reason.into(),
            repositories: Vec::new(),
            documents_written: 0,
            deletions: 0,
            duration_ms: 0,
            error: None,
        }
    }

    /// Exit code per the CLI contract: zero on success or skip,
    /// non-zero otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            BuildOutcome::Completed | BuildOutcome::Skipped => 0,
            BuildOutcome::Failed => 1,
            BuildOutcome::Canceled => 2,
        }
    }
}

pub fn decision_to_outcome_reason(decision: DeltaDecision, reason: &str) -> String {
    format!("{decision}:{reason}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_report_has_zero_exit_code() {
        let report = BuildReport::skipped("b1", "content_unchanged");
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.outcome, BuildOutcome::Skipped);
    }

    #[test]
    fn failed_report_has_nonzero_exit_code() {
        let report = BuildReport {
            build_id: "b1".into(),
            outcome: BuildOutcome::Failed,
            decision_reason: "full:all_repos_changed".into(),
            repositories: vec![],
            documents_written: 0,
            deletions: 0,
            duration_ms: 10,
            error: Some("boom".into()),
        };
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn canceled_report_has_exit_code_two() {
        let report = BuildReport {
            build_id: "b1".into(),
            outcome: BuildOutcome::Canceled,
            decision_reason: "full:all_repos_changed".into(),
            repositories: vec![],
            documents_written: 0,
            deletions: 0,
            duration_ms: 10,
            error: None,
        };
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn trigger_source_as_str_matches_serde_rename() {
        assert_eq!(TriggerSource::Webhook.as_str(), "webhook");
    }
}
