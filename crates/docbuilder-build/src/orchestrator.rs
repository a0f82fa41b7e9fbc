//! The build orchestrator: acquire, discover, analyze, transform,
//! generate, persist. A single `Orchestrator::run` call drives every
//! trigger surface (CLI, webhook, schedule, API).

use crate::config::BuildConfig;
use crate::request::{BuildOutcome, BuildReport, BuildRequest, RepoOutcome};
use crate::site::SiteGenerator;
use crate::transform::TransformPipeline;
use crate::vcs::VcsProvider;
use docbuilder_core::config::RepositoryConfig;
use docbuilder_core::error::{Error, ErrorCategory, Result};
use docbuilder_core::fingerprint::path_fingerprint;
use docbuilder_delta::DeltaDecision;
use docbuilder_state::{BuildStatus, StateStore};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Everything the orchestrator needs besides the request itself:
/// repository list, output locations, and the three external
/// collaborators.
pub struct Orchestrator {
    pub repositories: Vec<RepositoryConfig>,
    pub build_config: BuildConfig,
    pub workspace_root: PathBuf,
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub state: StateStore,
    pub vcs: Arc<dyn VcsProvider>,
    pub transform: Arc<dyn TransformPipeline>,
    pub site: Arc<dyn SiteGenerator>,
}

impl Orchestrator {
    /// Run one build to completion (or until canceled/timed out).
    ///
    /// No `Build` row is created for a build that turns out to be
    /// skipped: rows only exist for executions that actually ran
    /// stages 4 onward.
    pub async fn run(&self, request: &BuildRequest, cancel: &CancellationToken) -> Result<BuildReport> {
        let start = Instant::now();
        let build_id = uuid::Uuid::new_v4().to_string();

        if cancel.is_cancelled() {
            return Ok(canceled_report(&build_id, start));
        }

        let (discovery, plan, _workspaces, commit_tips) = match self.acquire_discover_analyze(request, cancel).await? {
            Some(staged) => staged,
            None => return Ok(canceled_report(&build_id, start)),
        };

        if let Some(plan) = &plan {
            if plan.decision == DeltaDecision::Skipped {
                return Ok(BuildReport::skipped(&build_id, plan.reason));
            }
        }

        let build = docbuilder_state::Build::new(&build_id, request.triggered_by.as_str(), "info");
        self.state.builds().create(build)?;

        let result = self
            .run_remaining_stages(&discovery, plan.as_ref(), &commit_tips, &build_id, cancel, start)
            .await;

        match &result {
            Ok(report) => {
                let status = match report.outcome {
                    BuildOutcome::Completed => BuildStatus::Completed,
                    BuildOutcome::Failed => BuildStatus::Failed,
                    BuildOutcome::Canceled => BuildStatus::Canceled,
                    BuildOutcome::Skipped => unreachable!("skip decided before the build row was created"),
                };
                self.state.builds().update_status(&build_id, status, report.error.clone())?;
                self.state
                    .statistics()
                    .record_build(report.outcome == BuildOutcome::Completed, report.duration_ms)?;
            }
            Err(e) => {
                self.state
                    .builds()
                    .update_status(&build_id, BuildStatus::Failed, Some(e.to_string()))?;
            }
        }

        result
    }

    /// Stages 1–3: acquire, discover, analyze. Returns `None` if
    /// cancellation was observed before discovery completed.
    async fn acquire_discover_analyze(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
    ) -> Result<
        Option<(
            docbuilder_discovery::DiscoveryOutput,
            Option<docbuilder_delta::DeltaPlan>,
            BTreeMap<String, PathBuf>,
            BTreeMap<String, String>,
        )>,
    > {
        // Stage 1: acquire every repository's working tree, bounded by
        // build_config.max_concurrent.
        let acquired = self.acquire_all(cancel).await?;
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let workspaces: BTreeMap<String, PathBuf> = self
            .repositories
            .iter()
            .filter_map(|r| acquired.get(&r.url).map(|a| (r.name.clone(), a.workspace.clone())))
            .collect();
        let commit_tips: BTreeMap<String, String> = acquired
            .iter()
            .map(|(url, a)| (url.clone(), a.commit.clone()))
            .collect();

        // Stage 2: discovery (inherently global — collision detection
        // requires visibility across every repository's files, so this
        // runs as a single batch call rather than per-repo tasks).
        let namespace_mode = self.build_config.namespace_forges;
        let discovery = docbuilder_discovery::discover(&self.repositories, &workspaces, namespace_mode)?;

        if cancel.is_cancelled() {
            return Ok(None);
        }

        // Stage 3: delta analysis.
        let plan = if request.force_full {
            None
        } else {
            Some(docbuilder_delta::analyze(
                &discovery.global_hash,
                &self.repositories,
                &workspaces,
                &commit_tips,
                &self.state,
            )?)
        };

        Ok(Some((discovery, plan, workspaces, commit_tips)))
    }

    async fn run_remaining_stages(
        &self,
        discovery: &docbuilder_discovery::DiscoveryOutput,
        plan: Option<&docbuilder_delta::DeltaPlan>,
        commit_tips: &BTreeMap<String, String>,
        build_id: &str,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<BuildReport> {
        if cancel.is_cancelled() {
            return Ok(canceled_report(build_id, start));
        }

        let changed_repos: Option<Vec<String>> = plan.and_then(|p| {
            if p.decision == DeltaDecision::Partial {
                Some(p.changed_repos.clone())
            } else {
                None
            }
        });

        // Stage 4: transform. Only files from changed repos are
        // (re)written on a partial build.
        let files_to_transform: Vec<&docbuilder_core::DocFile> = discovery
            .files
            .iter()
            .filter(|f| match &changed_repos {
                Some(changed) => changed.iter().any(|url| repo_url_matches(&self.repositories, url, &f.repository)),
                None => true,
            })
            .collect();

        let mut documents_written = 0u64;
        let mut repo_errors: BTreeMap<String, String> = BTreeMap::new();

        for chunk in files_to_transform.chunks(max_concurrency(self.build_config.max_concurrent)) {
            if cancel.is_cancelled() {
                return Ok(canceled_report(build_id, start));
            }
            let mut set: JoinSet<(String, Result<()>)> = JoinSet::new();
            for file in chunk {
                let file = (*file).clone();
                let repo_name = file.repository.clone();
                let canonical = discovery
                    .manifest
                    .files
                    .iter()
                    .find(|m| m.relative_path == file.relative_path && m.repository == file.repository)
                    .map(|m| m.path.clone())
                    .unwrap_or_else(|| file.relative_path.clone());
                let transform = self.transform.clone();
                let content_dir = self.content_dir.clone();
                set.spawn(async move {
                    let outcome: Result<()> = async {
                        let transformed = transform.transform(&file, &canonical).await?;
                        let dest = content_dir.join(&transformed.canonical_path);
                        if let Some(parent) = dest.parent() {
                            tokio::fs::create_dir_all(parent).await?;
                        }
                        tokio::fs::write(&dest, &transformed.bytes).await?;
                        Ok(())
                    }
                    .await;
                    (repo_name, outcome)
                });
            }
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((_, Ok(()))) => documents_written += 1,
                    Ok((_, Err(e))) if e.category.is_fatal() => return Err(e),
                    Ok((repo_name, Err(e))) => {
                        repo_errors.insert(repo_name, e.to_string());
                    }
                    Err(e) => return Err(Error::internal(format!("transform task panicked: {e}"))),
                }
            }
        }

        if cancel.is_cancelled() {
            return Ok(canceled_report(build_id, start));
        }

        // Stage 5: site generation (single-threaded).
        self.site.generate(&self.content_dir, &self.output_dir).await?;

        // Stage 6: persist results.
        let deletions = self.persist_results(
            discovery,
            changed_repos.as_deref(),
            commit_tips,
            self.build_config.detect_deletions,
        )? as u64;

        let duration_ms = start.elapsed().as_millis() as u64;
        let repositories: Vec<RepoOutcome> = self
            .repositories
            .iter()
            .map(|r| RepoOutcome {
                url: r.url.clone(),
                name: r.name.clone(),
                documents_written: discovery
                    .repo_paths
                    .get(&r.name)
                    .map(|p| p.len() as u64)
                    .unwrap_or(0),
                error: repo_errors.get(&r.name).cloned(),
            })
            .collect();

        let decision_reason = plan
            .map(|p| crate::request::decision_to_outcome_reason(p.decision, p.reason))
            .unwrap_or_else(|| "full:forced".to_string());

        tracing::info!(build_id, documents_written, deletions, "build completed");

        let all_failed = !repositories.is_empty() && repositories.iter().all(|r| r.error.is_some());

        Ok(BuildReport {
            build_id: build_id.to_string(),
            outcome: if all_failed {
                BuildOutcome::Failed
            } else {
                BuildOutcome::Completed
            },
            decision_reason,
            repositories,
            documents_written,
            deletions,
            duration_ms,
            error: None,
        })
    }

    async fn acquire_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, crate::vcs::AcquiredRepo>> {
        let mut results = BTreeMap::new();
        for chunk in self
            .repositories
            .chunks(max_concurrency(self.build_config.max_concurrent))
        {
            if cancel.is_cancelled() {
                break;
            }
            let mut set: JoinSet<(String, Result<crate::vcs::AcquiredRepo>)> = JoinSet::new();
            for repo in chunk {
                let repo = repo.clone();
                let vcs = self.vcs.clone();
                let workspace_root = self.workspace_root.clone();
                set.spawn(async move {
                    let url = repo.url.clone();
                    (url, vcs.acquire(&repo, &workspace_root).await)
                });
            }
            while let Some(joined) = set.join_next().await {
                let (url, outcome) = joined
                    .map_err(|e| Error::internal(format!("vcs acquire task panicked: {e}")))?;
                match outcome {
                    Ok(acquired) => {
                        results.insert(url, acquired);
                    }
                    Err(e) if e.category == ErrorCategory::Network => {
                        tracing::warn!(repository = %url, error = %e, "vcs acquisition failed; repository treated as unavailable");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(results)
    }

    /// Write per-repo hashes/paths/commits, the new global hash, and
    /// re-walk unchanged repos to detect deletions when enabled.
    /// Returns the number of deleted files detected.
    fn persist_results(
        &self,
        discovery: &docbuilder_discovery::DiscoveryOutput,
        changed_repos: Option<&[String]>,
        commit_tips: &BTreeMap<String, String>,
        detect_deletions: bool,
    ) -> Result<usize> {
        let mut deletions = 0usize;
        let single_repo = self.repositories.len() == 1;
        let namespace_forges =
            docbuilder_discovery::should_namespace_forges(self.build_config.namespace_forges, &self.repositories);

        let mut final_paths: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for repo in &self.repositories {
            let persisted = self
                .state
                .repositories()
                .get(&repo.url)?
                .map(|r| r.doc_file_paths)
                .unwrap_or_default();

            let is_changed = match changed_repos {
                Some(changed) => changed.iter().any(|url| url == &repo.url),
                None => true,
            };

            let current_paths = if is_changed {
                // Changed repository (or a full build): this pass's
                // discovery already reflects any on-disk deletions
                // directly.
                discovery.repo_paths.get(&repo.name).cloned().unwrap_or_default()
            } else if detect_deletions {
                // Unchanged repository: re-walk its workspace to catch
                // deletions that didn't otherwise trigger reprocessing.
                let workspace = self.workspace_root.join(&repo.name);
                if workspace.is_dir() {
                    let live_paths: Vec<String> = docbuilder_discovery::walk_repository(repo, &workspace)
                        .into_iter()
                        .map(|f| {
                            let filename = format!("{}.{}", f.name, f.extension);
                            docbuilder_discovery::map_to_content_path(
                                single_repo,
                                namespace_forges,
                                f.forge.as_deref(),
                                &f.repository,
                                &f.section,
                                &filename,
                            )
                        })
                        .collect();
                    persisted
                        .iter()
                        .filter(|p| live_paths.contains(p))
                        .cloned()
                        .collect()
                } else {
                    persisted.clone()
                }
            } else {
                persisted.clone()
            };

            if detect_deletions {
                let current_set: std::collections::BTreeSet<&String> = current_paths.iter().collect();
                deletions += persisted.iter().filter(|p| !current_set.contains(p)).count();
            }

            final_paths.insert(repo.url.clone(), current_paths);
        }

        let all_paths: Vec<String> = final_paths.values().flatten().cloned().collect();
        let global_hash = path_fingerprint(all_paths.iter().map(|s| s.as_str()));

        self.state.with_transaction(|snap| {
            for repo in &self.repositories {
                let entry = snap
                    .repositories
                    .entry(repo.url.clone())
                    .or_insert_with(|| docbuilder_state::Repository::new(repo.url.clone(), Some(repo.name.clone()), Some(repo.branch.clone())));

                if let Some(paths) = final_paths.get(&repo.url) {
                    let mut sorted = paths.clone();
                    sorted.sort();
                    sorted.dedup();
                    entry.document_count = sorted.len() as u64;
                    entry.doc_file_paths = sorted;
                }
                if let Some(commit) = commit_tips.get(&repo.url) {
                    entry.last_commit = Some(commit.clone());
                }
                entry.last_discovery = Some(chrono::Utc::now());
                entry.last_build = Some(chrono::Utc::now());
                entry.build_count += 1;
                entry.updated_at = chrono::Utc::now();

                if let Some(hash) = entry_hash_for(discovery, &repo.name) {
                    entry.doc_files_hash = Some(hash);
                }
            }
            snap.configuration.insert(
                docbuilder_state::LAST_GLOBAL_DOC_FILES_HASH.to_string(),
                serde_json::json!(global_hash.to_string()),
            );
            Ok(())
        })?;

        Ok(deletions)
    }
}

/// The persisted per-repo hash must be computed the same way
/// `docbuilder_delta::quick_hash_repository` computes it (over raw
/// relative paths, not canonical content paths), since that is what
/// the delta analyzer compares it against on the next build.
fn entry_hash_for(discovery: &docbuilder_discovery::DiscoveryOutput, repo_name: &str) -> Option<String> {
    if !discovery.files.iter().any(|f| f.repository == repo_name) {
        return None;
    }
    let relative_paths: Vec<&str> = discovery
        .files
        .iter()
        .filter(|f| f.repository == repo_name)
        .map(|f| f.relative_path.as_str())
        .collect();
    Some(path_fingerprint(relative_paths).to_string())
}

fn repo_url_matches(repositories: &[RepositoryConfig], url: &str, repo_name: &str) -> bool {
    repositories
        .iter()
        .any(|r| r.url == url && r.name == repo_name)
}

fn max_concurrency(configured: usize) -> usize {
    configured.max(1)
}

fn canceled_report(build_id: &str, start: Instant) -> BuildReport {
    BuildReport {
        build_id: build_id.to_string(),
        outcome: BuildOutcome::Canceled,
        decision_reason: "canceled".to_string(),
        repositories: Vec::new(),
        documents_written: 0,
        deletions: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        error: None,
    }
}
