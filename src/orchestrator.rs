//! Compose RepoHandle -> DiffEngine -> PatternMatcher/PatternGroups ->
//! (optional) WorkflowCorrelator -> Projector into one `ChangedFiles` result.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::Config;
use crate::diff::{self, ChangeKind, ChangeSet, DiffSettings};
use crate::error::LeChangeError;
use crate::pattern::{partition_patterns, PatternMatcher};
use crate::pattern_groups::{self, PatternGroup};
use crate::projector::{self, ProjectionSettings};
use crate::repo::{RepoHandle, ResolveError, Sha};
use crate::workflow::correlator::{self, CorrelationInput};
use crate::workflow::{RebuildReason, WorkflowClient, WorkflowJob};

/// A free-form note about a non-fatal condition encountered during the call.
/// `category` is always one of the `Diagnostic::*_CATEGORY` constants.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub category: &'static str,
    pub message: String,
    pub detail: Option<serde_json::Value>,
}

impl Diagnostic {
    pub const SKIPPED_SAME_SHA: &'static str = "skipped_same_sha";
    pub const SHALLOW_BOUNDARY: &'static str = "shallow_boundary";
    pub const WORKFLOW_TIMEOUT: &'static str = "workflow_timeout";
    pub const RENAME_DETECTION_DISABLED: &'static str = "rename_detection_disabled";
    pub const TOKEN_MISSING: &'static str = "token_missing";
    pub const WORKFLOW_UNAVAILABLE: &'static str = "workflow_unavailable";

    fn new(category: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            category,
            message: message.into(),
            detail: None,
        }
    }

    fn with_detail(category: &'static str, message: impl Into<String>, detail: serde_json::Value) -> Self {
        Diagnostic {
            category,
            message: message.into(),
            detail: Some(detail),
        }
    }
}

/// The immutable, typed result of one `get_changed_files` call.
#[derive(Debug, Clone, Default)]
pub struct ChangedFiles {
    pub all_changed: Vec<String>,
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub renamed: Vec<(String, String)>,
    pub type_changed: Vec<String>,

    pub all_changed_count: usize,
    pub added_count: usize,
    pub modified_count: usize,
    pub deleted_count: usize,
    pub renamed_count: usize,
    pub type_changed_count: usize,

    pub any_added: bool,
    pub any_modified: bool,
    pub any_deleted: bool,
    pub any_renamed: bool,
    pub any_type_changed: bool,

    pub renamed_files_mapping: Vec<(String, String)>,
    pub changed_keys: Vec<String>,

    pub files_to_rebuild: Vec<String>,
    pub files_to_skip: Vec<String>,
    pub rebuild_reasons: Vec<RebuildReason>,
    pub failed_jobs: Vec<String>,
    pub successful_jobs: Vec<String>,

    pub diagnostics: Vec<Diagnostic>,
}

fn empty_result_with(diagnostic: Diagnostic) -> ChangedFiles {
    ChangedFiles {
        diagnostics: vec![diagnostic],
        ..Default::default()
    }
}

/// Resolve `rev` through `RepoHandle::resolve_checked`, recording a
/// `shallow_boundary` diagnostic when the clone is too shallow to reach it.
fn resolve_endpoint(
    handle: &RepoHandle,
    rev: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Sha, LeChangeError> {
    handle.resolve_checked(rev).map_err(|e| match e {
        ResolveError::Git(git_err) => LeChangeError::Git(git_err),
        ResolveError::ShallowClone(shallow_err) => {
            diagnostics.push(Diagnostic::new(
                Diagnostic::SHALLOW_BOUNDARY,
                format!("revision `{rev}` lies beyond the shallow clone boundary"),
            ));
            LeChangeError::ShallowClone(shallow_err)
        }
    })
}

fn compile_matcher(config: &Config) -> Result<PatternMatcher, LeChangeError> {
    let (mut includes, mut extra_excludes) = partition_patterns(&config.files);
    let (extra_includes, mut excludes) = partition_patterns(&config.files_ignore);
    includes.extend(extra_includes);
    excludes.append(&mut extra_excludes);
    Ok(PatternMatcher::new(&includes, &excludes, config.negation_first)?)
}

fn compile_groups(config: &Config) -> Result<Vec<PatternGroup>, LeChangeError> {
    match &config.files_yaml {
        Some(yaml) => pattern_groups::load_yaml_patterns(yaml, config.negation_first),
        None => Ok(Vec::new()),
    }
}

/// Split a filtered ChangeSet into per-kind, lexicographically sorted
/// projections, honoring the ChangeSet invariants from the data model
/// (kinds grouped, lexicographic by path within each kind).
fn assemble(
    changes: &ChangeSet,
    renamed_files_mapping: Vec<(String, String)>,
    changed_keys: Vec<String>,
    correlation: Option<correlator::CorrelationResult>,
    diagnostics: Vec<Diagnostic>,
) -> ChangedFiles {
    let mut added: Vec<String> = Vec::new();
    let mut modified: Vec<String> = Vec::new();
    let mut deleted: Vec<String> = Vec::new();
    let mut renamed: Vec<(String, String)> = Vec::new();
    let mut type_changed: Vec<String> = Vec::new();

    for record in changes {
        match record.kind {
            ChangeKind::Added => added.push(record.path.clone()),
            ChangeKind::Modified => modified.push(record.path.clone()),
            ChangeKind::Deleted => deleted.push(record.path.clone()),
            ChangeKind::Renamed => {
                if let Some(old) = &record.old_path {
                    renamed.push((old.clone(), record.path.clone()));
                }
            }
            ChangeKind::TypeChanged => type_changed.push(record.path.clone()),
        }
    }

    added.sort();
    modified.sort();
    deleted.sort();
    renamed.sort();
    type_changed.sort();

    let mut all_changed: BTreeSet<String> = BTreeSet::new();
    all_changed.extend(added.iter().cloned());
    all_changed.extend(modified.iter().cloned());
    all_changed.extend(deleted.iter().cloned());
    all_changed.extend(renamed.iter().map(|(_, new)| new.clone()));
    all_changed.extend(type_changed.iter().cloned());
    let all_changed: Vec<String> = all_changed.into_iter().collect();

    let (files_to_rebuild, files_to_skip, rebuild_reasons, failed_jobs, successful_jobs) =
        match correlation {
            Some(c) => (
                c.files_to_rebuild.into_iter().collect(),
                c.files_to_skip.into_iter().collect(),
                c.rebuild_reasons,
                c.failed_jobs,
                c.successful_jobs,
            ),
            None => (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new()),
        };

    ChangedFiles {
        all_changed_count: all_changed.len(),
        added_count: added.len(),
        modified_count: modified.len(),
        deleted_count: deleted.len(),
        renamed_count: renamed.len(),
        type_changed_count: type_changed.len(),
        any_added: !added.is_empty(),
        any_modified: !modified.is_empty(),
        any_deleted: !deleted.is_empty(),
        any_renamed: !renamed.is_empty(),
        any_type_changed: !type_changed.is_empty(),
        all_changed,
        added,
        modified,
        deleted,
        renamed,
        type_changed,
        renamed_files_mapping,
        changed_keys,
        files_to_rebuild,
        files_to_skip,
        rebuild_reasons,
        failed_jobs,
        successful_jobs,
        diagnostics,
    }
}

fn build_workflow_client(config: &Config, diagnostics: &mut Vec<Diagnostic>) -> Option<WorkflowClient> {
    match WorkflowClient::from_config(config.token.as_deref(), config.repository.as_deref()) {
        Ok(client) => Some(client),
        Err(_) => {
            diagnostics.push(Diagnostic::new(
                Diagnostic::TOKEN_MISSING,
                "track_workflow_failures requested without a CI token/repository; \
                 workflow correlation skipped",
            ));
            None
        }
    }
}

fn partition_by_status(runs: Vec<crate::workflow::WorkflowRun>) -> (Vec<crate::workflow::WorkflowRun>, Vec<crate::workflow::WorkflowRun>) {
    runs.into_iter()
        .partition(|r| r.status == crate::workflow::RunStatus::Completed)
}

fn record_still_running(diagnostics: &mut Vec<Diagnostic>, still_running: &[crate::workflow::WorkflowRun]) {
    if !still_running.is_empty() {
        diagnostics.push(Diagnostic::with_detail(
            Diagnostic::WORKFLOW_TIMEOUT,
            format!("{} run(s) still in flight when the wait budget elapsed", still_running.len()),
            serde_json::json!({ "still_running": still_running.iter().map(|r| r.id).collect::<Vec<_>>() }),
        ));
    }
}

fn run_correlation(
    config: &Config,
    head_hex: &str,
    changes: &ChangeSet,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<correlator::CorrelationResult> {
    let client = build_workflow_client(config, diagnostics)?;

    let runs = match client.list_runs(head_hex, config.workflow_name_filter.as_deref()) {
        Ok(runs) => runs,
        Err(e) => {
            diagnostics.push(Diagnostic::new(Diagnostic::WORKFLOW_UNAVAILABLE, e.to_string()));
            return None;
        }
    };

    let (completed, still_running) = if config.wait_for_active_workflows {
        match client.wait_active(runs, Duration::from_secs(config.workflow_max_wait_seconds)) {
            Ok(pair) => pair,
            Err(e) => {
                diagnostics.push(Diagnostic::new(Diagnostic::WORKFLOW_TIMEOUT, e.to_string()));
                return None;
            }
        }
    } else {
        partition_by_status(runs)
    };
    record_still_running(diagnostics, &still_running);

    let mut jobs_by_run: Vec<(i64, Vec<WorkflowJob>)> = Vec::with_capacity(completed.len());
    for run in &completed {
        match client.list_jobs(run.id) {
            Ok(jobs) => jobs_by_run.push((run.id, jobs)),
            Err(e) => diagnostics.push(Diagnostic::new(Diagnostic::WORKFLOW_UNAVAILABLE, e.to_string())),
        }
    }

    Some(correlator::correlate(CorrelationInput {
        changes,
        runs: &completed,
        jobs_by_run: &jobs_by_run,
        skip_successful_files: config.skip_successful_files,
    }))
}

/// Async counterpart of `run_correlation`: suspends on the CI provider's HTTP
/// calls via `WorkflowClient`'s `*_async` methods instead of blocking a
/// worker thread.
async fn run_correlation_async(
    config: &Config,
    head_hex: &str,
    changes: &ChangeSet,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<correlator::CorrelationResult> {
    let client = build_workflow_client(config, diagnostics)?;

    let runs = match client
        .list_runs_async(head_hex, config.workflow_name_filter.as_deref())
        .await
    {
        Ok(runs) => runs,
        Err(e) => {
            diagnostics.push(Diagnostic::new(Diagnostic::WORKFLOW_UNAVAILABLE, e.to_string()));
            return None;
        }
    };

    let (completed, still_running) = if config.wait_for_active_workflows {
        match client
            .wait_active_async(runs, Duration::from_secs(config.workflow_max_wait_seconds))
            .await
        {
            Ok(pair) => pair,
            Err(e) => {
                diagnostics.push(Diagnostic::new(Diagnostic::WORKFLOW_TIMEOUT, e.to_string()));
                return None;
            }
        }
    } else {
        partition_by_status(runs)
    };
    record_still_running(diagnostics, &still_running);

    let mut jobs_by_run: Vec<(i64, Vec<WorkflowJob>)> = Vec::with_capacity(completed.len());
    for run in &completed {
        match client.list_jobs_async(run.id).await {
            Ok(jobs) => jobs_by_run.push((run.id, jobs)),
            Err(e) => diagnostics.push(Diagnostic::new(Diagnostic::WORKFLOW_UNAVAILABLE, e.to_string())),
        }
    }

    Some(correlator::correlate(CorrelationInput {
        changes,
        runs: &completed,
        jobs_by_run: &jobs_by_run,
        skip_successful_files: config.skip_successful_files,
    }))
}

/// The outcome of the repo-bound (non-`Send`) half of the pipeline: either
/// an already-final empty result, or the raw diff plus enough state to
/// finish the CPU-bound and network-bound halves independently.
enum Prepared {
    Empty(ChangedFiles),
    Ready {
        raw_changes: ChangeSet,
        head_hex: String,
        diagnostics: Vec<Diagnostic>,
    },
}

/// Open the repo, resolve both endpoints, and diff them. Everything here
/// touches `git2::Repository`, which is not `Send`, so this is the only
/// part of the pipeline the async entry point has to push through
/// `spawn_blocking`.
fn prepare_changes(config: &Config, repo_path: &str) -> Result<Prepared, LeChangeError> {
    let handle = RepoHandle::open(repo_path)?;

    let mut diagnostics = Vec::new();
    let base_hex = resolve_endpoint(&handle, &config.base, &mut diagnostics)?;
    let head_hex = resolve_endpoint(&handle, &config.head, &mut diagnostics)?;

    if base_hex == head_hex && config.skip_same_sha {
        return Ok(Prepared::Empty(empty_result_with(Diagnostic::new(
            Diagnostic::SKIPPED_SAME_SHA,
            "base and head resolve to the same revision",
        ))));
    }

    let diff_settings = DiffSettings {
        detect_renames: config.detect_renames,
        rename_threshold: config.rename_threshold,
        include_type_changes: config.include_type_changes,
    };
    let raw_changes = diff::diff(&handle, base_hex.as_str(), head_hex.as_str(), &diff_settings)?;

    Ok(Prepared::Ready {
        raw_changes,
        head_hex: head_hex.to_string(),
        diagnostics,
    })
}

/// Apply the include/exclude pattern matcher to a raw diff. CPU-bound, no
/// suspension point.
fn filter_changes(config: &Config, raw_changes: ChangeSet) -> Result<ChangeSet, LeChangeError> {
    let matcher = compile_matcher(config)?;
    let paths: Vec<String> = raw_changes.iter().map(|c| c.path.clone()).collect();
    let (matched_paths, _) = matcher.partition(&paths);
    let matched_set: BTreeSet<&str> = matched_paths.iter().map(String::as_str).collect();
    Ok(raw_changes
        .into_iter()
        .filter(|c| matched_set.contains(c.path.as_str()))
        .collect())
}

/// Project the filtered changes and assemble the final result. CPU-bound,
/// no suspension point; `correlation` is computed beforehand by whichever
/// entry point is calling this (sync or async).
fn finish(
    config: &Config,
    filtered_changes: ChangeSet,
    diagnostics: Vec<Diagnostic>,
    correlation: Option<correlator::CorrelationResult>,
) -> Result<ChangedFiles, LeChangeError> {
    let groups = compile_groups(config)?;

    let projection_settings = ProjectionSettings {
        dir_names: config.dir_names,
        use_posix_path_separator: config.use_posix_path_separator,
        output_renamed_as_deleted_added: config.output_renamed_as_deleted_added,
    };
    let projection = projector::project(&filtered_changes, &projection_settings, &groups);

    Ok(assemble(
        &projection.changes,
        projection.renamed_files_mapping,
        projection.changed_keys,
        correlation,
        diagnostics,
    ))
}

/// The synchronous entry point: resolve endpoints, diff, filter, optionally
/// correlate with CI outcomes, project, and assemble a `ChangedFiles`.
pub fn get_changed_files(config: &Config, repo_path: &str) -> Result<ChangedFiles, LeChangeError> {
    match prepare_changes(config, repo_path)? {
        Prepared::Empty(result) => Ok(result),
        Prepared::Ready {
            raw_changes,
            head_hex,
            mut diagnostics,
        } => {
            let filtered_changes = filter_changes(config, raw_changes)?;
            let correlation = if config.track_workflow_failures {
                run_correlation(config, &head_hex, &filtered_changes, &mut diagnostics)
            } else {
                None
            };
            finish(config, filtered_changes, diagnostics, correlation)
        }
    }
}

/// Async variant: the same contract, but only the repo-bound half
/// (`prepare_changes`, not `Send`-friendly across `.await`) runs under
/// `tokio::task::spawn_blocking`. Workflow correlation genuinely suspends on
/// `WorkflowClient`'s async HTTP calls instead of blocking a worker thread.
pub async fn get_changed_files_async(
    config: Config,
    repo_path: String,
) -> Result<ChangedFiles, LeChangeError> {
    let prepare_config = config.clone();
    let prepared = tokio::task::spawn_blocking(move || prepare_changes(&prepare_config, &repo_path))
        .await
        .map_err(|e| LeChangeError::Runtime(crate::error::RuntimeError(e.to_string())))??;

    match prepared {
        Prepared::Empty(result) => Ok(result),
        Prepared::Ready {
            raw_changes,
            head_hex,
            mut diagnostics,
        } => {
            let filtered_changes = filter_changes(&config, raw_changes)?;
            let correlation = if config.track_workflow_failures {
                run_correlation_async(&config, &head_hex, &filtered_changes, &mut diagnostics).await
            } else {
                None
            };
            finish(&config, filtered_changes, diagnostics, correlation)
        }
    }
}
