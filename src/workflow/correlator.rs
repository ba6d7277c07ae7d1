//! Map job outcomes onto changed files, producing rebuild/skip sets.

use std::collections::{BTreeSet, HashSet};

use crate::diff::ChangeSet;

use super::{scope_for_job_name, Conclusion, JobScope, RebuildKind, RebuildReason, WorkflowJob, WorkflowRun};

/// Inputs to a single correlation pass.
pub struct CorrelationInput<'a> {
    pub changes: &'a ChangeSet,
    pub runs: &'a [WorkflowRun],
    pub jobs_by_run: &'a [(i64, Vec<WorkflowJob>)],
    pub skip_successful_files: bool,
}

/// Output of a correlation pass.
#[derive(Debug, Clone, Default)]
pub struct CorrelationResult {
    pub files_to_rebuild: BTreeSet<String>,
    pub files_to_skip: BTreeSet<String>,
    pub rebuild_reasons: Vec<RebuildReason>,
    pub failed_jobs: Vec<String>,
    pub successful_jobs: Vec<String>,
}

fn implicated_files(changes: &ChangeSet, job_name: &str) -> Vec<String> {
    let all_paths: Vec<String> = changes.iter().map(|c| c.path.clone()).collect();
    match scope_for_job_name(job_name) {
        JobScope::All => all_paths,
        JobScope::Prefix(prefixes) => all_paths
            .into_iter()
            .filter(|p| prefixes.iter().any(|prefix| p.starts_with(prefix.as_str())))
            .collect(),
    }
}

/// Run the C8 correlation algorithm: failed-job pass, then (optionally) a
/// success pass, then disjointness enforcement (I1).
pub fn correlate(input: CorrelationInput<'_>) -> CorrelationResult {
    let mut result = CorrelationResult::default();
    let mut failed_job_names = HashSet::new();
    let mut successful_job_names = HashSet::new();

    for (run_id, jobs) in input.jobs_by_run {
        let run_id = *run_id;
        for job in jobs {
            match job.conclusion {
                Some(c) if c.is_failing() => {
                    failed_job_names.insert(job.name.clone());
                    for file in implicated_files(input.changes, &job.name) {
                        result.rebuild_reasons.push(RebuildReason {
                            file: file.clone(),
                            kind: RebuildKind::FailedJob,
                            failed_run_id: run_id,
                            job_name: job.name.clone(),
                        });
                        result.files_to_rebuild.insert(file);
                    }
                }
                Some(Conclusion::Success) => {
                    successful_job_names.insert(job.name.clone());
                    if input.skip_successful_files {
                        for file in implicated_files(input.changes, &job.name) {
                            result.files_to_skip.insert(file);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // I1: rebuild wins over skip.
    for file in &result.files_to_rebuild {
        result.files_to_skip.remove(file);
    }

    result.failed_jobs = failed_job_names.into_iter().collect();
    result.failed_jobs.sort();
    result.successful_jobs = successful_job_names.into_iter().collect();
    result.successful_jobs.sort();

    // Preserve run existence even when there are zero jobs, so callers can
    // still distinguish "no runs found" from "runs found, no jobs failed".
    let _ = input.runs;

    result
}
