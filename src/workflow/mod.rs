//! CI-provider queries and correlation of job outcomes with changed files.

pub mod client;
pub mod correlator;

pub use client::WorkflowClient;
pub use correlator::{correlate, CorrelationInput};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run- and job-level outcome, as reported by the CI provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    TimedOut,
}

impl Conclusion {
    pub fn is_failing(self) -> bool {
        matches!(
            self,
            Conclusion::Failure | Conclusion::Cancelled | Conclusion::TimedOut
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: i64,
    pub name: String,
    pub head_sha: String,
    pub conclusion: Option<Conclusion>,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub conclusion: Option<Conclusion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: i64,
    pub run_id: i64,
    pub name: String,
    pub conclusion: Option<Conclusion>,
    pub status: RunStatus,
    pub steps: Vec<Step>,
}

/// Why a file landed in `files_to_rebuild`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildKind {
    FailedJob,
    NewFailure,
    Inherited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReason {
    pub file: String,
    pub kind: RebuildKind,
    pub failed_run_id: i64,
    pub job_name: String,
}

/// The scope of files a job's outcome is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobScope {
    /// The job implicates every changed file.
    All,
    /// The job implicates only changed files under one of these prefixes,
    /// derived from the job/workflow name (see `scope_for_job_name`).
    Prefix(Vec<String>),
}

/// Heuristic mapping from a job/workflow name to the file prefixes it owns.
///
/// No CI provider exposes an explicit job-to-path mapping, so this engine
/// infers scope from naming convention: a name containing `frontend` or
/// `ui` implicates `src/components` and `src/pages`; `backend` or `api`
/// implicates `src/api`; anything else implicates the whole change set.
/// This default list is intentionally small and conservative — callers
/// relying on project-specific scoping should filter `files_to_rebuild`
/// themselves using the returned `job_name`.
pub fn scope_for_job_name(job_name: &str) -> JobScope {
    let lower = job_name.to_lowercase();
    if lower.contains("frontend") || lower.contains("ui") {
        JobScope::Prefix(vec!["src/components".to_string(), "src/pages".to_string()])
    } else if lower.contains("backend") || lower.contains("api") {
        JobScope::Prefix(vec!["src/api".to_string()])
    } else {
        JobScope::All
    }
}
