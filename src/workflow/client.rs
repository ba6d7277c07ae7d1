//! Query the CI provider for workflow runs and jobs, with bounded polling.

use std::thread;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::error::{ConfigError, RuntimeError};

use super::{Conclusion, RunStatus, WorkflowJob, WorkflowRun};

const MAX_BACKOFF: Duration = Duration::from_secs(8);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Credentials and repository identity for talking to the CI provider.
#[derive(Debug, Clone)]
pub struct WorkflowClient {
    repository: String,
    token: String,
    base_url: String,
}

impl WorkflowClient {
    /// Build a client from explicit `token`/`repository`, falling back to
    /// `CI_TOKEN`/`CI_REPOSITORY` when either is absent. Returns a
    /// `ConfigError` (callers downgrade this to a `token_missing`
    /// diagnostic) when neither source yields a value.
    pub fn from_config(
        token: Option<&str>,
        repository: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let token = token
            .map(str::to_string)
            .or_else(|| std::env::var("CI_TOKEN").ok())
            .ok_or_else(|| ConfigError("no CI token supplied or available in CI_TOKEN".into()))?;
        let repository = repository
            .map(str::to_string)
            .or_else(|| std::env::var("CI_REPOSITORY").ok())
            .ok_or_else(|| {
                ConfigError("no repository identifier supplied or available in CI_REPOSITORY".into())
            })?;

        Ok(WorkflowClient {
            repository,
            token,
            base_url: "https://api.github.com".to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, RuntimeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("lechange"));
        let bearer = format!("Bearer {}", self.token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer).map_err(|e| RuntimeError(e.to_string()))?,
        );
        Ok(headers)
    }

    fn runs_url(&self, head_sha: &str) -> String {
        format!(
            "{}/repos/{}/actions/runs?head_sha={head_sha}",
            self.base_url, self.repository
        )
    }

    fn jobs_url(&self, run_id: i64) -> String {
        format!(
            "{}/repos/{}/actions/runs/{run_id}/jobs",
            self.base_url, self.repository
        )
    }

    /// List runs reachable by `head_sha`, optionally filtered to workflow
    /// names containing `name_filter` as a substring.
    pub fn list_runs(
        &self,
        head_sha: &str,
        name_filter: Option<&str>,
    ) -> Result<Vec<WorkflowRun>, RuntimeError> {
        let client = reqwest::blocking::Client::builder()
            .default_headers(self.headers()?)
            .build()?;

        let payload = request_with_retry(|| client.get(self.runs_url(head_sha)).send())?;
        let envelope: RunsEnvelope = payload.json().map_err(RuntimeError::from)?;

        let mut runs: Vec<WorkflowRun> = envelope.workflow_runs.into_iter().map(Into::into).collect();
        if let Some(filter) = name_filter {
            runs.retain(|r| r.name.contains(filter));
        }
        Ok(runs)
    }

    pub fn list_jobs(&self, run_id: i64) -> Result<Vec<WorkflowJob>, RuntimeError> {
        let client = reqwest::blocking::Client::builder()
            .default_headers(self.headers()?)
            .build()?;

        let payload = request_with_retry(|| client.get(self.jobs_url(run_id)).send())?;
        let envelope: JobsEnvelope = payload.json().map_err(RuntimeError::from)?;
        Ok(envelope.jobs.into_iter().map(Into::into).collect())
    }

    /// Poll `runs` until every one reaches `Completed` or `max_wait` elapses.
    /// Returns `(completed, still_running)`.
    pub fn wait_active(
        &self,
        runs: Vec<WorkflowRun>,
        max_wait: Duration,
    ) -> Result<(Vec<WorkflowRun>, Vec<WorkflowRun>), RuntimeError> {
        let deadline = Instant::now() + max_wait;
        let mut backoff = INITIAL_BACKOFF;
        let mut pending = runs;
        let mut completed = Vec::new();

        loop {
            let (done, still): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|r| r.status == RunStatus::Completed);
            completed.extend(done);
            pending = still;

            if pending.is_empty() || Instant::now() >= deadline {
                return Ok((completed, pending));
            }

            thread::sleep(backoff.min(deadline.saturating_duration_since(Instant::now())));
            backoff = (backoff * 2).min(MAX_BACKOFF);

            let mut refreshed = Vec::with_capacity(pending.len());
            for run in &pending {
                refreshed.extend(self.list_runs(&run.head_sha, None)?);
            }
            pending = refreshed;
        }
    }

    /// Async counterparts of `list_runs`/`list_jobs`, sharing request shape.
    pub async fn list_runs_async(
        &self,
        head_sha: &str,
        name_filter: Option<&str>,
    ) -> Result<Vec<WorkflowRun>, RuntimeError> {
        let client = reqwest::Client::builder()
            .default_headers(self.headers()?)
            .build()?;
        let response =
            request_with_retry_async(|| client.get(self.runs_url(head_sha)).send()).await?;
        let envelope: RunsEnvelope = response.json().await?;
        let mut runs: Vec<WorkflowRun> = envelope.workflow_runs.into_iter().map(Into::into).collect();
        if let Some(filter) = name_filter {
            runs.retain(|r| r.name.contains(filter));
        }
        Ok(runs)
    }

    pub async fn list_jobs_async(&self, run_id: i64) -> Result<Vec<WorkflowJob>, RuntimeError> {
        let client = reqwest::Client::builder()
            .default_headers(self.headers()?)
            .build()?;
        let response = request_with_retry_async(|| client.get(self.jobs_url(run_id)).send()).await?;
        let envelope: JobsEnvelope = response.json().await?;
        Ok(envelope.jobs.into_iter().map(Into::into).collect())
    }

    /// Async counterpart of `wait_active`, suspending on `tokio::time::sleep`
    /// between polls instead of blocking the worker thread.
    pub async fn wait_active_async(
        &self,
        runs: Vec<WorkflowRun>,
        max_wait: Duration,
    ) -> Result<(Vec<WorkflowRun>, Vec<WorkflowRun>), RuntimeError> {
        let deadline = Instant::now() + max_wait;
        let mut backoff = INITIAL_BACKOFF;
        let mut pending = runs;
        let mut completed = Vec::new();

        loop {
            let (done, still): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|r| r.status == RunStatus::Completed);
            completed.extend(done);
            pending = still;

            if pending.is_empty() || Instant::now() >= deadline {
                return Ok((completed, pending));
            }

            tokio::time::sleep(backoff.min(deadline.saturating_duration_since(Instant::now()))).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);

            let mut refreshed = Vec::with_capacity(pending.len());
            for run in &pending {
                refreshed.extend(self.list_runs_async(&run.head_sha, None).await?);
            }
            pending = refreshed;
        }
    }
}

fn request_with_retry<F>(mut send: F) -> Result<reqwest::blocking::Response, RuntimeError>
where
    F: FnMut() -> Result<reqwest::blocking::Response, reqwest::Error>,
{
    let mut backoff = INITIAL_BACKOFF;
    loop {
        let response = send()?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(backoff);
            thread::sleep(retry_after);
            backoff = (backoff * 2).min(MAX_BACKOFF);
            continue;
        }
        if !response.status().is_success() {
            return Err(RuntimeError(format!(
                "CI provider request failed: {}",
                response.status()
            )));
        }
        return Ok(response);
    }
}

async fn request_with_retry_async<F, Fut>(mut send: F) -> Result<reqwest::Response, RuntimeError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut backoff = INITIAL_BACKOFF;
    loop {
        let response = send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(backoff);
            tokio::time::sleep(retry_after).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
            continue;
        }
        if !response.status().is_success() {
            return Err(RuntimeError(format!(
                "CI provider request failed: {}",
                response.status()
            )));
        }
        return Ok(response);
    }
}

#[derive(Deserialize)]
struct RunsEnvelope {
    workflow_runs: Vec<RawRun>,
}

#[derive(Deserialize)]
struct JobsEnvelope {
    jobs: Vec<RawJob>,
}

#[derive(Deserialize)]
struct RawRun {
    id: i64,
    name: String,
    head_sha: String,
    conclusion: Option<String>,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<RawRun> for WorkflowRun {
    fn from(raw: RawRun) -> Self {
        WorkflowRun {
            id: raw.id,
            name: raw.name,
            head_sha: raw.head_sha,
            conclusion: raw.conclusion.as_deref().and_then(parse_conclusion),
            status: parse_status(&raw.status),
            created_at: raw.created_at,
        }
    }
}

#[derive(Deserialize)]
struct RawJob {
    id: i64,
    run_id: i64,
    name: String,
    conclusion: Option<String>,
    status: String,
    steps: Vec<RawStep>,
}

#[derive(Deserialize)]
struct RawStep {
    name: String,
    conclusion: Option<String>,
}

impl From<RawJob> for WorkflowJob {
    fn from(raw: RawJob) -> Self {
        WorkflowJob {
            id: raw.id,
            run_id: raw.run_id,
            name: raw.name,
            conclusion: raw.conclusion.as_deref().and_then(parse_conclusion),
            status: parse_status(&raw.status),
            steps: raw
                .steps
                .into_iter()
                .map(|s| super::Step {
                    name: s.name,
                    conclusion: s.conclusion.as_deref().and_then(parse_conclusion),
                })
                .collect(),
        }
    }
}

fn parse_conclusion(value: &str) -> Option<Conclusion> {
    match value {
        "success" => Some(Conclusion::Success),
        "failure" => Some(Conclusion::Failure),
        "cancelled" => Some(Conclusion::Cancelled),
        "timed_out" => Some(Conclusion::TimedOut),
        _ => None,
    }
}

fn parse_status(value: &str) -> RunStatus {
    match value {
        "queued" => RunStatus::Queued,
        "in_progress" => RunStatus::InProgress,
        _ => RunStatus::Completed,
    }
}
