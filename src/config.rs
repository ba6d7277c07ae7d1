//! Per-call configuration: the full option surface from the external interface.

use crate::error::ConfigError;

/// Immutable configuration for one `get_changed_files` call.
#[derive(Debug, Clone)]
pub struct Config {
    pub base: String,
    pub head: String,
    pub files: Vec<String>,
    pub files_ignore: Vec<String>,
    pub files_yaml: Option<String>,
    pub negation_first: bool,
    pub json: bool,
    pub dir_names: bool,
    pub use_posix_path_separator: bool,
    pub output_renamed_as_deleted_added: bool,
    pub skip_same_sha: bool,
    pub token: Option<String>,
    pub repository: Option<String>,
    pub track_workflow_failures: bool,
    pub skip_successful_files: bool,
    pub wait_for_active_workflows: bool,
    pub workflow_max_wait_seconds: u64,
    pub workflow_name_filter: Option<String>,
    pub detect_renames: bool,
    pub rename_threshold: u16,
    pub include_type_changes: bool,
}

/// Builds a `Config`, validating option combinations at `build()`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    base: Option<String>,
    head: Option<String>,
    files: Vec<String>,
    files_ignore: Vec<String>,
    files_yaml: Option<String>,
    negation_first: bool,
    json: bool,
    dir_names: bool,
    use_posix_path_separator: bool,
    output_renamed_as_deleted_added: bool,
    skip_same_sha: bool,
    token: Option<String>,
    repository: Option<String>,
    track_workflow_failures: bool,
    skip_successful_files: bool,
    wait_for_active_workflows: bool,
    workflow_max_wait_seconds: Option<u64>,
    workflow_name_filter: Option<String>,
    detect_renames: bool,
    rename_threshold: Option<u16>,
    include_type_changes: bool,
}

impl ConfigBuilder {
    pub fn new(base: impl Into<String>, head: impl Into<String>) -> Self {
        ConfigBuilder {
            base: Some(base.into()),
            head: Some(head.into()),
            detect_renames: true,
            include_type_changes: true,
            ..Default::default()
        }
    }

    pub fn files(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.files = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn files_ignore(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.files_ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn files_yaml(mut self, yaml: impl Into<String>) -> Self {
        self.files_yaml = Some(yaml.into());
        self
    }

    pub fn negation_first(mut self, value: bool) -> Self {
        self.negation_first = value;
        self
    }

    pub fn json(mut self, value: bool) -> Self {
        self.json = value;
        self
    }

    pub fn dir_names(mut self, value: bool) -> Self {
        self.dir_names = value;
        self
    }

    pub fn use_posix_path_separator(mut self, value: bool) -> Self {
        self.use_posix_path_separator = value;
        self
    }

    pub fn output_renamed_as_deleted_added(mut self, value: bool) -> Self {
        self.output_renamed_as_deleted_added = value;
        self
    }

    pub fn skip_same_sha(mut self, value: bool) -> Self {
        self.skip_same_sha = value;
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn track_workflow_failures(mut self, value: bool) -> Self {
        self.track_workflow_failures = value;
        self
    }

    pub fn skip_successful_files(mut self, value: bool) -> Self {
        self.skip_successful_files = value;
        self
    }

    pub fn wait_for_active_workflows(mut self, value: bool) -> Self {
        self.wait_for_active_workflows = value;
        self
    }

    pub fn workflow_max_wait_seconds(mut self, value: u64) -> Self {
        self.workflow_max_wait_seconds = Some(value);
        self
    }

    pub fn workflow_name_filter(mut self, filter: impl Into<String>) -> Self {
        self.workflow_name_filter = Some(filter.into());
        self
    }

    pub fn detect_renames(mut self, value: bool) -> Self {
        self.detect_renames = value;
        self
    }

    pub fn rename_threshold(mut self, value: u16) -> Self {
        self.rename_threshold = Some(value);
        self
    }

    pub fn include_type_changes(mut self, value: bool) -> Self {
        self.include_type_changes = value;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let base = self
            .base
            .ok_or_else(|| ConfigError("Config requires a `base` revision".into()))?;
        let head = self
            .head
            .ok_or_else(|| ConfigError("Config requires a `head` revision".into()))?;

        let rename_threshold = self.rename_threshold.unwrap_or(50);
        if rename_threshold > 100 {
            return Err(ConfigError(format!(
                "rename_threshold must be within 0..=100, got {rename_threshold}"
            )));
        }

        if self.skip_successful_files && !self.track_workflow_failures {
            return Err(ConfigError(
                "skip_successful_files requires track_workflow_failures".into(),
            ));
        }
        if self.wait_for_active_workflows && !self.track_workflow_failures {
            return Err(ConfigError(
                "wait_for_active_workflows requires track_workflow_failures".into(),
            ));
        }

        Ok(Config {
            base,
            head,
            files: self.files,
            files_ignore: self.files_ignore,
            files_yaml: self.files_yaml,
            negation_first: self.negation_first,
            json: self.json,
            dir_names: self.dir_names,
            use_posix_path_separator: self.use_posix_path_separator,
            output_renamed_as_deleted_added: self.output_renamed_as_deleted_added,
            skip_same_sha: self.skip_same_sha,
            token: self.token,
            repository: self.repository,
            track_workflow_failures: self.track_workflow_failures,
            skip_successful_files: self.skip_successful_files,
            wait_for_active_workflows: self.wait_for_active_workflows,
            workflow_max_wait_seconds: self.workflow_max_wait_seconds.unwrap_or(300),
            workflow_name_filter: self.workflow_name_filter,
            detect_renames: self.detect_renames,
            rename_threshold,
            include_type_changes: self.include_type_changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_builds_with_defaults() {
        let config = ConfigBuilder::new("main", "HEAD").build().unwrap();
        assert_eq!(config.base, "main");
        assert_eq!(config.head, "HEAD");
        assert_eq!(config.rename_threshold, 50);
        assert_eq!(config.workflow_max_wait_seconds, 300);
        assert!(!config.track_workflow_failures);
    }

    #[test]
    fn rename_threshold_over_100_is_rejected() {
        let result = ConfigBuilder::new("main", "HEAD")
            .rename_threshold(150)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn skip_successful_files_requires_tracking() {
        let result = ConfigBuilder::new("main", "HEAD")
            .skip_successful_files(true)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn skip_successful_files_is_accepted_alongside_tracking() {
        let result = ConfigBuilder::new("main", "HEAD")
            .track_workflow_failures(true)
            .skip_successful_files(true)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn wait_for_active_workflows_requires_tracking() {
        let result = ConfigBuilder::new("main", "HEAD")
            .wait_for_active_workflows(true)
            .build();
        assert!(result.is_err());
    }
}
