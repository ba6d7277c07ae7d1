//! Detect, classify, and filter changed files between two revisions of a
//! git repository, and optionally correlate those changes with CI workflow
//! run outcomes to produce rebuild/skip file sets.
//!
//! The entry point is [`orchestrator::get_changed_files`] (or its async
//! twin [`orchestrator::get_changed_files_async`]), driven by a [`Config`]
//! built with [`ConfigBuilder`].

pub mod config;
pub mod diff;
pub mod emit;
pub mod error;
pub mod orchestrator;
pub mod pattern;
pub mod pattern_groups;
pub mod path_norm;
pub mod projector;
pub mod recovery;
pub mod repo;
pub mod workflow;

pub use config::{Config, ConfigBuilder};
pub use diff::{ChangeKind, ChangeRecord, ChangeSet};
pub use error::{
    ConfigError, GitError, LeChangeError, PathError, RecoveryError, RuntimeError,
    ShallowCloneError, YamlError,
};
pub use orchestrator::{get_changed_files, get_changed_files_async, ChangedFiles, Diagnostic};
pub use pattern::PatternMatcher;
pub use pattern_groups::{load_yaml_patterns, PatternGroup};
pub use recovery::recover_file;
pub use repo::{RepoHandle, Sha};
pub use workflow::{
    Conclusion, JobScope, RebuildKind, RebuildReason, RunStatus, WorkflowClient, WorkflowJob,
    WorkflowRun,
};
