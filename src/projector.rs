//! Apply output-shaping Config options to a filtered ChangeSet.

use std::collections::BTreeSet;

use crate::diff::{ChangeKind, ChangeRecord, ChangeSet};
use crate::pattern_groups::PatternGroup;

/// Options that shape how a ChangeSet is projected into final paths.
#[derive(Debug, Clone, Default)]
pub struct ProjectionSettings {
    pub dir_names: bool,
    pub use_posix_path_separator: bool,
    pub output_renamed_as_deleted_added: bool,
}

/// The final, typed result of projecting a ChangeSet.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub changes: ChangeSet,
    pub renamed_files_mapping: Vec<(String, String)>,
    pub changed_keys: Vec<String>,
}

/// Apply `settings` to `changes`, then evaluate `groups` against the
/// resulting set to populate `changed_keys` (insertion order preserved,
/// each name appearing once a single hit has been seen).
pub fn project(changes: &ChangeSet, settings: &ProjectionSettings, groups: &[PatternGroup]) -> Projection {
    let mut working = changes.to_vec();
    let mut renamed_files_mapping = Vec::new();

    if settings.output_renamed_as_deleted_added {
        let mut expanded = Vec::with_capacity(working.len());
        for record in working.drain(..) {
            if record.kind == ChangeKind::Renamed {
                if let Some(old) = record.old_path.clone() {
                    renamed_files_mapping.push((old.clone(), record.path.clone()));
                    expanded.push(ChangeRecord {
                        path: old,
                        kind: ChangeKind::Deleted,
                        old_path: None,
                        similarity: None,
                        is_binary: record.is_binary,
                    });
                    expanded.push(ChangeRecord {
                        path: record.path.clone(),
                        kind: ChangeKind::Added,
                        old_path: None,
                        similarity: None,
                        is_binary: record.is_binary,
                    });
                    continue;
                }
            }
            expanded.push(record);
        }
        working = expanded;
    } else {
        for record in &working {
            if record.kind == ChangeKind::Renamed {
                if let Some(old) = &record.old_path {
                    renamed_files_mapping.push((old.clone(), record.path.clone()));
                }
            }
        }
    }

    if settings.use_posix_path_separator {
        for record in &mut working {
            record.path = crate::path_norm::to_posix(&record.path);
            if let Some(old) = &record.old_path {
                record.old_path = Some(crate::path_norm::to_posix(old));
            }
        }
        for (old, new) in &mut renamed_files_mapping {
            *old = crate::path_norm::to_posix(old);
            *new = crate::path_norm::to_posix(new);
        }
    }

    if settings.dir_names {
        let mut seen = BTreeSet::new();
        let mut deduped = Vec::new();
        for record in working.drain(..) {
            let dir = parent_dir(&record.path);
            if seen.insert(dir.clone()) {
                deduped.push(ChangeRecord {
                    path: dir,
                    ..record
                });
            }
        }
        working = deduped;
    }

    let changed_keys = groups
        .iter()
        .filter(|g| working.iter().any(|r| g.matcher.matches(&r.path)))
        .map(|g| g.name.clone())
        .collect();

    Projection {
        changes: working,
        renamed_files_mapping,
        changed_keys,
    }
}

fn parent_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}
