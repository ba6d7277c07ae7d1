//! Recover a file's contents at a given revision onto disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RecoveryError;
use crate::repo::RepoHandle;

/// Write the blob for `repo_rel_path` as it existed at `rev_hex` into
/// `output_dir`, preserving the path's directory structure, and return the
/// path written.
pub fn recover_file(
    handle: &RepoHandle,
    rev_hex: &str,
    repo_rel_path: &str,
    output_dir: &Path,
) -> Result<PathBuf, RecoveryError> {
    let repo = handle.git_repo();
    let commit = repo
        .revparse_single(rev_hex)
        .map_err(|e| RecoveryError(format!("cannot resolve `{rev_hex}`: {}", e.message())))?
        .peel_to_commit()
        .map_err(|e| RecoveryError(format!("`{rev_hex}` is not a commit: {}", e.message())))?;
    let tree = commit.tree()?;

    let normalized = crate::path_norm::to_posix(repo_rel_path);
    let entry = tree.get_path(Path::new(&normalized)).map_err(|_| {
        RecoveryError(format!(
            "`{normalized}` does not exist in tree at `{rev_hex}`"
        ))
    })?;
    let object = entry.to_object(repo)?;
    let blob = object
        .as_blob()
        .ok_or_else(|| RecoveryError(format!("`{normalized}` is not a blob at `{rev_hex}`")))?;

    let dest = output_dir.join(&normalized);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&dest, blob.content())?;

    Ok(dest)
}
