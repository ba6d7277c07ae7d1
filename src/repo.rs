//! Open a repository, resolve revisions, and enumerate shallow-clone boundaries.

use std::path::Path;

use git2::Repository;

use crate::error::{GitError, PathError, ShallowCloneError};

/// A 40-char lowercase hex object id, resolved from a symbolic or literal revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha(String);

impl Sha {
    fn from_oid(oid: git2::Oid) -> Self {
        Sha(oid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opened repository with revision resolution and shallow-boundary checks.
pub struct RepoHandle {
    repo: Repository,
    shallow: bool,
}

impl RepoHandle {
    /// Open the repository at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PathError> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .map_err(|e| PathError(format!("{} is not a git repository: {e}", path.display())))?;
        let shallow = repo.is_shallow();
        Ok(RepoHandle { repo, shallow })
    }

    pub fn is_shallow(&self) -> bool {
        self.shallow
    }

    pub(crate) fn git_repo(&self) -> &Repository {
        &self.repo
    }

    /// Resolve a revision (hex object id or symbolic ref) to a `Sha`.
    pub fn resolve(&self, rev: &str) -> Result<Sha, GitError> {
        let object = self
            .repo
            .revparse_single(rev)
            .map_err(|e| GitError(format!("cannot resolve revision `{rev}`: {}", e.message())))?;
        let commit = object
            .peel_to_commit()
            .map_err(|e| GitError(format!("revision `{rev}` is not a commit: {}", e.message())))?;

        if self.shallow && self.repo.find_commit(commit.id()).is_err() {
            return Err(GitError(format!(
                "revision `{rev}` could not be peeled within the shallow clone"
            )));
        }

        Ok(Sha::from_oid(commit.id()))
    }

    /// Resolve `rev`, raising `ShallowCloneError` instead of `GitError` when
    /// the clone is shallow and the revision cannot be reached.
    pub fn resolve_checked(&self, rev: &str) -> Result<Sha, ResolveError> {
        match self.resolve(rev) {
            Ok(sha) => Ok(sha),
            Err(e) => {
                if self.shallow {
                    Err(ResolveError::ShallowClone(ShallowCloneError {
                        missing_endpoint: rev.to_string(),
                    }))
                } else {
                    Err(ResolveError::Git(e))
                }
            }
        }
    }

    /// The set of commit ids at which history truncates, for a shallow clone.
    pub fn shallow_boundary(&self) -> Result<std::collections::HashSet<String>, GitError> {
        let mut boundary = std::collections::HashSet::new();
        if !self.shallow {
            return Ok(boundary);
        }

        let mut walk = self.repo.revwalk()?;
        walk.push_head()?;
        for oid in walk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;
            if commit.parent_ids().count() == 0 {
                boundary.insert(oid.to_string());
            }
        }
        Ok(boundary)
    }
}

#[derive(Debug, Clone)]
pub enum ResolveError {
    Git(GitError),
    ShallowClone(ShallowCloneError),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Git(e) => write!(f, "{e}"),
            ResolveError::ShallowClone(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ResolveError {}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Signature};
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path()).expect("init repo");
        {
            let mut cfg = repo.config().expect("config");
            cfg.set_str("user.name", "Tester").unwrap();
            cfg.set_str("user.email", "tester@example.com").unwrap();
        }
        (dir, repo)
    }

    fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
        let mut index = repo.index().unwrap();
        index.add_all(["."], IndexAddOption::DEFAULT, None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Tester", "tester@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn open_fails_on_missing_path() {
        let result = RepoHandle::open("/nonexistent/path/xyz");
        assert!(result.is_err());
    }

    #[test]
    fn open_succeeds_on_a_real_repo() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("init.txt"), "init").unwrap();
        commit_all(&repo, "initial commit");

        let handle = RepoHandle::open(dir.path()).unwrap();
        assert!(!handle.is_shallow());
    }

    #[test]
    fn resolve_maps_head_to_a_hex_sha() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("init.txt"), "init").unwrap();
        let oid = commit_all(&repo, "initial commit");

        let handle = RepoHandle::open(dir.path()).unwrap();
        let sha = handle.resolve("HEAD").unwrap();
        assert_eq!(sha.as_str(), oid.to_string());
        assert_eq!(sha.as_str().len(), 40);
    }

    #[test]
    fn resolve_rejects_unknown_revision() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("init.txt"), "init").unwrap();
        commit_all(&repo, "initial commit");

        let handle = RepoHandle::open(dir.path()).unwrap();
        assert!(handle.resolve("not-a-revision").is_err());
    }

    #[test]
    fn shallow_boundary_empty_for_a_full_clone() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("init.txt"), "init").unwrap();
        commit_all(&repo, "initial commit");

        let handle = RepoHandle::open(dir.path()).unwrap();
        assert!(handle.shallow_boundary().unwrap().is_empty());
    }

    #[test]
    fn resolve_checked_rejects_a_revision_beyond_the_shallow_boundary() {
        let (source_dir, source_repo) = init_repo();
        fs::write(source_dir.path().join("a.txt"), "a").unwrap();
        let first = commit_all(&source_repo, "c1");
        fs::write(source_dir.path().join("a.txt"), "a2").unwrap();
        commit_all(&source_repo, "c2");

        let clone_dir = TempDir::new().expect("tempdir");
        let mut fetch_opts = git2::FetchOptions::new();
        fetch_opts.depth(1);
        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        builder
            .clone(
                source_dir.path().to_str().unwrap(),
                clone_dir.path(),
            )
            .expect("shallow clone");

        let handle = RepoHandle::open(clone_dir.path()).unwrap();
        assert!(handle.is_shallow());

        let result = handle.resolve_checked(&first.to_string());
        assert!(matches!(result, Err(ResolveError::ShallowClone(_))));
    }
}
