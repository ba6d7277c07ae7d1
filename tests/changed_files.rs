//! Black-box coverage of the six end-to-end scenarios the engine promises:
//! empty diff, addition, deletion, rename detection, pattern filtering, and
//! workflow correlation (correlation exercised at the `correlate` level,
//! since it requires a live CI provider at the orchestrator level).

use git2::{IndexAddOption, Repository, Signature};
use tempfile::TempDir;

use lechange::{get_changed_files, ConfigBuilder};

struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path()).expect("init repo");
        {
            let mut cfg = repo.config().expect("config");
            cfg.set_str("user.name", "Tester").unwrap();
            cfg.set_str("user.email", "tester@example.com").unwrap();
        }
        TestRepo { dir, repo }
    }

    fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    fn path_str(&self) -> &str {
        self.dir.path().to_str().unwrap()
    }

    fn write(&self, relative: &str, content: &str) {
        let full = self.path().join(relative);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    fn remove(&self, relative: &str) {
        std::fs::remove_file(self.path().join(relative)).unwrap();
    }

    fn commit(&self, message: &str) -> git2::Oid {
        let mut index = self.repo.index().unwrap();
        index.add_all(["."], IndexAddOption::DEFAULT, None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Tester", "tester@example.com").unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }
}

#[test]
fn scenario_empty_diff_between_identical_revisions() {
    let repo = TestRepo::new();
    repo.write("a.txt", "a");
    repo.commit("c1");

    let config = ConfigBuilder::new("HEAD", "HEAD")
        .skip_same_sha(true)
        .build()
        .unwrap();
    let result = get_changed_files(&config, repo.path_str()).unwrap();

    assert_eq!(result.all_changed_count, 0);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].category, "skipped_same_sha");
}

#[test]
fn scenario_addition() {
    let repo = TestRepo::new();
    repo.write("a.txt", "a");
    repo.commit("c1");
    repo.write("b.txt", "b");
    repo.commit("c2");

    let config = ConfigBuilder::new("HEAD~1", "HEAD").build().unwrap();
    let result = get_changed_files(&config, repo.path_str()).unwrap();

    assert_eq!(result.added, vec!["b.txt".to_string()]);
    assert_eq!(result.all_changed_count, 1);
}

#[test]
fn scenario_deletion() {
    let repo = TestRepo::new();
    repo.write("a.txt", "a");
    repo.write("b.txt", "b");
    repo.commit("c1");
    repo.remove("b.txt");
    repo.commit("c2");

    let config = ConfigBuilder::new("HEAD~1", "HEAD").build().unwrap();
    let result = get_changed_files(&config, repo.path_str()).unwrap();

    assert_eq!(result.deleted, vec!["b.txt".to_string()]);
}

#[test]
fn scenario_rename_detection() {
    let repo = TestRepo::new();
    let content = "line of content repeated many times\n".repeat(20);
    repo.write("old_name.rs", &content);
    repo.commit("c1");
    repo.remove("old_name.rs");
    repo.write("new_name.rs", &content);
    repo.commit("c2");

    let config = ConfigBuilder::new("HEAD~1", "HEAD").build().unwrap();
    let result = get_changed_files(&config, repo.path_str()).unwrap();

    assert_eq!(result.renamed_count, 1);
    assert_eq!(
        result.renamed[0],
        ("old_name.rs".to_string(), "new_name.rs".to_string())
    );
    assert!(result.files_to_rebuild.is_empty());
}

#[test]
fn scenario_pattern_filter_excludes_non_matching_paths() {
    let repo = TestRepo::new();
    repo.write("src/main.rs", "fn main() {}");
    repo.write("README.md", "docs");
    repo.commit("c1");
    repo.write("src/main.rs", "fn main() { println!(); }");
    repo.write("README.md", "more docs");
    repo.commit("c2");

    let config = ConfigBuilder::new("HEAD~1", "HEAD")
        .files(["src/**/*.rs"])
        .build()
        .unwrap();
    let result = get_changed_files(&config, repo.path_str()).unwrap();

    assert_eq!(result.all_changed, vec!["src/main.rs".to_string()]);
}

#[test]
fn scenario_output_renamed_as_deleted_added_splits_the_pair() {
    let repo = TestRepo::new();
    let content = "line of content repeated many times\n".repeat(20);
    repo.write("old_name.rs", &content);
    repo.commit("c1");
    repo.remove("old_name.rs");
    repo.write("new_name.rs", &content);
    repo.commit("c2");

    let config = ConfigBuilder::new("HEAD~1", "HEAD")
        .output_renamed_as_deleted_added(true)
        .build()
        .unwrap();
    let result = get_changed_files(&config, repo.path_str()).unwrap();

    assert_eq!(result.renamed_count, 0);
    assert!(result.deleted.contains(&"old_name.rs".to_string()));
    assert!(result.added.contains(&"new_name.rs".to_string()));
    assert_eq!(
        result.renamed_files_mapping,
        vec![("old_name.rs".to_string(), "new_name.rs".to_string())]
    );
}

#[test]
fn scenario_files_yaml_populates_changed_keys() {
    let repo = TestRepo::new();
    repo.write("src/api/routes.rs", "a");
    repo.commit("c1");
    repo.write("src/api/routes.rs", "a2");
    repo.commit("c2");

    let yaml = "backend:\n  - \"src/api/**\"\nfrontend:\n  - \"src/components/**\"\n";
    let config = ConfigBuilder::new("HEAD~1", "HEAD")
        .files_yaml(yaml)
        .build()
        .unwrap();
    let result = get_changed_files(&config, repo.path_str()).unwrap();

    assert_eq!(result.changed_keys, vec!["backend".to_string()]);
}
