//! Compile gitignore-style glob lists into a deterministic matcher.
//!
//! Built on `ignore::gitignore`, which already implements the documented
//! glob subset (`*`, `**`, `?`, `[...]`, anchors, trailing `/`). The crate's
//! own whitelist precedence isn't reused directly because `negation_first`
//! needs exclude-always-wins semantics that cuts across ordering.

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::ConfigError;

/// Split a raw pattern list into (includes, excludes), moving any entry with
/// a leading `!` into the opposite bucket.
pub fn partition_patterns(raw: &[String]) -> (Vec<String>, Vec<String>) {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    for entry in raw {
        if let Some(stripped) = entry.strip_prefix('!') {
            excludes.push(stripped.to_string());
        } else {
            includes.push(entry.clone());
        }
    }
    (includes, excludes)
}

fn build_set(patterns: &[String]) -> Result<Gitignore, ConfigError> {
    let mut builder = GitignoreBuilder::new(".");
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|e| ConfigError(format!("invalid pattern `{pattern}`: {e}")))?;
    }
    builder.build().map_err(ConfigError::from)
}

#[derive(Debug, Clone)]
pub struct PatternMatcher {
    include_empty: bool,
    include_set: Gitignore,
    exclude_set: Gitignore,
    negation_first: bool,
}

impl PatternMatcher {
    pub fn new(
        includes: &[String],
        excludes: &[String],
        negation_first: bool,
    ) -> Result<Self, ConfigError> {
        let (mut final_includes, mut extra_excludes) = partition_patterns(includes);
        let (extra_includes, mut final_excludes) = partition_patterns(excludes);
        final_includes.extend(extra_includes);
        final_excludes.append(&mut extra_excludes);

        Ok(PatternMatcher {
            include_empty: final_includes.is_empty(),
            include_set: build_set(&final_includes)?,
            exclude_set: build_set(&final_excludes)?,
            negation_first,
        })
    }

    pub fn empty() -> Self {
        PatternMatcher {
            include_empty: true,
            include_set: build_set(&[]).expect("empty pattern list always compiles"),
            exclude_set: build_set(&[]).expect("empty pattern list always compiles"),
            negation_first: false,
        }
    }

    fn include_hit(&self, path: &str) -> bool {
        self.include_set.matched(path, false).is_ignore()
    }

    fn exclude_hit(&self, path: &str) -> bool {
        self.exclude_set.matched(path, false).is_ignore()
    }

    /// Whether `path` matches under this matcher's polarity rules.
    pub fn matches(&self, path: &str) -> bool {
        if self.negation_first {
            if self.exclude_hit(path) {
                return false;
            }
            return self.include_empty || self.include_hit(path);
        }

        // Last matching rule wins; excludes are considered after includes
        // since PatternMatcher is built from an includes-then-excludes
        // ordering (see `new`).
        if self.exclude_hit(path) {
            return false;
        }
        if self.include_hit(path) {
            return true;
        }
        self.include_empty
    }

    /// Order-preserving filter of `paths` to those that match.
    pub fn filter(&self, paths: &[String]) -> Vec<String> {
        paths
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect()
    }

    /// Split `paths` into (matched, unmatched), preserving input order.
    pub fn partition(&self, paths: &[String]) -> (Vec<String>, Vec<String>) {
        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for path in paths {
            if self.matches(path) {
                matched.push(path.clone());
            } else {
                unmatched.push(path.clone());
            }
        }
        (matched, unmatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_matcher_has_no_patterns() {
        let m = PatternMatcher::empty();
        assert!(m.matches("src/main.py"));
    }

    #[test]
    fn includes_restrict_matches() {
        let m = PatternMatcher::new(&strs(&["**/*.py"]), &[], false).unwrap();
        assert!(m.matches("src/main.py"));
        assert!(!m.matches("src/main.rs"));
    }

    #[test]
    fn excludes_narrow_an_empty_include_list() {
        let m = PatternMatcher::new(&[], &strs(&["**/test_*"]), false).unwrap();
        assert!(!m.matches("tests/test_main.py"));
        assert!(m.matches("src/main.py"));
    }

    #[test]
    fn includes_and_excludes_combine() {
        let m = PatternMatcher::new(&strs(&["**/*.py"]), &strs(&["**/test_*"]), false).unwrap();
        assert!(m.matches("src/main.py"));
        assert!(!m.matches("tests/test_main.py"));
    }

    #[test]
    fn negation_first_checks_excludes_before_includes() {
        let m = PatternMatcher::new(&strs(&["**/*.py"]), &strs(&["**/test_*"]), true).unwrap();
        assert!(m.matches("src/main.py"));
        assert!(!m.matches("tests/test_main.py"));
    }

    #[test]
    fn invalid_pattern_raises_config_error() {
        let result = PatternMatcher::new(&strs(&["[invalid"]), &[], false);
        assert!(result.is_err());
    }

    #[test]
    fn nested_path_globs() {
        let m = PatternMatcher::new(&strs(&["src/**/*.ts"]), &[], false).unwrap();
        assert!(m.matches("src/api/routes.ts"));
        assert!(m.matches("src/components/deep/nested/file.ts"));
        assert!(!m.matches("tests/test.ts"));
    }

    #[test]
    fn extension_patterns_are_exact() {
        let m = PatternMatcher::new(&strs(&["**/*.tsx"]), &[], false).unwrap();
        assert!(m.matches("src/components/Button.tsx"));
        assert!(!m.matches("src/components/Button.ts"));
    }

    #[test]
    fn filter_preserves_order() {
        let m = PatternMatcher::new(&strs(&["**/*.py"]), &[], false).unwrap();
        let result = m.filter(&strs(&["a.py", "b.rs", "c.py"]));
        assert_eq!(result, strs(&["a.py", "c.py"]));
    }

    #[test]
    fn filter_of_empty_input_is_empty() {
        let m = PatternMatcher::new(&strs(&["**/*.py"]), &[], false).unwrap();
        assert_eq!(m.filter(&[]), Vec::<String>::new());
    }

    #[test]
    fn partition_splits_matched_and_unmatched_in_order() {
        let m = PatternMatcher::new(&strs(&["**/*.py"]), &[], false).unwrap();
        let (matched, unmatched) = m.partition(&strs(&["a.py", "b.rs", "c.py"]));
        assert_eq!(matched, strs(&["a.py", "c.py"]));
        assert_eq!(unmatched, strs(&["b.rs"]));
    }

    #[test]
    fn partition_everything_matches() {
        let m = PatternMatcher::new(&strs(&["**/*.py"]), &[], false).unwrap();
        let (matched, unmatched) = m.partition(&strs(&["a.py", "b.py"]));
        assert_eq!(matched, strs(&["a.py", "b.py"]));
        assert!(unmatched.is_empty());
    }

    #[test]
    fn partition_nothing_matches() {
        let m = PatternMatcher::new(&strs(&["**/*.py"]), &[], false).unwrap();
        let (matched, unmatched) = m.partition(&strs(&["a.rs", "b.go"]));
        assert!(matched.is_empty());
        assert_eq!(unmatched, strs(&["a.rs", "b.go"]));
    }

    #[test]
    fn leading_bang_in_includes_moves_entry_to_excludes() {
        let m = PatternMatcher::new(
            &strs(&["src/components/**", "!src/components/test/**"]),
            &[],
            true,
        )
        .unwrap();
        assert!(m.matches("src/components/Button.tsx"));
        assert!(!m.matches("src/components/test/Button.test.tsx"));
    }
}
