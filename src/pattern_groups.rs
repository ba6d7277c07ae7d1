//! Parse a YAML map of named glob lists into named matchers.

use crate::error::{LeChangeError, YamlError};
use crate::pattern::PatternMatcher;

/// A named projection over a change set: `{name, matcher}`.
pub struct PatternGroup {
    pub name: String,
    pub matcher: PatternMatcher,
}

/// Parse YAML text whose top-level shape is `name -> list<pattern>` into an
/// ordered list of named matchers. Source (insertion) order is preserved.
///
/// Malformed YAML or an unexpected shape surfaces as `YamlError`; a single
/// invalid glob within an otherwise well-shaped group surfaces as the
/// `ConfigError` `PatternMatcher::new` already raises for it, unchanged.
pub fn load_yaml_patterns(
    yaml: &str,
    negation_first: bool,
) -> Result<Vec<PatternGroup>, LeChangeError> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(YamlError::from)?;
    let mapping = value
        .as_mapping()
        .ok_or_else(|| YamlError("top-level YAML value must be a mapping".to_string()))?;

    let mut groups = Vec::with_capacity(mapping.len());
    for (key, val) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| YamlError("group name must be a string".to_string()))?
            .to_string();

        let raw_patterns: Vec<String> = val
            .as_sequence()
            .ok_or_else(|| YamlError(format!("group `{name}` must be a list of patterns")))?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| YamlError(format!("group `{name}` has a non-string pattern")))
            })
            .collect::<Result<_, _>>()?;

        let (includes, excludes) = crate::pattern::partition_patterns(&raw_patterns);
        let matcher = PatternMatcher::new(&includes, &excludes, negation_first)?;

        groups.push(PatternGroup { name, matcher });
    }

    Ok(groups)
}
