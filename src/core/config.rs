//! Configuration structures and types for pin-audit
//!
//! This module provides type-safe configuration management with serde support.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Manifest file name scanned when nothing else is configured
pub const DEFAULT_MANIFEST_NAME: &str = "requirements.txt";

/// Resolved configuration for one audit run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    /// Exact file name of the manifests to scan
    pub manifest_name: String,

    /// Glob patterns (relative to the root) of paths to skip
    pub exclude: Vec<String>,

    /// Stop at the first finding (default: true)
    pub fail_fast: bool,

    /// Follow symbolic links while walking (default: false)
    pub follow_links: bool,

    /// Follow `-r` / `-c` includes inside manifests (default: true)
    pub follow_includes: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            exclude: Vec::new(),
            fail_fast: true,
            follow_links: false,
            follow_includes: true,
        }
    }
}

impl AuditConfig {
    /// Compile the exclude globs
    ///
    /// Returns the first pattern that fails to compile as the error.
    pub fn exclude_patterns(&self) -> Result<Vec<Regex>, String> {
        self.exclude
            .iter()
            .map(|glob| glob_to_regex(glob).ok_or_else(|| glob.clone()))
            .collect()
    }
}

/// Partial configuration as found in a config file, the environment or CLI
///
/// Every field is optional; set fields override lower-priority layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Schema version (optional, informational)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_links: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_includes: Option<bool>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Converts a glob pattern to a regex matched against `/`-separated paths
///
/// `**` crosses directories, `*` and `?` stay within one path component.
/// The pattern must line up with whole components, so `vendor` matches
/// `vendor/requirements.txt` and `a/vendor/x` but not `vendored/x`.
///
/// # Examples
///
/// ```
/// use pin_audit::core::config::glob_to_regex;
///
/// let regex = glob_to_regex("legacy/*").unwrap();
/// assert!(regex.is_match("app/legacy/requirements.txt"));
/// assert!(!regex.is_match("legacy-app/requirements.txt"));
/// ```
pub fn glob_to_regex(glob: &str) -> Option<Regex> {
    let trimmed = glob.trim().trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let pattern = regex::escape(trimmed)
        .replace(r"\*\*/", "(?:.*/)?")
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", "[^/]");

    Regex::new(&format!("(?:^|/){}(?:/|$)", pattern)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuditConfig::default();
        assert_eq!(config.manifest_name, "requirements.txt");
        assert!(config.exclude.is_empty());
        assert!(config.fail_fast);
        assert!(!config.follow_links);
        assert!(config.follow_includes);
    }

    #[test]
    fn test_overrides_from_yaml() {
        let yaml = r#"
version: "1"
manifestName: reqs.txt
exclude:
  - vendor
failFast: false
"#;
        let overrides: ConfigOverrides = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(overrides.manifest_name.as_deref(), Some("reqs.txt"));
        assert_eq!(overrides.exclude, Some(vec!["vendor".to_string()]));
        assert_eq!(overrides.fail_fast, Some(false));
        assert!(overrides.follow_links.is_none());
    }

    #[test]
    fn test_overrides_reject_unknown_fields() {
        let result: Result<ConfigOverrides, _> = serde_yaml::from_str("colour: blue");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_overrides() {
        assert!(ConfigOverrides::default().is_empty());
        let overrides = ConfigOverrides {
            fail_fast: Some(true),
            ..Default::default()
        };
        assert!(!overrides.is_empty());
    }

    #[test]
    fn test_glob_to_regex_component() {
        let regex = glob_to_regex("vendor").unwrap();
        assert!(regex.is_match("vendor/requirements.txt"));
        assert!(regex.is_match("a/vendor/requirements.txt"));
        assert!(!regex.is_match("vendored/requirements.txt"));
    }

    #[test]
    fn test_glob_to_regex_wildcards() {
        let regex = glob_to_regex("**/build/*").unwrap();
        assert!(regex.is_match("build/requirements.txt"));
        assert!(regex.is_match("x/y/build/requirements.txt"));

        let regex = glob_to_regex("env?").unwrap();
        assert!(regex.is_match("env2/requirements.txt"));
        assert!(!regex.is_match("env/requirements.txt"));
    }

    #[test]
    fn test_glob_to_regex_empty() {
        assert!(glob_to_regex("").is_none());
        assert!(glob_to_regex("/").is_none());
    }

    #[test]
    fn test_exclude_patterns() {
        let config = AuditConfig {
            exclude: vec!["vendor".to_string(), ".venv".to_string()],
            ..Default::default()
        };
        let patterns = config.exclude_patterns().unwrap();
        assert_eq!(patterns.len(), 2);
        assert!(patterns[1].is_match(".venv/lib/requirements.txt"));
        assert!(!patterns[1].is_match("xvenv/requirements.txt"));
    }
}
