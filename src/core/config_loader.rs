//! Configuration file loader for pin-audit
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::AuditError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".pin-audit.yaml";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Explicit config file; replaces the project config lookup
    pub config_file: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: ConfigOverrides,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field name (e.g., "manifestName")
    pub field: String,

    /// Error message
    pub message: String,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Config file (`--config`, or `<project>/.pin-audit.yaml`)
    /// 4. Default values
    pub fn load(options: ConfigLoadOptions) -> Result<AuditConfig, AuditError> {
        let mut layers: Vec<ConfigOverrides> = Vec::new();

        match &options.config_file {
            Some(path) => match Self::load_config_file(path)? {
                Some(file_config) => layers.push(file_config),
                None => {
                    return Err(AuditError::ConfigError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
            },
            None => {
                let project_config_path = options.project_path.join(CONFIG_FILENAME);
                if let Some(file_config) = Self::load_config_file(&project_config_path)? {
                    layers.push(file_config);
                }
            }
        }

        if let Some(env_config) = Self::load_env_config(&options.env)? {
            layers.push(env_config);
        }

        layers.push(options.cli_args);

        let mut config = AuditConfig::default();
        for layer in layers {
            Self::merge_into(&mut config, layer);
        }

        let errors = Self::validate(&config);
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AuditError::ConfigError(message));
        }

        log::debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Load configuration from YAML file
    fn load_config_file(file_path: &Path) -> Result<Option<ConfigOverrides>, AuditError> {
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(file_path).map_err(|e| {
            AuditError::ConfigError(format!(
                "Failed to read config file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        // An empty file deserializes to null
        if content.trim().is_empty() {
            return Ok(Some(ConfigOverrides::default()));
        }

        let config: ConfigOverrides = serde_yaml::from_str(&content).map_err(|e| {
            AuditError::ConfigError(format!(
                "Failed to parse YAML config {}: {}",
                file_path.display(),
                e
            ))
        })?;

        log::info!("Loaded configuration from {}", file_path.display());
        Ok(Some(config))
    }

    /// Load configuration from environment variables
    fn load_env_config(
        env: &HashMap<String, String>,
    ) -> Result<Option<ConfigOverrides>, AuditError> {
        let mut config = ConfigOverrides::default();

        // PIN_AUDIT_MANIFEST_NAME -> manifestName
        if let Some(name) = env.get("PIN_AUDIT_MANIFEST_NAME") {
            config.manifest_name = Some(name.clone());
        }

        // PIN_AUDIT_FAIL_FAST -> failFast
        if let Some(value) = env.get("PIN_AUDIT_FAIL_FAST") {
            let fail_fast = match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(AuditError::ConfigError(format!(
                        "PIN_AUDIT_FAIL_FAST must be true or false, got '{}'",
                        other
                    )));
                }
            };
            config.fail_fast = Some(fail_fast);
        }

        // PIN_AUDIT_EXCLUDE -> exclude (comma separated)
        if let Some(value) = env.get("PIN_AUDIT_EXCLUDE") {
            let patterns: Vec<String> = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            config.exclude = Some(patterns);
        }

        if config.is_empty() {
            Ok(None)
        } else {
            Ok(Some(config))
        }
    }

    /// Merge source overrides into target
    fn merge_into(target: &mut AuditConfig, source: ConfigOverrides) {
        if let Some(manifest_name) = source.manifest_name {
            target.manifest_name = manifest_name.trim().to_string();
        }
        if let Some(exclude) = source.exclude {
            target.exclude = exclude;
        }
        if let Some(fail_fast) = source.fail_fast {
            target.fail_fast = fail_fast;
        }
        if let Some(follow_links) = source.follow_links {
            target.follow_links = follow_links;
        }
        if let Some(follow_includes) = source.follow_includes {
            target.follow_includes = follow_includes;
        }
    }

    /// Validate a resolved configuration
    pub fn validate(config: &AuditConfig) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        let name = config.manifest_name.trim();
        if name.is_empty() {
            errors.push(ConfigValidationError {
                field: "manifestName".to_string(),
                message: "must not be empty".to_string(),
            });
        } else if name != config.manifest_name {
            errors.push(ConfigValidationError {
                field: "manifestName".to_string(),
                message: format!(
                    "must not have surrounding whitespace: '{}'",
                    config.manifest_name
                ),
            });
        } else if name.contains('/') || name.contains('\\') {
            errors.push(ConfigValidationError {
                field: "manifestName".to_string(),
                message: format!("must be a file name, not a path: '{}'", name),
            });
        }

        if let Err(pattern) = config.exclude_patterns() {
            errors.push(ConfigValidationError {
                field: "exclude".to_string(),
                message: format!("invalid glob pattern: '{}'", pattern),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn options(project_path: &Path) -> ConfigLoadOptions {
        ConfigLoadOptions {
            project_path: project_path.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_defaults_without_sources() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load(options(temp_dir.path())).unwrap();
        assert_eq!(config, AuditConfig::default());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut file = fs::File::create(temp_dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(file, "failFast: false\nexclude: [vendor]").unwrap();

        let config = ConfigLoader::load(options(temp_dir.path())).unwrap();
        assert!(!config.fail_fast);
        assert_eq!(config.exclude, vec!["vendor".to_string()]);
        assert_eq!(config.manifest_name, DEFAULT_MANIFEST_NAME);
    }

    #[test]
    fn test_empty_config_file_is_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::File::create(temp_dir.path().join(CONFIG_FILENAME)).unwrap();

        let config = ConfigLoader::load(options(temp_dir.path())).unwrap();
        assert_eq!(config, AuditConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut file = fs::File::create(temp_dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(file, "failFast: [unterminated").unwrap();

        let err = ConfigLoader::load(options(temp_dir.path())).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_explicit_config_file_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = options(temp_dir.path());
        opts.config_file = Some(temp_dir.path().join("missing.yaml"));

        let err = ConfigLoader::load(opts).unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[test]
    fn test_explicit_config_file_replaces_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut project = fs::File::create(temp_dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(project, "manifestName: project.txt").unwrap();
        let explicit_path = temp_dir.path().join("ci.yaml");
        let mut explicit = fs::File::create(&explicit_path).unwrap();
        writeln!(explicit, "followLinks: true").unwrap();

        let mut opts = options(temp_dir.path());
        opts.config_file = Some(explicit_path);

        let config = ConfigLoader::load(opts).unwrap();
        assert!(config.follow_links);
        assert_eq!(config.manifest_name, DEFAULT_MANIFEST_NAME);
    }

    #[test]
    fn test_priority_cli_over_env_over_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut file = fs::File::create(temp_dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(file, "manifestName: file.txt\nfailFast: true\nexclude: [a]").unwrap();

        let mut opts = options(temp_dir.path());
        opts.env.insert(
            "PIN_AUDIT_MANIFEST_NAME".to_string(),
            "env.txt".to_string(),
        );
        opts.env
            .insert("PIN_AUDIT_FAIL_FAST".to_string(), "false".to_string());
        opts.cli_args.manifest_name = Some("cli.txt".to_string());

        let config = ConfigLoader::load(opts).unwrap();
        assert_eq!(config.manifest_name, "cli.txt");
        assert!(!config.fail_fast);
        assert_eq!(config.exclude, vec!["a".to_string()]);
    }

    #[test]
    fn test_env_exclude_list() {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = options(temp_dir.path());
        opts.env.insert(
            "PIN_AUDIT_EXCLUDE".to_string(),
            "vendor, .venv,,".to_string(),
        );

        let config = ConfigLoader::load(opts).unwrap();
        assert_eq!(
            config.exclude,
            vec!["vendor".to_string(), ".venv".to_string()]
        );
    }

    #[test]
    fn test_env_fail_fast_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = options(temp_dir.path());
        opts.env
            .insert("PIN_AUDIT_FAIL_FAST".to_string(), "maybe".to_string());

        let err = ConfigLoader::load(opts).unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_validate_manifest_name() {
        let config = AuditConfig {
            manifest_name: "sub/requirements.txt".to_string(),
            ..Default::default()
        };
        let errors = ConfigLoader::validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "manifestName");

        let config = AuditConfig {
            manifest_name: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(ConfigLoader::validate(&config).len(), 1);

        let config = AuditConfig {
            manifest_name: "requirements.txt ".to_string(),
            ..Default::default()
        };
        let errors = ConfigLoader::validate(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("whitespace"));
    }

    #[test]
    fn test_manifest_name_is_trimmed_from_every_source() {
        let temp_dir = TempDir::new().unwrap();
        let mut file = fs::File::create(temp_dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(file, "manifestName: ' reqs.in '").unwrap();

        let config = ConfigLoader::load(options(temp_dir.path())).unwrap();
        assert_eq!(config.manifest_name, "reqs.in");

        let mut opts = options(temp_dir.path());
        opts.cli_args.manifest_name = Some("cli.txt\t".to_string());
        let config = ConfigLoader::load(opts).unwrap();
        assert_eq!(config.manifest_name, "cli.txt");
    }

    #[test]
    fn test_validate_exclude_pattern() {
        let config = AuditConfig {
            exclude: vec!["".to_string()],
            ..Default::default()
        };
        let errors = ConfigLoader::validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "exclude");
    }

    #[test]
    fn test_validate_default_is_clean() {
        assert!(ConfigLoader::validate(&AuditConfig::default()).is_empty());
    }
}
