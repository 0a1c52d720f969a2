//! Manifest discovery
//!
//! Walks a directory tree and collects every file whose name exactly matches
//! the configured manifest name, in a deterministic order.

use crate::core::config::AuditConfig;
use crate::core::error::AuditError;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Finds manifest files below a root directory
///
/// # Examples
///
/// ```no_run
/// use pin_audit::core::config::AuditConfig;
/// use pin_audit::validation::ManifestDiscovery;
/// use std::path::Path;
///
/// let discovery = ManifestDiscovery::new(&AuditConfig::default()).unwrap();
/// for path in discovery.discover(Path::new(".")).unwrap() {
///     println!("{}", path.display());
/// }
/// ```
pub struct ManifestDiscovery {
    manifest_name: String,
    follow_links: bool,
    ignore_patterns: Vec<Regex>,
}

impl ManifestDiscovery {
    /// Create a discovery for the manifest name and excludes in `config`
    pub fn new(config: &AuditConfig) -> Result<Self, AuditError> {
        let ignore_patterns = config.exclude_patterns().map_err(|pattern| {
            AuditError::ConfigError(format!("invalid glob pattern: '{}'", pattern))
        })?;

        Ok(Self {
            manifest_name: config.manifest_name.clone(),
            follow_links: config.follow_links,
            ignore_patterns,
        })
    }

    /// Collect manifest paths below `root`
    ///
    /// Hidden directories are included. Entries are sorted by file name
    /// within each directory, so repeated runs see the same order.
    /// Unreadable entries are logged and skipped.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, AuditError> {
        if !root.is_dir() {
            return Err(AuditError::InvalidRoot {
                path: root.to_path_buf(),
            });
        }

        let mut manifests = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.should_ignore(root, entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(AuditError::WalkFailed {
                        path: root.to_path_buf(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.file_name() != self.manifest_name.as_str() {
                continue;
            }
            // Symlinked manifests count even when directory links are not followed
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if is_file {
                manifests.push(display_path(root, entry.path()));
            }
        }

        log::info!(
            "Found {} {} file(s) under {}",
            manifests.len(),
            self.manifest_name,
            root.display()
        );
        Ok(manifests)
    }

    /// Checks if a path below `root` matches an exclude pattern
    pub fn should_ignore(&self, root: &Path, path: &Path) -> bool {
        if self.ignore_patterns.is_empty() {
            return false;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.is_match(&relative))
    }
}

/// Path as shown in diagnostics: relative to the working directory when
/// scanning `.`, otherwise as walked
fn display_path(root: &Path, path: &Path) -> PathBuf {
    if root == Path::new(".") {
        path.strip_prefix(".").unwrap_or(path).to_path_buf()
    } else {
        path.to_path_buf()
    }
}
