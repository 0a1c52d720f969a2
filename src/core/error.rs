//! Error handling for pin auditing
//!
//! Two layers of errors exist here. [`ParseError`] describes why a single
//! manifest could not be parsed; the auditor turns it into a finding and
//! keeps the message verbatim. [`AuditError`] describes failures of the run
//! itself (bad root, broken configuration) which never become findings.

use std::path::PathBuf;
use thiserror::Error;

/// Failure raised by a [`ManifestParser`](crate::core::traits::ManifestParser)
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Could not open requirements file: {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no such option: {option} (line {line})")]
    NoSuchOption { option: String, line: usize },

    #[error("{option} option requires 1 argument (line {line})")]
    MissingArgument { option: String, line: usize },

    #[error("{option} option does not take a value (line {line})")]
    UnexpectedValue { option: String, line: usize },

    #[error("Invalid requirement: '{text}' (line {line})")]
    InvalidRequirement { text: String, line: usize },

    #[error("Cannot include remote requirements file {url} (line {line}): network access is disabled")]
    RemoteInclude { url: String, line: usize },

    #[error("Requirements file {} includes itself (line {line})", path.display())]
    RecursiveInclude { path: PathBuf, line: usize },
}

impl ParseError {
    /// Line of the manifest the error points at, when there is one
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Io { .. } => None,
            Self::NoSuchOption { line, .. }
            | Self::MissingArgument { line, .. }
            | Self::UnexpectedValue { line, .. }
            | Self::InvalidRequirement { line, .. }
            | Self::RemoteInclude { line, .. }
            | Self::RecursiveInclude { line, .. } => Some(*line),
        }
    }
}

/// Main error type for a whole audit run
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Root path is not a readable directory: {}", path.display())]
    InvalidRoot { path: PathBuf },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to walk {}: {message}", path.display())]
    WalkFailed { path: PathBuf, message: String },
}

impl AuditError {
    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRoot { .. } => "INVALID_ROOT",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::WalkFailed { .. } => "WALK_FAILED",
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidRoot { .. } => vec![
                "Check that the path exists and is a directory",
                "Check read permissions on the directory",
            ],
            Self::ConfigError(_) => vec![
                "Check .pin-audit.yaml for syntax errors",
                "Check PIN_AUDIT_* environment variables",
            ],
            Self::WalkFailed { .. } => vec!["Check read permissions below the scanned root"],
        }
    }
}
