//! Audit findings and report rendering

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A single problem found while auditing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A dependency declaration without any version specifier
    ConstraintMissing {
        file: PathBuf,
        /// Display form of the declaration
        requirement: String,
        name: Option<String>,
        line: usize,
    },
    /// The manifest (or a file it includes) could not be parsed
    ParseFailure {
        file: PathBuf,
        message: String,
        /// Line the parser stopped at; absent for read failures
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<usize>,
    },
}

impl Finding {
    /// Manifest the finding was reported against
    pub fn file(&self) -> &PathBuf {
        match self {
            Self::ConstraintMissing { file, .. } | Self::ParseFailure { file, .. } => file,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ConstraintMissing { .. } => "CONSTRAINT_MISSING",
            Self::ParseFailure { .. } => "PARSE_FAILURE",
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstraintMissing { requirement, .. } => {
                write!(f, "{} has no version specifiers.", requirement)
            }
            Self::ParseFailure { file, message, .. } => write!(
                f,
                "Exception while trying to parse requirements file {}: {}",
                file.display(),
                message
            ),
        }
    }
}

/// Output format for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{}' (expected text or json)", other)),
        }
    }
}

/// Outcome of one audit run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Manifests visited, in traversal order
    pub scanned_files: Vec<PathBuf>,
    /// Dependency declarations checked
    pub checked_requirements: usize,
    pub findings: Vec<Finding>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    #[serde(flatten)]
    report: &'a AuditReport,
}

impl AuditReport {
    /// Whether every declaration carried a version specifier
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    /// Process exit status for this verdict
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }

    /// One line per finding; empty when the audit passed
    pub fn render_text(&self) -> String {
        self.findings
            .iter()
            .map(|finding| format!("{}\n", finding))
            .collect()
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonReport {
            passed: self.passed(),
            report: self,
        })
    }

    pub fn render(&self, format: OutputFormat) -> serde_json::Result<String> {
        match format {
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Json => self.render_json().map(|json| json + "\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint_missing() -> Finding {
        Finding::ConstraintMissing {
            file: PathBuf::from("requirements.txt"),
            requirement: "foo (from -r requirements.txt (line 1))".to_string(),
            name: Some("foo".to_string()),
            line: 1,
        }
    }

    fn parse_failure() -> Finding {
        Finding::ParseFailure {
            file: PathBuf::from("sub/requirements.txt"),
            message: "no such option: --invalid-flag (line 1)".to_string(),
            line: Some(1),
        }
    }

    #[test]
    fn test_constraint_missing_display() {
        assert_eq!(
            constraint_missing().to_string(),
            "foo (from -r requirements.txt (line 1)) has no version specifiers."
        );
        assert_eq!(constraint_missing().code(), "CONSTRAINT_MISSING");
    }

    #[test]
    fn test_parse_failure_display() {
        assert_eq!(
            parse_failure().to_string(),
            "Exception while trying to parse requirements file sub/requirements.txt: no such option: --invalid-flag (line 1)"
        );
        assert_eq!(parse_failure().file(), &PathBuf::from("sub/requirements.txt"));
    }

    #[test]
    fn test_empty_report_passes() {
        let report = AuditReport::default();
        assert!(report.passed());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.render_text(), "");
    }

    #[test]
    fn test_report_with_findings_fails() {
        let report = AuditReport {
            scanned_files: vec![PathBuf::from("requirements.txt")],
            checked_requirements: 1,
            findings: vec![constraint_missing(), parse_failure()],
        };
        assert!(!report.passed());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.render_text().lines().count(), 2);
    }

    #[test]
    fn test_render_json() {
        let report = AuditReport {
            scanned_files: vec![PathBuf::from("requirements.txt")],
            checked_requirements: 1,
            findings: vec![constraint_missing()],
        };
        let json = report.render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["passed"], false);
        assert_eq!(value["checked_requirements"], 1);
        assert_eq!(value["findings"][0]["kind"], "constraint_missing");
        assert_eq!(value["findings"][0]["name"], "foo");
    }

    #[test]
    fn test_render_json_parse_failure_line() {
        let report = AuditReport {
            scanned_files: vec![PathBuf::from("sub/requirements.txt")],
            checked_requirements: 0,
            findings: vec![
                parse_failure(),
                Finding::ParseFailure {
                    file: PathBuf::from("requirements.txt"),
                    message: "Could not open requirements file".to_string(),
                    line: None,
                },
            ],
        };
        let json = report.render_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["findings"][0]["kind"], "parse_failure");
        assert_eq!(value["findings"][0]["line"], 1);
        assert!(value["findings"][1].get("line").is_none());

        let back: AuditReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.findings, report.findings);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
