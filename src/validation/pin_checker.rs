//! Pin Checker - verifies every declared dependency carries a version
//!
//! Discovers manifests under a root, parses each through a
//! [`ManifestParser`], and reports declarations without version specifiers
//! as well as manifests that fail to parse.
//!
//! By default the first finding ends the run. With `fail_fast` disabled
//! every manifest is visited and all findings are collected; a parse
//! failure still abandons the rest of that one manifest.
//!
//! # Example
//!
//! ```no_run
//! use pin_audit::core::config::AuditConfig;
//! use pin_audit::validation::PinChecker;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let checker = PinChecker::from_config(&AuditConfig::default())?;
//! let report = checker.run(Path::new("."))?;
//!
//! print!("{}", report.render_text());
//! std::process::exit(report.exit_code());
//! # }
//! ```

use super::discovery::ManifestDiscovery;
use super::report::{AuditReport, Finding};
use crate::core::config::AuditConfig;
use crate::core::error::{AuditError, ParseError};
use crate::core::traits::{ManifestEntry, ManifestParser};
use crate::parsing::RequirementsFileParser;
use std::path::Path;

/// Whether the scan continues after a manifest has been checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Auditor for version pins across a directory tree
pub struct PinChecker<P: ManifestParser> {
    parser: P,
    discovery: ManifestDiscovery,
    fail_fast: bool,
}

impl PinChecker<RequirementsFileParser> {
    /// Create a checker using the pip-compatible requirements parser
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        let parser = RequirementsFileParser::new().follow_includes(config.follow_includes);
        Self::with_parser(config, parser)
    }
}

impl<P: ManifestParser> PinChecker<P> {
    /// Create a checker around any parser implementation
    pub fn with_parser(config: &AuditConfig, parser: P) -> Result<Self, AuditError> {
        Ok(Self {
            parser,
            discovery: ManifestDiscovery::new(config)?,
            fail_fast: config.fail_fast,
        })
    }

    /// Audit every manifest below `root`
    ///
    /// Findings are part of the returned report. `Err` is reserved for
    /// failures of the run itself, such as an unreadable root.
    pub fn run(&self, root: &Path) -> Result<AuditReport, AuditError> {
        let manifests = self.discovery.discover(root)?;
        let mut report = AuditReport::default();

        for path in manifests {
            report.scanned_files.push(path.clone());
            if self.check_manifest(&path, &mut report) == Flow::Stop {
                log::info!("Stopping at first finding in {}", path.display());
                break;
            }
        }

        log::info!(
            "Checked {} requirement(s) in {} manifest(s), {} finding(s)",
            report.checked_requirements,
            report.scanned_files.len(),
            report.findings.len()
        );
        Ok(report)
    }

    fn check_manifest(&self, path: &Path, report: &mut AuditReport) -> Flow {
        let entries = match self.parser.parse(path) {
            Ok(entries) => entries,
            Err(e) => return self.record(report, parse_failure(path, &e)),
        };

        for entry in entries {
            match entry {
                Ok(ManifestEntry::Requirement(requirement)) => {
                    report.checked_requirements += 1;
                    if requirement.has_specifiers() {
                        continue;
                    }
                    let finding = Finding::ConstraintMissing {
                        file: path.to_path_buf(),
                        requirement: requirement.to_string(),
                        name: requirement.name.clone(),
                        line: requirement.origin.line,
                    };
                    if self.record(report, finding) == Flow::Stop {
                        return Flow::Stop;
                    }
                }
                Ok(ManifestEntry::Directive(directive)) => {
                    log::debug!("Ignoring directive {} in {}", directive.option, path.display());
                }
                Err(e) => return self.record(report, parse_failure(path, &e)),
            }
        }

        Flow::Continue
    }

    fn record(&self, report: &mut AuditReport, finding: Finding) -> Flow {
        log::debug!("{}: {}", finding.code(), finding);
        report.findings.push(finding);
        if self.fail_fast {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

fn parse_failure(path: &Path, error: &ParseError) -> Finding {
    Finding::ParseFailure {
        file: path.to_path_buf(),
        message: error.to_string(),
        line: error.line(),
    }
}
