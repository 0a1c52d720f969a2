//! Core traits and types for manifest auditing
//!
//! This module defines the parser seam the auditor depends on and the
//! entry types a parser yields.

use crate::core::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Version specifiers
// ============================================================================

/// Comparison operator of a version specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Compatible,
    ArbitraryEqual,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
}

impl Operator {
    /// Parse an operator token such as `>=`
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "~=" => Some(Self::Compatible),
            "===" => Some(Self::ArbitraryEqual),
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            "<=" => Some(Self::LessEqual),
            ">=" => Some(Self::GreaterEqual),
            "<" => Some(Self::Less),
            ">" => Some(Self::Greater),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compatible => "~=",
            Self::ArbitraryEqual => "===",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
        }
    }

    /// Whether a trailing `.*` wildcard is allowed after this operator
    pub fn allows_wildcard(&self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual)
    }
}

/// A single version constraint, e.g. `>=2.0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpecifier {
    pub operator: Operator,
    pub version: String,
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator.as_str(), self.version)
    }
}

// ============================================================================
// Entries
// ============================================================================

/// How the file an entry came from was referenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    /// A requirements file (`-r`)
    Requirements,
    /// A constraints file (`-c`)
    Constraints,
}

impl OriginKind {
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Requirements => "-r",
            Self::Constraints => "-c",
        }
    }
}

/// Location of an entry in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub path: PathBuf,
    pub line: usize,
    pub kind: OriginKind,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (line {})",
            self.kind.flag(),
            self.path.display(),
            self.line
        )
    }
}

/// An installable dependency declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Project name; `None` for bare URL or path requirements without `#egg=`
    pub name: Option<String>,
    pub extras: Vec<String>,
    pub specifiers: Vec<VersionSpecifier>,
    pub marker: Option<String>,
    /// Direct reference (`name @ url`, editable target, archive path)
    pub url: Option<String>,
    pub editable: bool,
    pub hashes: Vec<String>,
    pub origin: Origin,
}

impl Requirement {
    pub fn has_specifiers(&self) -> bool {
        !self.specifiers.is_empty()
    }

    /// Whether the declaration came from a constraints file
    pub fn is_constraint(&self) -> bool {
        self.origin.kind == OriginKind::Constraints
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => {
                write!(f, "{}", name)?;
                if !self.extras.is_empty() {
                    write!(f, "[{}]", self.extras.join(","))?;
                }
                let specs: Vec<String> = self.specifiers.iter().map(|s| s.to_string()).collect();
                write!(f, "{}", specs.join(","))?;
                if let Some(marker) = &self.marker {
                    write!(f, "; {}", marker)?;
                }
                if let Some(url) = &self.url {
                    write!(f, " from {}", url)?;
                }
            }
            None => write!(f, "{}", self.url.as_deref().unwrap_or("<unnamed>"))?,
        }
        write!(f, " (from {})", self.origin)
    }
}

/// A non-installable option line, e.g. `--index-url https://...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub option: String,
    pub value: Option<String>,
    pub origin: Origin,
}

/// One parsed entry of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    Requirement(Requirement),
    Directive(Directive),
}

// ============================================================================
// Parser seam
// ============================================================================

/// Lazy sequence of entries produced by a parser
pub type ManifestEntries<'a> = Box<dyn Iterator<Item = Result<ManifestEntry, ParseError>> + 'a>;

/// Turns a manifest file into a lazy sequence of entries
///
/// Errors returned directly mean the file could not be opened at all.
/// Errors yielded by the sequence stop it: an implementation must not yield
/// further entries after an `Err`.
pub trait ManifestParser {
    fn parse<'a>(&'a self, path: &Path) -> Result<ManifestEntries<'a>, ParseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Origin {
        Origin {
            path: PathBuf::from("requirements.txt"),
            line: 4,
            kind: OriginKind::Requirements,
        }
    }

    fn requirement(name: Option<&str>) -> Requirement {
        Requirement {
            name: name.map(String::from),
            extras: Vec::new(),
            specifiers: Vec::new(),
            marker: None,
            url: None,
            editable: false,
            hashes: Vec::new(),
            origin: origin(),
        }
    }

    #[test]
    fn test_operator_tokens() {
        for token in ["~=", "===", "==", "!=", "<=", ">=", "<", ">"] {
            let op = Operator::from_token(token).unwrap();
            assert_eq!(op.as_str(), token);
        }
        assert!(Operator::from_token("=").is_none());
        assert!(Operator::Equal.allows_wildcard());
        assert!(!Operator::GreaterEqual.allows_wildcard());
    }

    #[test]
    fn test_display_bare_name() {
        let req = requirement(Some("foo"));
        assert!(!req.has_specifiers());
        assert_eq!(
            req.to_string(),
            "foo (from -r requirements.txt (line 4))"
        );
    }

    #[test]
    fn test_display_full_requirement() {
        let mut req = requirement(Some("requests"));
        req.extras = vec!["security".to_string(), "socks".to_string()];
        req.specifiers = vec![
            VersionSpecifier {
                operator: Operator::GreaterEqual,
                version: "2.0".to_string(),
            },
            VersionSpecifier {
                operator: Operator::Less,
                version: "3".to_string(),
            },
        ];
        req.marker = Some("python_version >= \"3.8\"".to_string());

        assert!(req.has_specifiers());
        assert_eq!(
            req.to_string(),
            "requests[security,socks]>=2.0,<3; python_version >= \"3.8\" (from -r requirements.txt (line 4))"
        );
    }

    #[test]
    fn test_display_url_requirement() {
        let mut req = requirement(None);
        req.url = Some("https://example.com/pkg.whl".to_string());
        assert_eq!(
            req.to_string(),
            "https://example.com/pkg.whl (from -r requirements.txt (line 4))"
        );

        req.name = Some("pkg".to_string());
        assert_eq!(
            req.to_string(),
            "pkg from https://example.com/pkg.whl (from -r requirements.txt (line 4))"
        );
    }

    #[test]
    fn test_constraint_origin() {
        let mut req = requirement(Some("foo"));
        req.origin.kind = OriginKind::Constraints;
        assert!(req.is_constraint());
        assert!(req.to_string().contains("(from -c requirements.txt (line 4))"));
    }
}
