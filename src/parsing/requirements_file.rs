//! Requirements File Parser - pip-compatible `requirements.txt` parsing
//!
//! Turns a requirements file into a lazy sequence of [`ManifestEntry`]
//! values. Lines are preprocessed up front (continuations, comments,
//! `${VAR}` expansion) but interpreted one at a time, so entries before a
//! malformed line are yielded before the error.
//!
//! # Example
//!
//! ```no_run
//! use pin_audit::core::traits::{ManifestEntry, ManifestParser};
//! use pin_audit::parsing::RequirementsFileParser;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let parser = RequirementsFileParser::new();
//! for entry in parser.parse(Path::new("requirements.txt"))? {
//!     if let ManifestEntry::Requirement(req) = entry? {
//!         println!("{} pinned: {}", req, req.has_specifiers());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use super::requirement::{looks_like_url, parse_editable, parse_requirement};
use crate::core::error::ParseError;
use crate::core::traits::{
    Directive, ManifestEntries, ManifestEntry, ManifestParser, Origin, OriginKind,
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(^|\s+)#.*$").unwrap();
    /// Environment variable pattern (${VAR_NAME})
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z0-9_]+)\}").unwrap();
}

/// What an option does when it appears on its own line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionKind {
    Include(OriginKind),
    Editable,
    Global,
}

struct OptionSpec {
    long: &'static str,
    short: Option<&'static str>,
    takes_value: bool,
    kind: OptionKind,
}

const LINE_OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        long: "--requirement",
        short: Some("-r"),
        takes_value: true,
        kind: OptionKind::Include(OriginKind::Requirements),
    },
    OptionSpec {
        long: "--constraint",
        short: Some("-c"),
        takes_value: true,
        kind: OptionKind::Include(OriginKind::Constraints),
    },
    OptionSpec {
        long: "--editable",
        short: Some("-e"),
        takes_value: true,
        kind: OptionKind::Editable,
    },
    OptionSpec {
        long: "--index-url",
        short: Some("-i"),
        takes_value: true,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--extra-index-url",
        short: None,
        takes_value: true,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--find-links",
        short: Some("-f"),
        takes_value: true,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--trusted-host",
        short: None,
        takes_value: true,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--no-binary",
        short: None,
        takes_value: true,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--only-binary",
        short: None,
        takes_value: true,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--use-feature",
        short: None,
        takes_value: true,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--no-index",
        short: None,
        takes_value: false,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--pre",
        short: None,
        takes_value: false,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--prefer-binary",
        short: None,
        takes_value: false,
        kind: OptionKind::Global,
    },
    OptionSpec {
        long: "--require-hashes",
        short: None,
        takes_value: false,
        kind: OptionKind::Global,
    },
];

/// Options allowed after a requirement on the same line
const REQUIREMENT_OPTIONS: &[&str] = &[
    "--hash",
    "--install-option",
    "--global-option",
    "--config-settings",
];

/// Parser for pip-style requirements files
pub struct RequirementsFileParser {
    env: HashMap<String, String>,
    follow_includes: bool,
}

impl Default for RequirementsFileParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequirementsFileParser {
    /// Create a parser that expands variables from the process environment
    pub fn new() -> Self {
        Self::with_env(std::env::vars().collect())
    }

    /// Create a parser with an explicit variable table for `${VAR}` expansion
    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self {
            env,
            follow_includes: true,
        }
    }

    /// Whether `-r` / `-c` includes are opened and parsed (default: true)
    ///
    /// When disabled, include lines are yielded as directives.
    pub fn follow_includes(mut self, follow: bool) -> Self {
        self.follow_includes = follow;
        self
    }

    /// Split file content into numbered logical lines
    ///
    /// Joins `\` continuations, strips comments, expands `${VAR}` and drops
    /// blank lines. Each logical line keeps the number of its first
    /// physical line.
    fn logical_lines(&self, content: &str) -> Vec<(usize, String)> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut joined = Vec::new();
        let mut pending: Option<(usize, String)> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line_number = idx + 1;
            let is_comment = raw.trim_start().starts_with('#');

            if let Some(stripped) = raw.strip_suffix('\\').filter(|_| !is_comment) {
                let (_, buffer) = pending.get_or_insert_with(|| (line_number, String::new()));
                buffer.push_str(stripped);
                continue;
            }

            match pending.take() {
                Some((first, mut buffer)) => {
                    // Keeps a trailing comment line separated so it is stripped below
                    if is_comment {
                        buffer.push(' ');
                    }
                    buffer.push_str(raw);
                    joined.push((first, buffer));
                }
                None => joined.push((line_number, raw.to_string())),
            }
        }
        if let Some(last) = pending {
            joined.push(last);
        }

        joined
            .into_iter()
            .filter_map(|(number, line)| {
                let without_comment = COMMENT.replace(&line, "");
                let expanded = self.expand_env_vars(&without_comment);
                let trimmed = expanded.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some((number, trimmed.to_string()))
                }
            })
            .collect()
    }

    /// Expand `${VAR}` references; unknown variables are left as written
    fn expand_env_vars(&self, line: &str) -> String {
        ENV_VAR
            .replace_all(line, |caps: &Captures| {
                self.env
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Interpret one logical line
    fn process_line(
        &self,
        path: &Path,
        kind: OriginKind,
        line_number: usize,
        line: &str,
    ) -> Result<Vec<LineOutcome>, ParseError> {
        let origin = Origin {
            path: path.to_path_buf(),
            line: line_number,
            kind,
        };
        let (args, options) = break_args_options(line);

        if args.is_empty() {
            return self.process_option_line(&options, origin);
        }

        let mut requirement = parse_requirement(&args, origin)?;
        for (name, value) in parse_requirement_options(&options, line_number)? {
            if name == "--hash" {
                requirement.hashes.push(value);
            }
        }

        Ok(vec![LineOutcome::Entry(ManifestEntry::Requirement(
            requirement,
        ))])
    }

    fn process_option_line(
        &self,
        tokens: &[&str],
        origin: Origin,
    ) -> Result<Vec<LineOutcome>, ParseError> {
        let line = origin.line;
        let mut outcomes = Vec::new();
        let mut idx = 0;

        while idx < tokens.len() {
            let token = tokens[idx];
            idx += 1;

            if !token.starts_with('-') {
                return Err(ParseError::InvalidRequirement {
                    text: token.to_string(),
                    line,
                });
            }

            let (name, inline) = split_option(token);
            let spec = LINE_OPTIONS
                .iter()
                .find(|spec| spec.long == name || spec.short == Some(name))
                .ok_or_else(|| ParseError::NoSuchOption {
                    option: name.to_string(),
                    line,
                })?;

            let value = if spec.takes_value {
                match inline {
                    Some(value) => Some(value.to_string()),
                    None if idx < tokens.len() => {
                        idx += 1;
                        Some(tokens[idx - 1].to_string())
                    }
                    None => {
                        return Err(ParseError::MissingArgument {
                            option: name.to_string(),
                            line,
                        });
                    }
                }
            } else {
                if inline.is_some() {
                    return Err(ParseError::UnexpectedValue {
                        option: name.to_string(),
                        line,
                    });
                }
                None
            };

            let outcome = match (spec.kind, value) {
                (OptionKind::Editable, Some(target)) => LineOutcome::Entry(
                    ManifestEntry::Requirement(parse_editable(&target, origin.clone())?),
                ),
                (OptionKind::Include(include_kind), Some(target)) if self.follow_includes => {
                    LineOutcome::Include {
                        path: resolve_include(&origin.path, &target, line)?,
                        kind: include_kind,
                        line,
                    }
                }
                (_, value) => LineOutcome::Entry(ManifestEntry::Directive(Directive {
                    option: spec.long.to_string(),
                    value,
                    origin: origin.clone(),
                })),
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

impl ManifestParser for RequirementsFileParser {
    fn parse<'a>(&'a self, path: &Path) -> Result<ManifestEntries<'a>, ParseError> {
        let frame = Frame::open(self, path, OriginKind::Requirements)?;
        Ok(Box::new(RequirementsIter {
            parser: self,
            stack: vec![frame],
            failed: false,
        }))
    }
}

/// Result of interpreting one option or requirement
#[derive(Debug)]
enum LineOutcome {
    Entry(ManifestEntry),
    Include {
        path: PathBuf,
        kind: OriginKind,
        line: usize,
    },
}

/// One open file in the include chain
struct Frame {
    path: PathBuf,
    canonical: PathBuf,
    kind: OriginKind,
    lines: std::vec::IntoIter<(usize, String)>,
    pending: VecDeque<LineOutcome>,
}

impl Frame {
    fn open(
        parser: &RequirementsFileParser,
        path: &Path,
        kind: OriginKind,
    ) -> Result<Self, ParseError> {
        let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Parsing {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            canonical: canonical(path),
            kind,
            lines: parser.logical_lines(&content).into_iter(),
            pending: VecDeque::new(),
        })
    }
}

/// Lazy entry sequence over a requirements file and its includes
struct RequirementsIter<'a> {
    parser: &'a RequirementsFileParser,
    stack: Vec<Frame>,
    failed: bool,
}

impl RequirementsIter<'_> {
    fn fail(&mut self, error: ParseError) -> Result<ManifestEntry, ParseError> {
        self.failed = true;
        self.stack.clear();
        Err(error)
    }

    fn open_include(
        &self,
        path: &Path,
        kind: OriginKind,
        line: usize,
    ) -> Result<Frame, ParseError> {
        let target = canonical(path);
        if self.stack.iter().any(|frame| frame.canonical == target) {
            return Err(ParseError::RecursiveInclude {
                path: path.to_path_buf(),
                line,
            });
        }
        Frame::open(self.parser, path, kind)
    }
}

impl Iterator for RequirementsIter<'_> {
    type Item = Result<ManifestEntry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let frame = self.stack.last_mut()?;

            if let Some(outcome) = frame.pending.pop_front() {
                match outcome {
                    LineOutcome::Entry(entry) => return Some(Ok(entry)),
                    LineOutcome::Include { path, kind, line } => {
                        match self.open_include(&path, kind, line) {
                            Ok(child) => self.stack.push(child),
                            Err(e) => return Some(self.fail(e)),
                        }
                    }
                }
                continue;
            }

            match frame.lines.next() {
                Some((line_number, line)) => {
                    match self
                        .parser
                        .process_line(&frame.path, frame.kind, line_number, &line)
                    {
                        Ok(outcomes) => frame.pending.extend(outcomes),
                        Err(e) => return Some(self.fail(e)),
                    }
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Split a line into the requirement part and trailing option tokens
///
/// Everything from the first whitespace-separated token starting with `-`
/// is treated as options.
fn break_args_options(line: &str) -> (String, Vec<&str>) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let split = tokens
        .iter()
        .position(|token| token.starts_with('-'))
        .unwrap_or(tokens.len());

    (tokens[..split].join(" "), tokens[split..].to_vec())
}

/// Split `--name=value` and `-xvalue` forms
fn split_option(token: &str) -> (&str, Option<&str>) {
    if token.starts_with("--") {
        match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        }
    } else if token.len() > 2 && token.is_char_boundary(2) {
        let (name, value) = token.split_at(2);
        (name, Some(value.strip_prefix('=').unwrap_or(value)))
    } else {
        (token, None)
    }
}

fn parse_requirement_options(
    tokens: &[&str],
    line: usize,
) -> Result<Vec<(String, String)>, ParseError> {
    let mut parsed = Vec::new();
    let mut idx = 0;

    while idx < tokens.len() {
        let (name, inline) = split_option(tokens[idx]);
        idx += 1;

        if !REQUIREMENT_OPTIONS.contains(&name) {
            return Err(ParseError::NoSuchOption {
                option: name.to_string(),
                line,
            });
        }

        let value = match inline {
            Some(value) => value.to_string(),
            None if idx < tokens.len() => {
                idx += 1;
                tokens[idx - 1].to_string()
            }
            None => {
                return Err(ParseError::MissingArgument {
                    option: name.to_string(),
                    line,
                });
            }
        };
        parsed.push((name.to_string(), value));
    }

    Ok(parsed)
}

/// Resolve an include target relative to the including file
fn resolve_include(including: &Path, target: &str, line: usize) -> Result<PathBuf, ParseError> {
    if let Some(local) = target.strip_prefix("file://") {
        return Ok(PathBuf::from(local));
    }
    if looks_like_url(target) {
        return Err(ParseError::RemoteInclude {
            url: target.to_string(),
            line,
        });
    }

    let target = Path::new(target);
    if target.is_absolute() {
        return Ok(target.to_path_buf());
    }
    Ok(including
        .parent()
        .map(|dir| dir.join(target))
        .unwrap_or_else(|| target.to_path_buf()))
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
