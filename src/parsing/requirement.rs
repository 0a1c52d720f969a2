//! Requirement line parsing
//!
//! Parses the requirement part of a requirements-file line: PEP 508
//! declarations (`name[extras] specifiers ; marker`, `name @ url`) plus the
//! bare URL, archive and path forms pip accepts.

use crate::core::error::ParseError;
use crate::core::traits::{Operator, Origin, Requirement, VersionSpecifier};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAME: Regex = Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)").unwrap();
    static ref EXTRA_NAME: Regex =
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$").unwrap();
    static ref SPECIFIER: Regex =
        Regex::new(r"^(~=|===|==|!=|<=|>=|<|>)\s*([^\s,;()]+)$").unwrap();
    static ref VERSION: Regex = Regex::new(
        r"(?ix)^
        v?
        (?:[0-9]+!)?                                        # epoch
        [0-9]+(?:\.[0-9]+)*                                 # release
        (?:[-_.]?(?:a|b|c|rc|alpha|beta|pre|preview)[-_.]?[0-9]*)?
        (?:-[0-9]+|[-_.]?(?:post|rev|r)[-_.]?[0-9]*)?
        (?:[-_.]?dev[-_.]?[0-9]*)?
        (?:\+[a-z0-9]+(?:[-_.][a-z0-9]+)*)?                 # local
        $"
    )
    .unwrap();
    static ref URL_SCHEME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap();
    static ref EGG_FRAGMENT: Regex = Regex::new(r"[#&]egg=([^&\s]+)").unwrap();
    static ref TRAILING_MARKER: Regex = Regex::new(r"\s+;\s*(.*)$").unwrap();
    static ref NAMED_REFERENCE: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*\s*(?:\[[^\]]*\])?\s*@").unwrap();
}

const ARCHIVE_SUFFIXES: &[&str] = &[".whl", ".tar.gz", ".tgz", ".tar.bz2", ".tar.xz", ".zip"];

/// Parse one requirement declaration
///
/// `text` must already be stripped of comments and per-requirement options.
pub fn parse_requirement(text: &str, origin: Origin) -> Result<Requirement, ParseError> {
    let text = text.trim();

    if !NAMED_REFERENCE.is_match(text) && (looks_like_url(text) || looks_like_path(text)) {
        return parse_direct(text, false, origin);
    }

    parse_pep508(text, origin)
}

/// Parse the target of an `-e` / `--editable` option
///
/// Editable targets must be a local path or a VCS/URL reference.
pub fn parse_editable(target: &str, origin: Origin) -> Result<Requirement, ParseError> {
    let target = target.trim();
    if looks_like_url(target) || looks_like_path(target) || target.contains('/') {
        return parse_direct(target, true, origin);
    }

    Err(invalid(target, &origin))
}

fn parse_pep508(text: &str, origin: Origin) -> Result<Requirement, ParseError> {
    let name_match = NAME.find(text).ok_or_else(|| invalid(text, &origin))?;
    let name = name_match.as_str().to_string();
    let mut rest = text[name_match.end()..].trim_start();

    let mut extras = Vec::new();
    if let Some(after_bracket) = rest.strip_prefix('[') {
        let close = after_bracket.find(']').ok_or_else(|| invalid(text, &origin))?;
        for extra in after_bracket[..close].split(',').map(str::trim) {
            if extra.is_empty() {
                continue;
            }
            if !EXTRA_NAME.is_match(extra) {
                return Err(invalid(text, &origin));
            }
            extras.push(extra.to_string());
        }
        rest = after_bracket[close + 1..].trim_start();
    }

    let mut requirement = Requirement {
        name: Some(name),
        extras,
        specifiers: Vec::new(),
        marker: None,
        url: None,
        editable: false,
        hashes: Vec::new(),
        origin,
    };

    if let Some(reference) = rest.strip_prefix('@') {
        let reference = reference.trim_start();
        let (url, tail) = match reference.find(char::is_whitespace) {
            Some(idx) => (&reference[..idx], reference[idx..].trim_start()),
            None => (reference, ""),
        };
        if url.is_empty() || !looks_like_url(url) {
            return Err(invalid(text, &requirement.origin));
        }
        requirement.url = Some(url.to_string());
        requirement.marker = parse_marker_tail(tail, text, &requirement.origin)?;
        return Ok(requirement);
    }

    let (spec_part, marker_part) = match rest.find(';') {
        Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
        None => (rest, None),
    };

    requirement.specifiers = parse_specifiers(spec_part, text, &requirement.origin)?;

    if let Some(marker) = marker_part {
        let marker = marker.trim();
        if marker.is_empty() {
            return Err(invalid(text, &requirement.origin));
        }
        requirement.marker = Some(marker.to_string());
    }

    Ok(requirement)
}

fn parse_specifiers(
    spec_part: &str,
    text: &str,
    origin: &Origin,
) -> Result<Vec<VersionSpecifier>, ParseError> {
    let mut spec_part = spec_part.trim();
    if let Some(inner) = spec_part.strip_prefix('(') {
        spec_part = inner
            .strip_suffix(')')
            .ok_or_else(|| invalid(text, origin))?
            .trim();
    }

    if spec_part.is_empty() {
        return Ok(Vec::new());
    }

    spec_part
        .split(',')
        .map(|clause| parse_specifier(clause.trim()).ok_or_else(|| invalid(text, origin)))
        .collect()
}

fn parse_specifier(clause: &str) -> Option<VersionSpecifier> {
    let caps = SPECIFIER.captures(clause)?;
    let operator = Operator::from_token(&caps[1])?;
    let version = caps[2].to_string();

    if operator != Operator::ArbitraryEqual {
        let release = match version.strip_suffix(".*") {
            Some(prefix) if operator.allows_wildcard() => prefix,
            Some(_) => return None,
            None => version.as_str(),
        };
        if !VERSION.is_match(release) {
            return None;
        }
    }

    Some(VersionSpecifier { operator, version })
}

/// Parse a URL, archive or path requirement
fn parse_direct(text: &str, editable: bool, origin: Origin) -> Result<Requirement, ParseError> {
    let (target, marker) = match TRAILING_MARKER.captures(text) {
        Some(caps) => {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(text.len());
            let marker = caps[1].trim();
            if marker.is_empty() {
                return Err(invalid(text, &origin));
            }
            (&text[..start], Some(marker.to_string()))
        }
        None => (text, None),
    };

    if target.is_empty() || target.contains(char::is_whitespace) {
        return Err(invalid(text, &origin));
    }

    let name = EGG_FRAGMENT
        .captures(target)
        .map(|caps| caps[1].split('[').next().unwrap_or_default().to_string())
        .filter(|name| !name.is_empty());

    Ok(Requirement {
        name,
        extras: Vec::new(),
        specifiers: Vec::new(),
        marker,
        url: Some(target.to_string()),
        editable,
        hashes: Vec::new(),
        origin,
    })
}

fn parse_marker_tail(
    tail: &str,
    text: &str,
    origin: &Origin,
) -> Result<Option<String>, ParseError> {
    if tail.is_empty() {
        return Ok(None);
    }
    match tail.strip_prefix(';').map(str::trim) {
        Some(marker) if !marker.is_empty() => Ok(Some(marker.to_string())),
        _ => Err(invalid(text, origin)),
    }
}

/// Whether `text` starts with a URL scheme (`https://`, `git+ssh://`, `file:`)
pub fn looks_like_url(text: &str) -> bool {
    // Windows drive letters look like a one-letter scheme
    URL_SCHEME
        .find(text)
        .is_some_and(|m| m.end() > 2 && (text[m.end()..].starts_with("//") || m.as_str() == "file:"))
}

fn looks_like_path(text: &str) -> bool {
    let target = text.split_whitespace().next().unwrap_or_default();
    target == "."
        || target.starts_with("./")
        || target.starts_with("../")
        || target.starts_with('/')
        || target.starts_with('~')
        || ARCHIVE_SUFFIXES
            .iter()
            .any(|suffix| target.to_ascii_lowercase().ends_with(suffix))
}

fn invalid(text: &str, origin: &Origin) -> ParseError {
    ParseError::InvalidRequirement {
        text: text.to_string(),
        line: origin.line,
    }
}
