//! File-name filters
//!
//! A filter is a single wildcard pattern supplied once per run. It is
//! compiled up front by [`compile_filter`] so an unusable pattern fails
//! before any folder is listed.
//!
//! | pattern            | matcher                                     |
//! |--------------------|---------------------------------------------|
//! | `*`, `*.*`, empty  | every file                                  |
//! | `*.pdf`            | case-insensitive suffix `.pdf`              |
//! | anything else      | glob (`*` any run, `?` one char), anchored, case-insensitive |

use regex::{Regex, RegexBuilder};

use crate::domain::DomainError;

/// Compiled form of a filter pattern
#[derive(Debug, Clone)]
pub enum FileMatcher {
    /// Matches every file
    All,
    /// Matches names ending with the stored lowercase suffix (including the dot)
    Extension(String),
    /// Matches names against a translated glob
    Pattern {
        /// The pattern as supplied
        source: String,
        /// Anchored, case-insensitive translation
        regex: Regex,
    },
}

impl FileMatcher {
    /// Returns `true` if `name` passes the filter
    pub fn matches(&self, name: &str) -> bool {
        match self {
            FileMatcher::All => true,
            FileMatcher::Extension(suffix) => name.to_lowercase().ends_with(suffix.as_str()),
            FileMatcher::Pattern { regex, .. } => regex.is_match(name),
        }
    }

    /// A printable form of the filter
    pub fn pattern(&self) -> String {
        match self {
            FileMatcher::All => "*".to_string(),
            FileMatcher::Extension(suffix) => format!("*{suffix}"),
            FileMatcher::Pattern { source, .. } => source.clone(),
        }
    }
}

/// Compiles a wildcard pattern into a [`FileMatcher`]
///
/// # Errors
/// Returns [`DomainError::InvalidFilterPattern`] if the translated regular
/// expression cannot be built.
pub fn compile_filter(pattern: &str) -> Result<FileMatcher, DomainError> {
    let pattern = pattern.trim();

    if pattern.is_empty() || pattern == "*" || pattern == "*.*" {
        return Ok(FileMatcher::All);
    }

    if let Some(ext) = pattern.strip_prefix("*.") {
        if !ext.is_empty() && !ext.contains(['*', '?']) {
            return Ok(FileMatcher::Extension(format!(".{}", ext.to_lowercase())));
        }
    }

    let regex = RegexBuilder::new(&glob_to_regex(pattern))
        .case_insensitive(true)
        .build()
        .map_err(|e| DomainError::InvalidFilterPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

    Ok(FileMatcher::Pattern {
        source: pattern.to_string(),
        regex,
    })
}

/// Escapes regex metacharacters, then maps `*` to `.*` and `?` to `.`
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    out.push('$');
    out
}
