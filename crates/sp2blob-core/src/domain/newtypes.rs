//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for run identifiers and
//! remote locations. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Characters left unescaped inside a single path segment.
///
/// Everything except the RFC 3986 unreserved set is encoded, including `/`,
/// so a name that contains a slash stays one segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes one path segment for use inside a URL.
#[must_use]
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

// ============================================================================
// RunId
// ============================================================================

/// Identifier of a single copy run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid RunId: {e}")))
    }
}

// ============================================================================
// RemoteFolderPath
// ============================================================================

/// A folder location inside a drive, kept as raw (unencoded) name segments
///
/// No segments means the drive root. Segments are joined with `/` for
/// display and percent-encoded one by one when placed in a request URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct RemoteFolderPath {
    segments: Vec<String>,
}

impl RemoteFolderPath {
    /// The drive root
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a user-supplied folder such as `"/Reports/2024/"`.
    ///
    /// Leading, trailing and repeated slashes are ignored, so `""` and `"/"`
    /// both yield the root.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Returns `true` for the drive root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a child path with `name` appended as a single segment
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_owned());
        Self { segments }
    }

    /// Raw name segments from the root down
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The raw path joined with `/`, empty for the root
    #[must_use]
    pub fn as_display(&self) -> String {
        self.segments.join("/")
    }

    /// The path with every segment percent-encoded, joined with `/`
    #[must_use]
    pub fn encoded(&self) -> String {
        self.segments
            .iter()
            .map(|s| encode_segment(s))
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Display for RemoteFolderPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.as_display())
        }
    }
}

impl From<String> for RemoteFolderPath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for RemoteFolderPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<RemoteFolderPath> for String {
    fn from(path: RemoteFolderPath) -> Self {
        path.as_display()
    }
}
