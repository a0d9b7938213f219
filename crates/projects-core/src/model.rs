//! The discovered-project record.
//!
//! A `Match` is the only value that leaves the walker. Its text form,
//! `name=full_path`, is the record format of the cache file.
use compact_str::CompactString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A discovered project root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Match {
    /// Base name of the project directory.
    pub name: CompactString,
    /// Full path of the project directory, as reached from the scan root.
    pub full_path: PathBuf,
}

impl Match {
    pub fn new(name: impl Into<CompactString>, full_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
        }
    }

    /// Build a match for a directory, naming it after its final component.
    ///
    /// Paths without a final component (`/`, `..`) fall back to the whole
    /// path rendered lossily.
    pub fn from_path(path: &Path) -> Self {
        let name = match path.file_name() {
            Some(n) => CompactString::new(n.to_string_lossy()),
            None => CompactString::new(path.to_string_lossy()),
        };
        Self {
            name,
            full_path: path.to_path_buf(),
        }
    }

    /// Render the cache record for this match, without a trailing newline.
    pub fn to_line(&self) -> String {
        format!("{}={}", self.name, self.full_path.display())
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.full_path.display())
    }
}

/// A cache record that could not be split into `name=path`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected `name=path`, found {0:?}")]
pub struct ParseMatchError(pub String);

impl FromStr for Match {
    type Err = ParseMatchError;

    /// Parse one cache record.
    ///
    /// Both fields may contain `=`, so the separator is the first `=` after
    /// which the path's base name equals the name before it. Records written
    /// by [`Match::to_line`] for a directory always have such a split. Lines
    /// without one are split at the first `=`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let trimmed = line.trim();
        let mut first = None;
        for (at, _) in trimmed.match_indices('=') {
            let (name, path) = (&trimmed[..at], &trimmed[at + 1..]);
            if Path::new(path).file_name().is_some_and(|n| n == name) {
                return Ok(Self::new(name, path));
            }
            first.get_or_insert((name, path));
        }
        match first {
            Some((name, path)) => Ok(Self::new(name, path)),
            None => Err(ParseMatchError(trimmed.to_string())),
        }
    }
}
