//! Project list cache — one `name=full_path` record per line.
//!
//! A full scan of a large code directory takes long enough that interactive
//! lookups read this file instead. The file is considered stale once its
//! modification time is older than `max_age`.
use crate::model::{Match, ParseMatchError};
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Default staleness window, in minutes.
pub const DEFAULT_MAX_AGE_MINUTES: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to read cache file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write cache file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed record on line {line} of {}: {source}", path.display())]
    MalformedLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: ParseMatchError,
    },
}

#[derive(Debug, Clone)]
pub struct ProjectCache {
    path: PathBuf,
    max_age: chrono::Duration,
}

impl ProjectCache {
    /// Cache stored at `path`, stale after [`DEFAULT_MAX_AGE_MINUTES`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: chrono::Duration::minutes(DEFAULT_MAX_AGE_MINUTES),
        }
    }

    /// Override the staleness window. A negative window makes every read
    /// regenerate the cache.
    pub fn with_max_age(mut self, max_age: chrono::Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_age(&self) -> chrono::Duration {
        self.max_age
    }

    /// True when the file is missing or was last written before `now - max_age`.
    pub fn is_expired(&self) -> bool {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(t) => DateTime::<Local>::from(t),
            Err(_) => return true,
        };
        let earliest_ok = Local::now() - self.max_age;
        let expired = modified < earliest_ok;
        debug!(
            path = %self.path.display(),
            modified = %modified.format("%Y-%m-%d %H:%M:%S"),
            expired,
            "Checked cache age"
        );
        expired
    }

    /// Read every record. A missing file reads as an empty list.
    pub fn read(&self) -> Result<Vec<Match>, CacheError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut matches = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| CacheError::Read {
                path: self.path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let m = line.parse::<Match>().map_err(|source| CacheError::MalformedLine {
                path: self.path.clone(),
                line: idx + 1,
                source,
            })?;
            matches.push(m);
        }
        Ok(matches)
    }

    /// Replace the cache with `matches`.
    ///
    /// Records go to a uniquely named temporary file in the cache's
    /// directory that is then renamed over the cache. Readers never observe
    /// a half-written list, and concurrent writers never share a temporary
    /// file: the last rename wins.
    pub fn write(&self, matches: &[Match]) -> Result<(), CacheError> {
        let write_err = |source| CacheError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            for m in matches {
                writeln!(out, "{}", m.to_line()).map_err(write_err)?;
            }
            out.flush().map_err(write_err)?;
        }
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(path = %self.path.display(), records = matches.len(), "Wrote project cache");
        Ok(())
    }
}
