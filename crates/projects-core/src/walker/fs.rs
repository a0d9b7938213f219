//! Filesystem query capability used by the walker.
//!
//! The walker only ever asks two questions of the filesystem: "what is in
//! this directory" and "does this path exist / is it a directory". Keeping
//! them behind a trait lets tests inject listing failures without relying
//! on permission bits, which a privileged test runner ignores.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    /// Taken from the entry itself; a symlink to a directory is `false`.
    pub is_dir: bool,
}

impl DirectoryEntry {
    pub fn new(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            is_dir,
        }
    }
}

/// The subset of path metadata the walker needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathMetadata {
    pub is_dir: bool,
}

pub trait FileSystem: Send + Sync {
    /// Metadata for `path`, following symlinks.
    fn metadata(&self, path: &Path) -> io::Result<PathMetadata>;

    /// List the immediate children of `path`.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirectoryEntry>>;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }
}

/// The real filesystem via `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn metadata(&self, path: &Path) -> io::Result<PathMetadata> {
        let meta = fs::metadata(path)?;
        Ok(PathMetadata {
            is_dir: meta.is_dir(),
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirectoryEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            // An entry whose type cannot be read is treated as a plain file.
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(DirectoryEntry {
                path: entry.path(),
                is_dir,
            });
        }
        Ok(entries)
    }
}
