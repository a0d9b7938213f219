//! Project lister — live and cached views of the projects under a root.
use crate::cache::{CacheError, ProjectCache};
use crate::model::Match;
use crate::sink::MatchSink;
use crate::walker::{DirectoryScanner, ScanError, ScanOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ListerError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone)]
pub struct ProjectLister {
    root: PathBuf,
    cache: ProjectCache,
    options: ScanOptions,
}

impl ProjectLister {
    pub fn new(root: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: ProjectCache::new(cache_path),
            options: ScanOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cache(mut self, cache: ProjectCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &ProjectCache {
        &self.cache
    }

    /// Scan the root now. Sorted by name, then path.
    pub fn live_matches(&self) -> Result<Vec<Match>, ListerError> {
        let sink = Arc::new(MatchSink::new());
        let collector = Arc::clone(&sink);
        DirectoryScanner::new(&self.root)
            .with_options(self.options.clone())
            .scan(move |m| collector.add(m))?;
        Ok(sink.snapshot())
    }

    /// Scan the root and replace the cache with the result.
    pub fn regenerate(&self) -> Result<Vec<Match>, ListerError> {
        let matches = self.live_matches()?;
        self.cache.write(&matches)?;
        info!(
            projects = matches.len(),
            cache = %self.cache.path().display(),
            "Regenerated project cache"
        );
        Ok(matches)
    }

    /// Read the cache, regenerating it first when it is stale or missing.
    pub fn cached_matches(&self) -> Result<Vec<Match>, ListerError> {
        if self.cache.is_expired() {
            return self.regenerate();
        }
        Ok(self.cache.read()?)
    }

    /// First cached project called `name`.
    pub fn find(&self, name: &str) -> Result<Option<Match>, ListerError> {
        Ok(self
            .cached_matches()?
            .into_iter()
            .find(|m| m.name == name))
    }
}
