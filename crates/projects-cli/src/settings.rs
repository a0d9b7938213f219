//! Resolved runtime configuration.
//!
//! Each setting comes from the first source that provides it: command-line
//! flag, then environment variable, then a default under the home
//! directory.
use crate::args::Cli;
use anyhow::{anyhow, Result};
use projects_core::walker::ScanOptions;
use std::env;
use std::path::{Path, PathBuf};

pub const CODE_PATH_ENV: &str = "PROJECTS_CODE_PATH";
pub const CACHE_PATH_ENV: &str = "PROJECTS_CACHE_PATH";

const DEFAULT_CODE_DIR: &str = "Code";
const DEFAULT_CACHE_FILE: &str = ".cached-projects-list";

#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub cache_path: PathBuf,
    pub options: ScanOptions,
}

impl Settings {
    /// Resolve against the process environment and home directory.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Self::resolve(cli, |key| env::var_os(key).map(PathBuf::from), dirs::home_dir())
    }

    /// Resolve with an explicit environment lookup and home directory.
    pub fn resolve<F>(cli: &Cli, env_lookup: F, home: Option<PathBuf>) -> Result<Self>
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        let pick = |flag: &Option<PathBuf>, key: &str, default: &str| -> Result<PathBuf> {
            if let Some(path) = flag {
                return Ok(path.clone());
            }
            if let Some(path) = env_lookup(key).filter(|p| !p.as_os_str().is_empty()) {
                return Ok(path);
            }
            home.as_deref()
                .map(|h: &Path| h.join(default))
                .ok_or_else(|| anyhow!("cannot determine home directory; set {key}"))
        };

        let root = pick(&cli.root, CODE_PATH_ENV, DEFAULT_CODE_DIR)?;
        let cache_path = pick(&cli.cache, CACHE_PATH_ENV, DEFAULT_CACHE_FILE)?;

        let mut options = ScanOptions::default();
        if let Some(workers) = cli.workers {
            options = options.with_workers(workers);
        }
        if let Some(marker) = &cli.marker {
            options = options.with_marker(marker);
        }

        Ok(Self {
            root,
            cache_path,
            options,
        })
    }
}
