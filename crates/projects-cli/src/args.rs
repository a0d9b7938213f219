//! Command-line arguments.
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "projects")]
#[command(about = "Find version-controlled projects under your code directory")]
#[command(version)]
pub struct Cli {
    /// Directory to search for projects [env: PROJECTS_CODE_PATH, default: ~/Code]
    #[arg(short = 'r', long = "root", value_name = "DIR", global = true)]
    pub root: Option<PathBuf>,

    /// Cache file location [env: PROJECTS_CACHE_PATH, default: ~/.cached-projects-list]
    #[arg(short = 'c', long = "cache", value_name = "FILE", global = true)]
    pub cache: Option<PathBuf>,

    /// Number of scanning threads (defaults to the number of CPUs)
    #[arg(short = 'j', long = "workers", value_name = "N", global = true)]
    pub workers: Option<usize>,

    /// Entry that marks a project root
    #[arg(short = 'm', long = "marker", value_name = "NAME", global = true)]
    pub marker: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Rescan the code directory and rewrite the cache
    Regenerate,
    /// List project names from the cache, refreshing it when stale
    #[command(visible_alias = "ls")]
    List,
    /// List project names from a fresh scan, ignoring the cache
    Live,
    /// Print the full path of the named project
    Path {
        /// Project name
        name: String,
    },
}
