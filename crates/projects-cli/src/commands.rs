//! Command dispatch.
//!
//! Commands write their results to a caller-supplied writer so they can be
//! exercised without a terminal.
use crate::args::Command;
use crate::settings::Settings;
use anyhow::{Context, Result};
use projects_core::lister::ProjectLister;
use projects_core::Match;
use std::io::Write;
use tracing::debug;

/// Exit status when `path` finds no project of that name.
pub const EXIT_NOT_FOUND: u8 = 2;

/// How a successfully executed command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// `path` was asked for a project that is not in the list.
    NotFound,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NotFound => EXIT_NOT_FOUND,
        }
    }
}

pub fn run<W: Write>(command: &Command, settings: &Settings, out: &mut W) -> Result<Outcome> {
    let lister = ProjectLister::new(&settings.root, &settings.cache_path)
        .with_options(settings.options.clone());
    debug!(?command, root = %settings.root.display(), "Running command");

    match command {
        Command::Regenerate => {
            lister
                .regenerate()
                .with_context(|| format!("regenerating {}", settings.cache_path.display()))?;
            Ok(Outcome::Success)
        }
        Command::List => {
            let matches = lister.cached_matches()?;
            print_names(out, &matches)?;
            Ok(Outcome::Success)
        }
        Command::Live => {
            let matches = lister.live_matches()?;
            print_names(out, &matches)?;
            Ok(Outcome::Success)
        }
        Command::Path { name } => match lister.find(name)? {
            Some(m) => {
                writeln!(out, "{}", m.full_path.display())?;
                Ok(Outcome::Success)
            }
            None => Ok(Outcome::NotFound),
        },
    }
}

fn print_names<W: Write>(out: &mut W, matches: &[Match]) -> Result<()> {
    for m in matches {
        writeln!(out, "{}", m.name)?;
    }
    out.flush()?;
    Ok(())
}
