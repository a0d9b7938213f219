//! Projects — find version-controlled projects under a code directory.
//!
//! Thin binary entry point. All logic lives in the `projects-core`
//! and `projects-cli` crates.
use clap::Parser;
use projects_cli::{Cli, Settings};
use std::io;
use std::process::ExitCode;
use tracing::Level;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .with_writer(io::stderr)
        .init();

    match execute(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("An error occurred running projects: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> anyhow::Result<u8> {
    let settings = Settings::from_cli(cli)?;
    tracing::debug!(
        root = %settings.root.display(),
        cache = %settings.cache_path.display(),
        "Resolved settings"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = projects_cli::run(&cli.command, &settings, &mut out)?;
    Ok(outcome.exit_code())
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
