//! Projects CLI — command-line frontend.
//!
//! This crate contains argument parsing, configuration resolution and
//! output formatting. Discovery logic lives in `projects-core`.
pub mod args;
pub mod commands;
pub mod settings;

pub use args::{Cli, Command};
pub use commands::{run, Outcome};
pub use settings::Settings;
