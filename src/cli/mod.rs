//! CLI module
//!
//! Offline inspection of a configuration:
//! - check: boot and summarize
//! - explain: show one entity's compiled plan
//! - fanout: show what a change on a table triggers

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check, explain, fanout, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
