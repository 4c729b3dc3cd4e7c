//! CLI argument definitions using clap
//!
//! Commands:
//! - searchsync check --config <path>
//! - searchsync explain --config <path> --entity <name> [--json]
//! - searchsync fanout --config <path> --table <name> [--json]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// searchsync - keeps a search index in step with a relational database
#[derive(Parser, Debug)]
#[command(name = "searchsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Write INFO and TRACE log lines as well
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load configuration and catalog, compile every plan, print a summary
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./searchsync.json")]
        config: PathBuf,
    },

    /// Print the compiled load plan of one entity
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./searchsync.json")]
        config: PathBuf,

        /// Entity name
        #[arg(long)]
        entity: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the projection queries a change on a table triggers
    Fanout {
        /// Path to configuration file
        #[arg(long, default_value = "./searchsync.json")]
        config: PathBuf,

        /// Table name
        #[arg(long)]
        table: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_explain() {
        let cli = Cli::try_parse_from([
            "searchsync",
            "explain",
            "--config",
            "c.json",
            "--entity",
            "artist",
            "--json",
        ])
        .unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Command::Explain { config, entity, json } => {
                assert_eq!(config, PathBuf::from("c.json"));
                assert_eq!(entity, "artist");
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["searchsync", "-v", "check"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Check { config } => assert_eq!(config, PathBuf::from("./searchsync.json")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_fanout_requires_table() {
        assert!(Cli::try_parse_from(["searchsync", "fanout"]).is_err());
    }
}
