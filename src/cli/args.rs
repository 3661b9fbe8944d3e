//! CLI argument definitions using clap
//!
//! Commands:
//! - keyguard check --config <path> [--mode <mode>]
//! - keyguard inspect --config <path> [--show-payload]
//! - keyguard monitor --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::reconcile::CheckMode;

/// keyguard - device identity key backup and recovery
#[derive(Parser, Debug)]
#[command(name = "keyguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare live keys with the backup and reconcile once
    ///
    /// A restore in automatic mode exits with status 75 to request a
    /// restart from the supervisor.
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./keyguard.json")]
        config: PathBuf,

        /// automatic, automatic-no-restart, check-only or save-current
        #[arg(long, default_value = "automatic")]
        mode: CheckMode,
    },

    /// Print the backup record without modifying anything
    Inspect {
        /// Path to configuration file
        #[arg(long, default_value = "./keyguard.json")]
        config: PathBuf,

        /// Include the key payload, base64 encoded
        #[arg(long)]
        show_payload: bool,
    },

    /// Read connection events as JSON lines from stdin and react to failures
    Monitor {
        /// Path to configuration file
        #[arg(long, default_value = "./keyguard.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
