// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Raw `clap` structure: unvalidated user input, straight off the command
//! line. [`super::validator`] is the only place that trusts it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "exporter", version, about = "Tiered Meraki metrics collection exporter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file, layered over compiled defaults and
    /// under `EXPORTER_`-prefixed environment variables.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging regardless of `RUST_LOG`.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the scheduler and HTTP scrape endpoint until shutdown.
    Serve,

    /// Load and validate configuration, print the result, and exit.
    ValidateConfig,

    /// Print every registered collector name, tier, and enabled state, and exit.
    ListCollectors,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_parses_with_no_extra_flags() {
        let cli = Cli::parse_from(["exporter", "serve"]);
        assert!(matches!(cli.command, Commands::Serve));
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_and_verbose_are_global_flags() {
        let cli = Cli::parse_from(["exporter", "--config", "exporter.toml", "--verbose", "list-collectors"]);
        assert!(matches!(cli.command, Commands::ListCollectors));
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("exporter.toml")));
    }
}
