// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse_cli()             │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration: every argument security-checked, every path
/// canonicalized.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

/// Validated command variants, one per [`parser::Commands`] entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedCommand {
    /// Run the scheduler and HTTP scrape endpoint until shutdown.
    Serve,
    /// Load and validate configuration, print the result, and exit.
    ValidateConfig,
    /// Print every registered collector name, tier, and enabled state, and exit.
    ListCollectors,
}

/// Parses `std::env::args()` with `clap` and runs it through
/// [`SecureArgParser::validate`].
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    SecureArgParser::validate(parser::parse_cli())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_with_no_config_validates_cleanly() {
        let cli = Cli { command: Commands::Serve, config: None, verbose: false };
        let validated = SecureArgParser::validate(cli).unwrap();
        assert_eq!(validated.command, ValidatedCommand::Serve);
        assert!(validated.config.is_none());
    }
}
