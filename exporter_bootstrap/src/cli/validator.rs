// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security validation for parsed CLI arguments: the `--config` path, if
//! given, must exist, be a regular file, and carry a `.toml` extension
//! before anything downstream treats it as trusted input.

use super::parser::{Cli, Commands};
use super::{ValidatedCli, ValidatedCommand};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("config path does not exist: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config path is not a file: {0}")]
    ConfigNotAFile(PathBuf),

    #[error("config path must have a .toml extension: {0}")]
    ConfigWrongExtension(PathBuf),

    #[error("failed to canonicalize config path {path}: {source}")]
    Canonicalize { path: PathBuf, source: std::io::Error },
}

pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates a `Cli` into a `ValidatedCli`, canonicalizing `--config`
    /// (if present) and rejecting anything that is not a real `.toml` file.
    pub fn validate(cli: Cli) -> Result<ValidatedCli, ParseError> {
        let config = cli.config.map(Self::validate_config_path).transpose()?;

        let command = match cli.command {
            Commands::Serve => ValidatedCommand::Serve,
            Commands::ValidateConfig => ValidatedCommand::ValidateConfig,
            Commands::ListCollectors => ValidatedCommand::ListCollectors,
        };

        Ok(ValidatedCli { command, verbose: cli.verbose, config })
    }

    fn validate_config_path(path: PathBuf) -> Result<PathBuf, ParseError> {
        if !path.exists() {
            return Err(ParseError::ConfigNotFound(path));
        }
        if !path.is_file() {
            return Err(ParseError::ConfigNotAFile(path));
        }
        let has_toml_extension = path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.eq_ignore_ascii_case("toml")).unwrap_or(false);
        if !has_toml_extension {
            return Err(ParseError::ConfigWrongExtension(path));
        }
        path_canonicalize(&path)
    }
}

fn path_canonicalize(path: &Path) -> Result<PathBuf, ParseError> {
    path.canonicalize().map_err(|source| ParseError::Canonicalize { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_config(path: PathBuf) -> Cli {
        Cli { command: Commands::Serve, config: Some(path), verbose: false }
    }

    // Minimal scratch-file helper; this crate has no tempfile dependency, and
    // a PID + test-name suffix keeps concurrently running tests from
    // colliding on the same path.
    fn scratch_file(test_name: &str, suffix: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("exporter-bootstrap-test-{}-{test_name}{suffix}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_config_file_is_rejected() {
        let result = SecureArgParser::validate(cli_with_config(PathBuf::from("/nonexistent/exporter.toml")));
        assert!(matches!(result, Err(ParseError::ConfigNotFound(_))));
    }

    #[test]
    fn wrong_extension_is_rejected() {
        let path = scratch_file("wrong-extension", ".yaml", "not toml");
        let result = SecureArgParser::validate(cli_with_config(path.clone()));
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ParseError::ConfigWrongExtension(_))));
    }

    #[test]
    fn valid_toml_file_is_accepted_and_canonicalized() {
        let path = scratch_file("valid-toml", ".toml", "[api]\nkey = \"x\"\n");
        let validated = SecureArgParser::validate(cli_with_config(path.clone())).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(validated.config.unwrap().is_absolute());
    }
}
