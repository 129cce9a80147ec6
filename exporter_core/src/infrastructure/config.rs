// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration
//!
//! Environment-driven, nested configuration per §6.1. Layering, low to high
//! precedence:
//!
//! 1. Compiled-in defaults ([`AppConfig::default`]).
//! 2. An optional TOML file (`--config` / `EXPORTER_CONFIG_FILE`).
//! 3. Environment variables, prefixed `EXPORTER_` with `__` as the nesting
//!    separator (e.g. `EXPORTER_API__CONCURRENCY_LIMIT=10`).
//!
//! Every key in the distilled spec's table is a field here; [`AppConfig::validate`]
//! enforces the documented ranges and relationships (e.g. medium interval
//! must be an integer multiple of the fast interval) as a fatal startup
//! error, matching the domain's `Tier::validate_periods`.

use exporter_domain::{ExporterError, Tier};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub concurrency_limit: usize,
    pub batch_size: usize,
    pub batch_delay_secs: f64,
    pub rate_limit_retry_wait_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalsConfig {
    pub fast_secs: u64,
    pub medium_secs: u64,
    pub slow_secs: u64,
}

impl IntervalsConfig {
    pub fn period(&self, tier: Tier) -> Duration {
        Duration::from_secs(match tier {
            Tier::Fast => self.fast_secs,
            Tier::Medium => self.medium_secs,
            Tier::Slow => self.slow_secs,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorsConfig {
    /// `None` means "all" per §6.1's default.
    pub enabled: Option<Vec<String>>,
    pub timeout_secs: u64,
}

impl CollectorsConfig {
    pub fn is_enabled(&self, name: &str) -> bool {
        match &self.enabled {
            None => true,
            Some(names) => names.iter().any(|n| n == name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardinalityThresholds {
    pub warning: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub max_consecutive_failures: u32,
    pub metric_ttl_multiplier: f64,
    pub cardinality: CardinalityThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub intervals: IntervalsConfig,
    pub collectors: CollectorsConfig,
    pub monitoring: MonitoringConfig,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                key: String::new(),
                base_url: "https://api.meraki.com/api/v1".to_string(),
                timeout_secs: 30,
                max_retries: 3,
                concurrency_limit: 5,
                batch_size: 20,
                batch_delay_secs: 0.5,
                rate_limit_retry_wait_secs: 5,
            },
            intervals: IntervalsConfig { fast_secs: 60, medium_secs: 300, slow_secs: 900 },
            collectors: CollectorsConfig { enabled: None, timeout_secs: 120 },
            monitoring: MonitoringConfig {
                max_consecutive_failures: 10,
                metric_ttl_multiplier: 2.0,
                cardinality: CardinalityThresholds { warning: 1000, critical: 10000 },
            },
            server: ServerConfig { host: "0.0.0.0".to_string(), port: 9099 },
        }
    }
}

impl AppConfig {
    /// Loads defaults, an optional file, then environment overrides, and
    /// validates the result. `config_path` is typically sourced from the CLI.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ExporterError> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .map_err(|e| ExporterError::validation(format!("failed to seed config defaults: {e}")))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("exporter").required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("EXPORTER").separator("__").try_parsing(true),
        );

        let raw = builder
            .build()
            .map_err(|e| ExporterError::validation(format!("failed to build configuration: {e}")))?;

        let cfg: AppConfig =
            raw.try_deserialize().map_err(|e| ExporterError::validation(format!("failed to parse configuration: {e}")))?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ExporterError> {
        Tier::validate_periods(
            Duration::from_secs(self.intervals.fast_secs),
            Duration::from_secs(self.intervals.medium_secs),
            Duration::from_secs(self.intervals.slow_secs),
        )?;

        if !(10..=300).contains(&self.api.timeout_secs) {
            return Err(ExporterError::validation("api.timeout must be within [10,300]s"));
        }
        if self.api.max_retries > 10 {
            return Err(ExporterError::validation("api.max_retries must be within [0,10]"));
        }
        if !(1..=20).contains(&self.api.concurrency_limit) {
            return Err(ExporterError::validation("api.concurrency_limit must be within [1,20]"));
        }
        if !(1..=100).contains(&self.api.batch_size) {
            return Err(ExporterError::validation("api.batch_size must be within [1,100]"));
        }
        if !(0.0..=5.0).contains(&self.api.batch_delay_secs) {
            return Err(ExporterError::validation("api.batch_delay must be within [0,5]s"));
        }
        if !(1..=60).contains(&self.api.rate_limit_retry_wait_secs) {
            return Err(ExporterError::validation("api.rate_limit_retry_wait must be within [1,60]s"));
        }
        if !(30..=600).contains(&self.collectors.timeout_secs) {
            return Err(ExporterError::validation("collectors.timeout must be within [30,600]s"));
        }
        if self.monitoring.max_consecutive_failures == 0 || self.monitoring.max_consecutive_failures > 100 {
            return Err(ExporterError::validation("monitoring.max_consecutive_failures must be within [1,100]"));
        }
        if !(1.0..=10.0).contains(&self.monitoring.metric_ttl_multiplier) {
            return Err(ExporterError::validation("monitoring.metric_ttl_multiplier must be within [1,10]"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_concurrency_limit() {
        let mut cfg = AppConfig::default();
        cfg.api.concurrency_limit = 0;
        assert!(cfg.validate().is_err());
        cfg.api.concurrency_limit = 21;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_medium_not_multiple_of_fast() {
        let mut cfg = AppConfig::default();
        cfg.intervals.fast_secs = 45;
        assert!(cfg.validate().is_err());
    }
}
