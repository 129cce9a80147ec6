// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Health & Error Accounting (C7)
//!
//! Owns the five standing metrics every collector gets for free (§4.7):
//! `collector_last_success_timestamp_seconds`, `collector_consecutive_failures`,
//! `errors_total{collector,category}`, `collector_duration_seconds{collector,tier}`,
//! and `api_calls_total{collector,endpoint}`. The last of these is written by
//! the API façade layer, not the collector itself, so attribution flows
//! through a [`tokio::task_local!`] the Scheduler sets up per collector run
//! rather than threading a collector name through every façade call.

use crate::infrastructure::metrics::registry::MetricRegistry;
use chrono::{DateTime, Utc};
use exporter_domain::{CollectorOutcome, ExporterError, LabelSchema, MetricDefinition, MetricKind, Tier};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

tokio::task_local! {
    static CURRENT_COLLECTOR: (String, Tier);
}

/// Runs `f` with `(collector_name, tier)` available to
/// [`current_collector`] for the duration of the future — set by the
/// Scheduler/Execution Pipeline around each `collect()` invocation.
pub async fn with_collector_context<F, Fut, T>(name: String, tier: Tier, f: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    CURRENT_COLLECTOR.scope((name, tier), f()).await
}

/// The collector attributed to the currently running task, if any (set by
/// [`with_collector_context`]).
pub fn current_collector() -> Option<(String, Tier)> {
    CURRENT_COLLECTOR.try_with(|c| c.clone()).ok()
}

pub struct HealthAccounting {
    registry: Arc<MetricRegistry>,
    max_consecutive_failures: u32,
    consecutive_failures: RwLock<HashMap<String, u32>>,
    last_success: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl HealthAccounting {
    pub fn new(registry: Arc<MetricRegistry>, max_consecutive_failures: u32) -> Self {
        Self {
            registry,
            max_consecutive_failures,
            consecutive_failures: RwLock::new(HashMap::new()),
            last_success: RwLock::new(HashMap::new()),
        }
    }

    /// Registers the five standing metrics. Must run once at startup before
    /// any cycle records an outcome.
    pub fn register_metrics(&self) -> Result<(), ExporterError> {
        self.registry.register(MetricDefinition::new(
            "collector_last_success_timestamp_seconds",
            MetricKind::Gauge,
            "Unix timestamp of the collector's last non-failed run",
            LabelSchema::new(["collector"])?,
        )?)?;
        self.registry.register(MetricDefinition::new(
            "collector_consecutive_failures",
            MetricKind::Gauge,
            "Consecutive failed runs for this collector",
            LabelSchema::new(["collector"])?,
        )?)?;
        self.registry.register(MetricDefinition::new(
            "errors_total",
            MetricKind::Counter,
            "Collector errors by category",
            LabelSchema::new(["collector", "category"])?,
        )?)?;
        self.registry.register(MetricDefinition::new(
            "collector_duration_seconds",
            MetricKind::Histogram,
            "Collector run duration",
            LabelSchema::new(["collector", "tier"])?,
        )?)?;
        self.registry.register(MetricDefinition::new(
            "api_calls_total",
            MetricKind::Counter,
            "Upstream API calls by collector and endpoint",
            LabelSchema::new(["collector", "endpoint"])?,
        )?)?;
        Ok(())
    }

    /// Records one collector run: success/failure bookkeeping, the error
    /// counter per category, and the duration histogram.
    pub fn record_outcome(&self, name: &str, tier: Tier, outcome: &CollectorOutcome, duration: Duration, now: DateTime<Utc>) {
        let mut collector_label = HashMap::new();
        collector_label.insert("collector".to_string(), name.to_string());

        match outcome {
            CollectorOutcome::Ok | CollectorOutcome::Partial { .. } => {
                self.last_success.write().insert(name.to_string(), now);
                let _ = self.registry.set_gauge(
                    "collector_last_success_timestamp_seconds",
                    &collector_label,
                    now.timestamp() as f64,
                    tier,
                );
                self.reset_failures(name, tier);
            }
            CollectorOutcome::Failed { .. } => {
                self.bump_failures(name, tier);
            }
        }

        for (category, _message) in outcome.errors() {
            let mut error_labels = collector_label.clone();
            error_labels.insert("category".to_string(), category.as_str().to_string());
            let _ = self.registry.inc_counter("errors_total", &error_labels, 1.0, tier);
        }

        let mut duration_labels = HashMap::new();
        duration_labels.insert("collector".to_string(), name.to_string());
        duration_labels.insert("tier".to_string(), tier.as_str().to_string());
        let _ = self.registry.observe_histogram("collector_duration_seconds", &duration_labels, duration.as_secs_f64(), tier);
    }

    /// Attributes one upstream call to whatever collector is running in the
    /// current task, a no-op if called outside a collector's scope.
    pub fn record_api_call(&self, endpoint: &str) {
        if let Some((name, tier)) = current_collector() {
            let mut labels = HashMap::new();
            labels.insert("collector".to_string(), name);
            labels.insert("endpoint".to_string(), endpoint.to_string());
            let _ = self.registry.inc_counter("api_calls_total", &labels, 1.0, tier);
        }
    }

    fn reset_failures(&self, name: &str, tier: Tier) {
        self.consecutive_failures.write().insert(name.to_string(), 0);
        let mut labels = HashMap::new();
        labels.insert("collector".to_string(), name.to_string());
        let _ = self.registry.set_gauge("collector_consecutive_failures", &labels, 0.0, tier);
    }

    fn bump_failures(&self, name: &str, tier: Tier) {
        let count = {
            let mut guard = self.consecutive_failures.write();
            let entry = guard.entry(name.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        let mut labels = HashMap::new();
        labels.insert("collector".to_string(), name.to_string());
        let _ = self.registry.set_gauge("collector_consecutive_failures", &labels, count as f64, tier);

        if count == self.max_consecutive_failures {
            error!(collector = name, consecutive_failures = count, "collector crossed max_consecutive_failures");
        }
    }

    /// A collector is stale if its last success is older than
    /// `tier_period * multiplier`, or it has never succeeded.
    pub fn is_stale(&self, name: &str, tier_period: Duration, multiplier: f64, now: DateTime<Utc>) -> bool {
        match self.last_success.read().get(name) {
            None => true,
            Some(ts) => match (now - *ts).to_std() {
                Ok(age) => age.as_secs_f64() > tier_period.as_secs_f64() * multiplier,
                Err(_) => false,
            },
        }
    }
}
