// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Governed Upstream API
//!
//! The middleware chain §9 asks for in place of decorator inheritance:
//! "timing -> API-call counting -> error categorization -> structured
//! logging", applied once here rather than wrapping every call site.
//! [`GovernedUpstreamApi`] wraps the concrete façade so every call the
//! Inventory Cache and collectors make — including the `get_json` escape
//! hatch for per-family endpoints — passes through the Execution Pipeline's
//! global semaphore, retry, and rate-limit pause policy, and is attributed to
//! the currently running collector via Health Accounting's task-local.
//!
//! This is the one seam where "inventory cache calls the API" and "the
//! pipeline governs API calls" meet: everything below this type is a plain
//! HTTP round trip, everything above it never touches `reqwest` directly.

use crate::infrastructure::engine::health::HealthAccounting;
use crate::infrastructure::engine::pipeline::ExecutionPipeline;
use async_trait::async_trait;
use exporter_domain::{ExporterError, UpstreamApi};
use serde_json::Value;
use std::sync::Arc;

pub struct GovernedUpstreamApi {
    inner: Arc<dyn UpstreamApi>,
    pipeline: Arc<ExecutionPipeline>,
    health: Arc<HealthAccounting>,
}

impl GovernedUpstreamApi {
    pub fn new(inner: Arc<dyn UpstreamApi>, pipeline: Arc<ExecutionPipeline>, health: Arc<HealthAccounting>) -> Self {
        Self { inner, pipeline, health }
    }
}

#[async_trait]
impl UpstreamApi for GovernedUpstreamApi {
    async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
        self.health.record_api_call("organizations");
        self.pipeline.call(|| self.inner.list_organizations()).await
    }

    async fn list_networks(&self, org_id: &str) -> Result<Vec<Value>, ExporterError> {
        self.health.record_api_call("networks");
        self.pipeline.call(|| self.inner.list_networks(org_id)).await
    }

    async fn list_devices(&self, org_id: &str, filters: &[String]) -> Result<Vec<Value>, ExporterError> {
        self.health.record_api_call("devices");
        self.pipeline.call(|| self.inner.list_devices(org_id, filters)).await
    }

    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ExporterError> {
        self.health.record_api_call(path);
        self.pipeline.call(|| self.inner.get_json(path, query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::IntervalsConfig;
    use crate::infrastructure::metrics::registry::MetricRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FlakyApi {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UpstreamApi for FlakyApi {
        async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(ExporterError::api_rate_limit("slow down"))
            } else {
                Ok(vec![])
            }
        }
        async fn list_networks(&self, _org_id: &str) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![])
        }
        async fn list_devices(&self, _org_id: &str, _filters: &[String]) -> Result<Vec<Value>, ExporterError> {
            Ok(vec![])
        }
        async fn get_json(&self, _path: &str, _query: &[(String, String)]) -> Result<Value, ExporterError> {
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn retries_through_the_pipeline_transparently() {
        let registry = Arc::new(MetricRegistry::new(
            IntervalsConfig { fast_secs: 60, medium_secs: 300, slow_secs: 900 },
            2.0,
        ));
        let health = Arc::new(HealthAccounting::new(registry, 10));
        health.register_metrics().unwrap();
        let pipeline = Arc::new(ExecutionPipeline::new(2, 3, Duration::from_millis(10), 20, Duration::from_millis(0)));
        let inner = Arc::new(FlakyApi { calls: AtomicUsize::new(0) });
        let governed = GovernedUpstreamApi::new(inner.clone(), pipeline, health);

        let result = governed.list_organizations().await;
        assert!(result.is_ok());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
