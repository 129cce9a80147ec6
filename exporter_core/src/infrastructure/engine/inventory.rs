// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Inventory Cache (C3)
//!
//! A per-cycle memoization layer in front of the three upstream listing
//! operations. One `InventoryCache` is constructed per (tier, tick) and
//! discarded at cycle end — caches are never shared across ticks or tiers
//! (§4.3's "independent" rule), which is what gives invariant 5
//! ("at most one upstream fetch per key per cycle") for free from a fresh
//! instance rather than from any cross-cycle bookkeeping.
//!
//! Single-flight is `tokio::sync::OnceCell` keyed per request signature: the
//! first caller for a key runs the fetch and stores the `Result` (an error is
//! cached too — a failed org listing should not hammer upstream again within
//! the same cycle); every other caller for that key awaits the same cell.

use crate::infrastructure::engine::pipeline::ExecutionPipeline;
use async_trait::async_trait;
use exporter_domain::{ExporterError, UpstreamApi};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

struct SingleFlightMap<K, V> {
    inner: Mutex<HashMap<K, Arc<OnceCell<Result<V, ExporterError>>>>>,
}

impl<K, V> SingleFlightMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V, ExporterError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ExporterError>>,
    {
        let cell = {
            let mut guard = self.inner.lock();
            guard.entry(key).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };
        cell.get_or_init(fetch).await.clone()
    }
}

/// Normalizes a device-family filter list into a canonical cache key so two
/// requests differing only in filter order or duplicates hit the same entry
/// (§4.3's "filter-set keying").
fn normalize_filters(filters: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = filters.to_vec();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// Per-cycle cache over `listOrganizations` / `listNetworks` / `listDevices`.
pub struct InventoryCache {
    api: Arc<dyn UpstreamApi>,
    pipeline: Arc<ExecutionPipeline>,
    organizations: OnceCell<Result<Vec<Value>, ExporterError>>,
    networks: SingleFlightMap<String, Vec<Value>>,
    devices: SingleFlightMap<(String, Vec<String>), Vec<Value>>,
}

impl InventoryCache {
    pub fn new(api: Arc<dyn UpstreamApi>, pipeline: Arc<ExecutionPipeline>) -> Self {
        Self {
            api,
            pipeline,
            organizations: OnceCell::new(),
            networks: SingleFlightMap::new(),
            devices: SingleFlightMap::new(),
        }
    }

    pub async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
        self.organizations.get_or_init(|| async { self.api.list_organizations().await }).await.clone()
    }

    pub async fn list_networks(&self, org_id: &str) -> Result<Vec<Value>, ExporterError> {
        let api = self.api.clone();
        let org = org_id.to_string();
        self.networks.get_or_fetch(org_id.to_string(), || async move { api.list_networks(&org).await }).await
    }

    pub async fn list_devices(&self, org_id: &str, filters: &[String]) -> Result<Vec<Value>, ExporterError> {
        let normalized = normalize_filters(filters);
        let api = self.api.clone();
        let org = org_id.to_string();
        let filters_for_call = normalized.clone();
        self.devices
            .get_or_fetch((org_id.to_string(), normalized), || async move {
                api.list_devices(&org, &filters_for_call).await
            })
            .await
    }

    /// Per-family data endpoints bypass the cache entirely — §1 treats the
    /// ~200-endpoint catalog as data the collector calls directly, not
    /// something the Inventory Cache deduplicates.
    pub async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ExporterError> {
        self.api.get_json(path, query).await
    }

    /// Exposes the Execution Pipeline's batching policy (§4.4) to high-fanout
    /// collectors without requiring them to hold their own pipeline handle.
    pub async fn run_batched<T, I, F, Fut>(&self, items: Vec<I>, op: F) -> Vec<Result<T, ExporterError>>
    where
        I: Send + 'static,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, ExporterError>>,
    {
        self.pipeline.run_batched(items, op).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingApi {
        org_calls: AtomicUsize,
    }

    #[async_trait]
    impl UpstreamApi for CountingApi {
        async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
            self.org_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![serde_json::json!({"id": "1"})])
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

    fn test_pipeline() -> Arc<ExecutionPipeline> {
        Arc::new(ExecutionPipeline::new(5, 3, std::time::Duration::from_secs(5), 20, std::time::Duration::from_millis(0)))
    }

    #[tokio::test]
    async fn duplicate_calls_within_a_cycle_fetch_once() {
        let api = Arc::new(CountingApi { org_calls: AtomicUsize::new(0) });
        let cache = InventoryCache::new(api.clone(), test_pipeline());

        let (a, b) = tokio::join!(cache.list_organizations(), cache.list_organizations());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(api.org_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn filter_normalization_is_order_independent() {
        assert_eq!(normalize_filters(&["b".to_string(), "a".to_string()]), vec!["a", "b"]);
        assert_eq!(normalize_filters(&["a".to_string(), "a".to_string()]), vec!["a"]);
    }
}
