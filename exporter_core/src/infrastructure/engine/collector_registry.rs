// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Collector Registry (C2)
//!
//! Discovers collector implementations at startup (statically — no dynamic
//! plugin loading per §4.2) and groups them by tier in registration order.
//! The Registry never sees a coordinator's sub-collectors; those are an
//! implementation detail of the coordinating `Collector` itself (§9's
//! composition-over-inheritance note).

use crate::infrastructure::engine::inventory::InventoryCache;
use crate::infrastructure::metrics::registry::MetricRegistry;
use exporter_domain::{Collector, CollectorDescriptor, ExporterError, Tier};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// The concrete inventory handle type every collector receives — a
/// non-owning, cheaply cloned reference to the cycle's cache.
pub type Inventory = Arc<InventoryCache>;

/// The concrete metric-sink handle: a tier-stamped writer over the shared
/// Metric Registry, defined alongside the registry in
/// `infrastructure::metrics::registry`.
#[derive(Clone)]
pub struct MetricSink {
    pub registry: Arc<MetricRegistry>,
    pub tier: Tier,
}

impl MetricSink {
    pub fn new(registry: Arc<MetricRegistry>, tier: Tier) -> Self {
        Self { registry, tier }
    }

    pub fn set_gauge(&self, name: &str, labels: &std::collections::HashMap<String, String>, value: f64) -> Result<(), ExporterError> {
        self.registry.set_gauge(name, labels, value, self.tier)
    }

    pub fn inc_counter(&self, name: &str, labels: &std::collections::HashMap<String, String>, delta: f64) -> Result<(), ExporterError> {
        self.registry.inc_counter(name, labels, delta, self.tier)
    }

    pub fn set_counter_from_absolute(
        &self,
        name: &str,
        labels: &std::collections::HashMap<String, String>,
        absolute: f64,
    ) -> Result<(), ExporterError> {
        self.registry.set_counter_from_absolute(name, labels, absolute, self.tier)
    }

    pub fn observe_histogram(&self, name: &str, labels: &std::collections::HashMap<String, String>, value: f64) -> Result<(), ExporterError> {
        self.registry.observe_histogram(name, labels, value, self.tier)
    }

    pub fn set_info(&self, name: &str, labels: &std::collections::HashMap<String, String>) -> Result<(), ExporterError> {
        self.registry.set_info(name, labels, self.tier)
    }
}

pub type EngineCollector = dyn Collector<Inventory, MetricSink>;

/// Discovers and groups collectors by tier, in registration order.
pub struct CollectorRegistry {
    by_tier: std::collections::HashMap<Tier, Vec<CollectorDescriptor<EngineCollector>>>,
    names: HashSet<String>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self { by_tier: std::collections::HashMap::new(), names: HashSet::new() }
    }

    /// Registers a collector, rejecting a duplicate name (§4.2). `enabled`
    /// is the config-evaluated gate; a disabled collector is still recorded
    /// (for `all()` diagnostics) but excluded from `by_tier`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        tier: Tier,
        enabled: bool,
        timeout: Duration,
        collector: Arc<EngineCollector>,
    ) -> Result<(), ExporterError> {
        let name = name.into();
        if !self.names.insert(name.clone()) {
            return Err(ExporterError::validation(format!("duplicate collector name: {name}")));
        }
        if enabled {
            let descriptor = CollectorDescriptor::new(name, tier, enabled, timeout, collector);
            self.by_tier.entry(tier).or_default().push(descriptor);
        }
        Ok(())
    }

    /// Collectors for one tier, in registration order.
    pub fn by_tier(&self, tier: Tier) -> &[CollectorDescriptor<EngineCollector>] {
        self.by_tier.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every registered collector name, enabled or not, for diagnostics.
    pub fn all_names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// `(name, tier)` for every enabled collector, for staleness checks that
    /// need a tier's configured period alongside each collector's name.
    pub fn enabled_with_tier(&self) -> Vec<(String, Tier)> {
        Tier::ALL
            .iter()
            .flat_map(|tier| self.by_tier(*tier).iter().map(|d| (d.name.clone(), *tier)))
            .collect()
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
