// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exporter Core
//!
//! The tiered collection engine: a long-running process that polls a vendor
//! REST API for an organization/network/device hierarchy, transforms results
//! into a dimensional metric model, and serves them over HTTP in a
//! pull-based scrape format.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (collectors: OrganizationCollector, DeviceCollector + family│
//! │   sub-collectors)                                            │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (exporter-domain)            │
//! │  (Tier, SeriesKey, ExporterError, Collector/UpstreamApi ports)│
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                          │
//! │  (scheduler, collector registry, inventory cache, execution  │
//! │   pipeline, metric registry, cardinality monitor, health      │
//! │   accounting, reqwest API client, HTTP scrape endpoint)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! | Component | Module |
//! |---|---|
//! | Scheduler (C1) | `infrastructure::engine::scheduler` |
//! | Collector Registry (C2) | `infrastructure::engine::collector_registry` |
//! | Inventory Cache (C3) | `infrastructure::engine::inventory` |
//! | Execution Pipeline (C4) | `infrastructure::engine::pipeline` |
//! | Metric Registry (C5) | `infrastructure::metrics::registry` |
//! | Cardinality Monitor (C6) | `infrastructure::metrics::cardinality` |
//! | Health & Error Accounting (C7) | `infrastructure::engine::health` |
//!
//! Control flow: the Scheduler fires a tick for a tier; the Registry yields
//! the tier's collectors; each collector receives a cycle context and runs
//! under the Execution Pipeline's concurrency and timeout governors.
//! Collectors read from the Inventory Cache, write through the Metric
//! Registry, and report outcomes to Health Accounting. The HTTP endpoint
//! reads a snapshot of the Metric Registry on demand.

pub mod application;
pub mod infrastructure;

pub use exporter_domain::{
    CardinalitySnapshot, Collector, CollectorDescriptor, CollectorOutcome, CycleContext, ErrorCategory, ErrorRecord,
    ExporterError, InventoryEntry, InventoryKind, LabelSchema, MetricDefinition, MetricKind, Sample, SampleValue,
    SeriesKey, Tier, UpstreamApi,
};
