// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The tiered collection engine: C1 (scheduler), C2 (collector registry),
//! C3 (inventory cache), C4 (execution pipeline), C7 (health accounting).
//! C5/C6 (metric registry, cardinality monitor) live in `infrastructure::metrics`.

pub mod collector_registry;
pub mod governed_api;
pub mod health;
pub mod inventory;
pub mod pipeline;
pub mod scheduler;

pub use collector_registry::{CollectorRegistry, EngineCollector, Inventory, MetricSink};
pub use governed_api::GovernedUpstreamApi;
pub use health::HealthAccounting;
pub use inventory::InventoryCache;
pub use pipeline::ExecutionPipeline;
pub use scheduler::Scheduler;
