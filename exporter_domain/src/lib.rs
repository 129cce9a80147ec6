// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exporter Domain
//!
//! Pure business logic for the tiered collection engine: no tokio runtime, no
//! tracing, no HTTP client. This crate defines the shapes collectors and the
//! engine agree on and the ports infrastructure implements.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │  (Scheduler, Execution Pipeline, Metric Registry - core)     │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (this crate)                 │
//! │  (Tier, SeriesKey, CollectorDescriptor, ExporterError, ports) │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                          │
//! │  (reqwest upstream client, HTTP scrape endpoint)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `error` — the closed error taxonomy (`ExporterError`) every collector and
//!   port returns.
//! - `value_objects` — `Tier`, `SeriesKey`, `LabelSchema`, `MetricKind`.
//! - `entities` — `CollectorDescriptor`, `CycleContext`, `InventoryEntry`,
//!   `MetricDefinition`, `Sample`, `CardinalitySnapshot`, `ErrorRecord`.
//! - `ports` — `UpstreamApi` and `Collector`, the two traits infrastructure
//!   and application collectors implement against.

pub mod entities;
pub mod error;
pub mod ports;
pub mod value_objects;

pub use entities::{
    CardinalitySnapshot, CollectorDescriptor, CollectorOutcome, CycleContext, ErrorRecord,
    InventoryEntry, InventoryKind, LabelUsage, MetricDefinition, Sample, SampleValue,
};
pub use error::{ErrorCategory, ExporterError};
pub use ports::{Collector, UpstreamApi};
pub use value_objects::{LabelSchema, MetricKind, SeriesKey, Tier};
