// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The collector contract every tier member and coordinator implements.

use crate::entities::{CollectorOutcome, CycleContext};
use crate::value_objects::Tier;
use async_trait::async_trait;

/// `Collector { name(); tier(); collect(ctx) → Result }` from §9's
/// re-architecture note. A coordinator collector (§4.4's `DeviceCollector`)
/// holds an ordered `Vec<Arc<dyn Collector<I, M>>>` of sub-collectors and
/// calls them in registration order — composition, not inheritance.
#[async_trait]
pub trait Collector<I, M>: Send + Sync
where
    I: Send + Sync + 'static,
    M: Send + Sync + 'static,
{
    fn name(&self) -> &str;

    fn tier(&self) -> Tier;

    async fn collect(&self, ctx: &CycleContext<I, M>) -> CollectorOutcome;
}
