// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The per-tick context a collector runs under.

use crate::value_objects::Tier;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Created at the start of each tier tick, destroyed when the tick
/// completes. Exactly one per (tier, tick) per §3.
///
/// Generic over the inventory handle and metric sink types so the domain
/// crate need not depend on the concrete cache/registry implementations that
/// live in the application layer — the context holds non-owning handles to
/// both, per §9's cyclic-reference resolution.
#[derive(Clone)]
pub struct CycleContext<I, M> {
    pub cycle_id: Uuid,
    pub tier: Tier,
    pub started_at: Instant,
    pub started_at_wall: DateTime<Utc>,
    pub deadline: Instant,
    pub inventory: I,
    pub metric_sink: M,
    cancelled: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl<I, M> CycleContext<I, M> {
    pub fn new(
        tier: Tier,
        deadline: Instant,
        inventory: I,
        metric_sink: M,
        cancelled: Arc<dyn Fn() -> bool + Send + Sync>,
    ) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            tier,
            started_at: Instant::now(),
            started_at_wall: Utc::now(),
            deadline,
            inventory,
            metric_sink,
            cancelled,
        }
    }

    /// Checked at every suspension point (§5): awaiting an upstream response,
    /// the API semaphore, a batch/backoff sleep, or another cycle's in-flight
    /// fetch.
    pub fn is_cancelled(&self) -> bool {
        (self.cancelled)()
    }

    pub fn remaining(&self) -> std::time::Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_past_deadline(&self) -> bool {
        Instant::now() >= self.deadline
    }
}
