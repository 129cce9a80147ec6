// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scheduler (C1)
//!
//! Drives the three tiers independently. On startup it runs one "warmup"
//! cycle per tier, sequentially Fast → Medium → Slow (§4.1), so a scrape a
//! second after boot already sees Slow-tier series. The periodic loops then
//! tick on boundaries aligned to process start, each opening a fresh
//! [`CycleContext`] with a 0.9×period deadline and handing the tier's
//! collectors to the Execution Pipeline's task group.
//!
//! **Overrun policy**: if a tier's next boundary arrives before its current
//! cycle finished, that cycle is abandoned (its `CycleContext` is marked
//! cancelled so collectors stop at their next suspension point) and the next
//! tick is skipped entirely rather than queued — `tier_overruns_total{tier}`
//! increments, and a second consecutive overrun is logged at a raised
//! severity (§4.1, §8 invariant 7).

use crate::infrastructure::config::IntervalsConfig;
use crate::infrastructure::engine::collector_registry::{CollectorRegistry, MetricSink};
use crate::infrastructure::engine::health::{with_collector_context, HealthAccounting};
use crate::infrastructure::engine::inventory::InventoryCache;
use crate::infrastructure::engine::pipeline::ExecutionPipeline;
use crate::infrastructure::metrics::registry::MetricRegistry;
use chrono::Utc;
use exporter_bootstrap::shutdown::CancellationToken;
use exporter_domain::{
    CollectorOutcome, CycleContext, ExporterError, LabelSchema, MetricDefinition, MetricKind, Tier, UpstreamApi,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};

pub struct Scheduler {
    collectors: Arc<CollectorRegistry>,
    metric_registry: Arc<MetricRegistry>,
    health: Arc<HealthAccounting>,
    api: Arc<dyn UpstreamApi>,
    pipeline: Arc<ExecutionPipeline>,
    intervals: IntervalsConfig,
    shutdown: CancellationToken,
    /// `true` until the startup warmup cycle finishes; read by the scrape
    /// endpoint so concurrent scrapers can tell a not-yet-warmed registry
    /// from a genuinely empty one (§4.1).
    warming: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(
        collectors: Arc<CollectorRegistry>,
        metric_registry: Arc<MetricRegistry>,
        health: Arc<HealthAccounting>,
        api: Arc<dyn UpstreamApi>,
        pipeline: Arc<ExecutionPipeline>,
        intervals: IntervalsConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            collectors,
            metric_registry,
            health,
            api,
            pipeline,
            intervals,
            shutdown,
            warming: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shared with the scrape endpoint so it can surface a warming
    /// indicator until the first cycle per tier has run.
    pub fn warming_flag(&self) -> Arc<AtomicBool> {
        self.warming.clone()
    }

    pub fn register_metrics(&self) -> Result<(), ExporterError> {
        self.metric_registry.register(MetricDefinition::new(
            "tier_overruns_total",
            MetricKind::Counter,
            "Tier ticks abandoned because the next boundary arrived first",
            LabelSchema::new(["tier"])?,
        )?)?;
        Ok(())
    }

    /// Runs the startup warmup, then the three periodic loops concurrently.
    /// Returns once the shutdown token is cancelled and every loop has
    /// observed it.
    pub async fn run(self: Arc<Self>) {
        self.warmup().await;
        self.warming.store(false, Ordering::Relaxed);

        let process_start = Instant::now();
        let fast = tokio::spawn(self.clone().tier_loop(Tier::Fast, process_start));
        let medium = tokio::spawn(self.clone().tier_loop(Tier::Medium, process_start));
        let slow = tokio::spawn(self.clone().tier_loop(Tier::Slow, process_start));

        let _ = tokio::join!(fast, medium, slow);
    }

    async fn warmup(&self) {
        info!("running startup warmup cycle: fast -> medium -> slow");
        for tier in Tier::ALL {
            if self.shutdown.is_cancelled() {
                return;
            }
            let deadline = Instant::now() + self.intervals.period(tier).mul_f64(0.9);
            self.run_cycle(tier, deadline, Arc::new(AtomicBool::new(false))).await;
        }
    }

    async fn tier_loop(self: Arc<Self>, tier: Tier, process_start: Instant) {
        let period = self.intervals.period(tier);
        let first_tick = process_start + period;
        let mut interval = tokio::time::interval_at(first_tick.into(), period);
        let mut consecutive_overruns: u32 = 0;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = interval.tick() => {}
            }
            if self.shutdown.is_cancelled() {
                return;
            }

            let deadline = Instant::now() + period.mul_f64(0.9);
            let abandoned = Arc::new(AtomicBool::new(false));
            let mut tasks = self.spawn_cycle_tasks(tier, deadline, abandoned.clone());

            tokio::select! {
                _ = drain(&mut tasks) => {
                    consecutive_overruns = 0;
                }
                _ = interval.tick() => {
                    // The cooperative `abandoned` flag only stops a collector
                    // at its next suspension point; abort the task set too so
                    // nothing from this cycle keeps running detached once the
                    // next tick has moved on (§9: no detached background
                    // tasks outside the scheduler's ownership).
                    abandoned.store(true, Ordering::Relaxed);
                    tasks.abort_all();
                    consecutive_overruns += 1;
                    self.record_overrun(tier, consecutive_overruns);
                }
            }
        }
    }

    fn record_overrun(&self, tier: Tier, consecutive: u32) {
        let mut labels = std::collections::HashMap::new();
        labels.insert("tier".to_string(), tier.as_str().to_string());
        let _ = self.metric_registry.inc_counter("tier_overruns_total", &labels, 1.0, tier);

        if consecutive >= 2 {
            warn!(%tier, consecutive, "tier has overrun two or more ticks in a row");
        } else {
            warn!(%tier, "tier tick overran its deadline; next tick skipped");
        }
    }

    /// Spawns one task per collector in this tier into a tracked [`JoinSet`],
    /// handed back to the caller rather than awaited here so an overrunning
    /// cycle's tasks can be aborted as a group instead of merely dropped.
    fn spawn_cycle_tasks(&self, tier: Tier, deadline: Instant, abandoned: Arc<AtomicBool>) -> JoinSet<()> {
        let inventory = Arc::new(InventoryCache::new(self.api.clone(), self.pipeline.clone()));
        let sink = MetricSink::new(self.metric_registry.clone(), tier);
        let shutdown = self.shutdown.clone();
        let cancelled: Arc<dyn Fn() -> bool + Send + Sync> =
            Arc::new(move || shutdown.is_cancelled() || abandoned.load(Ordering::Relaxed));

        let ctx = CycleContext::new(tier, deadline, inventory, sink, cancelled);

        let descriptors = self.collectors.by_tier(tier).to_vec();
        let mut tasks = JoinSet::new();
        for descriptor in descriptors {
            let ctx = ctx.clone();
            let health = self.health.clone();
            let name = descriptor.name.clone();
            let descriptor_tier = descriptor.tier;
            // §4.4: "the stricter of the two applies" — bound each collector
            // by whichever is shorter, its own configured timeout or the
            // time remaining before the tier deadline (§8 invariant 6).
            let remaining = deadline.saturating_duration_since(Instant::now());
            let per_collector_timeout = descriptor.timeout.min(remaining);
            tasks.spawn(async move {
                let started = Instant::now();
                let run = with_collector_context(name.clone(), descriptor_tier, || descriptor.collector.collect(&ctx));
                let outcome = match tokio::time::timeout(per_collector_timeout, run).await {
                    Ok(outcome) => outcome,
                    Err(_) => CollectorOutcome::Failed {
                        errors: vec![(
                            exporter_domain::ErrorCategory::Timeout,
                            format!("collector '{name}' exceeded its {per_collector_timeout:?} timeout"),
                        )],
                    },
                };
                health.record_outcome(&name, descriptor_tier, &outcome, started.elapsed(), Utc::now());
            });
        }
        tasks
    }

    /// Runs one full cycle to completion. Used by `warmup()` and directly by
    /// tests; `tier_loop` instead calls `spawn_cycle_tasks` itself so it can
    /// hold the `JoinSet` across the overrun race.
    async fn run_cycle(&self, tier: Tier, deadline: Instant, abandoned: Arc<AtomicBool>) {
        let mut tasks = self.spawn_cycle_tasks(tier, deadline, abandoned);
        drain(&mut tasks).await;
    }
}

/// Awaits every task in the set, ignoring individual join errors (a panicking
/// collector must not take down the scheduler).
async fn drain(tasks: &mut JoinSet<()>) {
    while tasks.join_next().await.is_some() {}
}
