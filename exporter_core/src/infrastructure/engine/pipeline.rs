// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Pipeline (C4)
//!
//! Owns the single global API concurrency limit (§5's "sole backpressure
//! mechanism"), the process-wide 429 pause, and the retry/backoff policy for
//! individual upstream calls. One `ExecutionPipeline` is shared across every
//! tier and every collector for the process lifetime — the semaphore would
//! mean nothing scoped any narrower.
//!
//! Collector-level batching (§4.4's `batch_size`/`batch_delay`) and the
//! collector-vs-tier deadline rule live here too, since both exist to shape
//! how a collector's many upstream calls interact with this same semaphore.

use exporter_domain::ExporterError;
use futures::future::join_all;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

pub struct ExecutionPipeline {
    semaphore: Arc<Semaphore>,
    rate_limit_pause_until: RwLock<Option<Instant>>,
    max_retries: u32,
    rate_limit_retry_wait: Duration,
    batch_size: usize,
    batch_delay: Duration,
}

impl ExecutionPipeline {
    pub fn new(
        concurrency_limit: usize,
        max_retries: u32,
        rate_limit_retry_wait: Duration,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
            rate_limit_pause_until: RwLock::new(None),
            max_retries,
            rate_limit_retry_wait,
            batch_size,
            batch_delay,
        }
    }

    /// Acquires one of the global API permits, first waiting out any active
    /// rate-limit pause (§4.4, §9's "semaphore acquire path checks and awaits
    /// it before granting").
    async fn acquire_permit(&self) -> OwnedSemaphorePermit {
        loop {
            let wait_until = *self.rate_limit_pause_until.read();
            match wait_until {
                Some(until) if Instant::now() < until => {
                    tokio::time::sleep_until(until.into()).await;
                }
                _ => break,
            }
        }
        self.semaphore.clone().acquire_owned().await.expect("pipeline semaphore is never closed")
    }

    fn trigger_rate_limit_pause(&self) {
        let until = Instant::now() + self.rate_limit_retry_wait;
        *self.rate_limit_pause_until.write() = Some(until);
        warn!(pause_secs = self.rate_limit_retry_wait.as_secs(), "upstream rate limit hit; pausing all API starts");
    }

    /// Runs one upstream call under the global semaphore, applying §4.4's
    /// retry policy: a 429 triggers the process-wide pause and is retried; a
    /// 5xx is retried with exponential backoff capped at 60s; every other
    /// error surfaces immediately.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, ExporterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExporterError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let permit = self.acquire_permit().await;
            let result = op().await;
            drop(permit);

            match result {
                Ok(value) => return Ok(value),
                Err(ref e) if !e.is_retriable() || attempt >= self.max_retries => return result,
                Err(ExporterError::ApiRateLimit { .. }) => {
                    self.trigger_rate_limit_pause();
                    attempt += 1;
                }
                Err(ExporterError::ApiServerError { .. }) | Err(ExporterError::Timeout { retriable: true, .. }) => {
                    let backoff = Duration::from_secs(1 << attempt.min(6)).min(Duration::from_secs(60));
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(_) => return result,
            }
        }
    }

    /// Runs `items` through `op` in batches of `batch_size`, waiting
    /// `batch_delay` between batches; within a batch every item runs
    /// concurrently (each still bounded individually by the global
    /// semaphore inside `op`).
    pub async fn run_batched<T, I, F, Fut>(&self, items: Vec<I>, op: F) -> Vec<Result<T, ExporterError>>
    where
        I: Send + 'static,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, ExporterError>>,
    {
        let mut results = Vec::with_capacity(items.len());
        let owned_batches: Vec<Vec<I>> = items_into_batches(items, self.batch_size.max(1)).collect();
        let last = owned_batches.len().saturating_sub(1);
        for (idx, batch) in owned_batches.into_iter().enumerate() {
            let futures = batch.into_iter().map(&op);
            let batch_results = join_all(futures).await;
            results.extend(batch_results);

            if idx != last {
                tokio::time::sleep(self.batch_delay).await;
            }
        }
        results
    }
}

fn items_into_batches<I>(items: Vec<I>, batch_size: usize) -> std::vec::IntoIter<Vec<I>> {
    let mut batches = Vec::new();
    let mut iter = items.into_iter();
    loop {
        let batch: Vec<I> = iter.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }
        batches.push(batch);
    }
    batches.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn rate_limit_pauses_subsequent_starts() {
        let pipeline =
            ExecutionPipeline::new(2, 3, Duration::from_millis(50), 20, Duration::from_millis(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = attempts.clone();

        let result = pipeline
            .call(|| {
                let a = a.clone();
                async move {
                    let n = a.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(ExporterError::api_rate_limit("slow down"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retriable_errors_surface_immediately() {
        let pipeline = ExecutionPipeline::new(2, 3, Duration::from_millis(10), 20, Duration::from_millis(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = attempts.clone();

        let result: Result<i32, ExporterError> = pipeline
            .call(|| {
                let a = a.clone();
                async move {
                    a.fetch_add(1, Ordering::SeqCst);
                    Err(ExporterError::api_client_error(400, "bad request"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_timeout_retries_with_backoff() {
        let pipeline = ExecutionPipeline::new(2, 3, Duration::from_millis(10), 20, Duration::from_millis(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = attempts.clone();

        let result = pipeline
            .call(|| {
                let a = a.clone();
                async move {
                    let n = a.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(ExporterError::api_timeout("connect reset"))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn collector_deadline_timeout_is_not_retried() {
        let pipeline = ExecutionPipeline::new(2, 3, Duration::from_millis(10), 20, Duration::from_millis(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = attempts.clone();

        let result: Result<i32, ExporterError> = pipeline
            .call(|| {
                let a = a.clone();
                async move {
                    a.fetch_add(1, Ordering::SeqCst);
                    Err(ExporterError::timeout("collector deadline exceeded"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batching_splits_into_chunks_with_delay() {
        let pipeline = ExecutionPipeline::new(4, 3, Duration::from_millis(10), 2, Duration::from_millis(1));
        let items: Vec<i32> = (0..5).collect();
        let results = pipeline.run_batched(items, |i| async move { Ok::<i32, ExporterError>(i * 2) }).await;
        assert_eq!(results.len(), 5);
        assert_eq!(results[4].as_ref().unwrap(), &8);
    }
}
