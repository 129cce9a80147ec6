// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One recorded value for one series.

use crate::value_objects::SeriesKey;
use chrono::{DateTime, Utc};

/// A Histogram observation's running aggregate, per §3: "buckets carry
/// {buckets[], sum, count}".
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramState {
    pub bucket_bounds: Vec<f64>,
    pub bucket_counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramState {
    pub fn new(bucket_bounds: Vec<f64>) -> Self {
        let bucket_counts = vec![0; bucket_bounds.len()];
        Self { bucket_bounds, bucket_counts, sum: 0.0, count: 0 }
    }

    pub fn observe(&mut self, value: f64) {
        for (bound, count) in self.bucket_bounds.iter().zip(self.bucket_counts.iter_mut()) {
            if value <= *bound {
                *count += 1;
            }
        }
        self.sum += value;
        self.count += 1;
    }
}

/// The value carried by a sample, shaped per metric kind (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Gauge(f64),
    Counter(f64),
    Histogram(HistogramState),
    /// Info metrics always carry value 1; state lives entirely in labels.
    Info,
}

/// `{metric_ref, series_key, value, recorded_at}` from §3.
#[derive(Debug, Clone)]
pub struct Sample {
    pub series_key: SeriesKey,
    pub value: SampleValue,
    pub recorded_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(series_key: SeriesKey, value: SampleValue, recorded_at: DateTime<Utc>) -> Self {
        Self { series_key, value, recorded_at }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        match (now - self.recorded_at).to_std() {
            Ok(age) => age > ttl,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_observe_updates_sum_count_and_buckets() {
        let mut h = HistogramState::new(vec![1.0, 5.0, 10.0]);
        h.observe(0.5);
        h.observe(3.0);
        h.observe(20.0);
        assert_eq!(h.count, 3);
        assert_eq!(h.sum, 23.5);
        assert_eq!(h.bucket_counts, vec![1, 2, 2]);
    }
}
