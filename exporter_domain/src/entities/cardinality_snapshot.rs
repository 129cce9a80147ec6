// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A point-in-time view of series counts across the registry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// `{per_metric, per_label, growth_rate}` from §3, produced by the
/// Cardinality Monitor (C6) on demand.
#[derive(Debug, Clone, Serialize)]
pub struct CardinalitySnapshot {
    pub computed_at: DateTime<Utc>,
    pub total_series: usize,
    pub per_metric: HashMap<String, usize>,
    pub per_label: HashMap<String, LabelUsage>,
    /// %/10m; absent when history is shorter than the smoothing window.
    pub growth_rate: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelUsage {
    pub total_series: usize,
    pub metrics_using: usize,
}

impl CardinalitySnapshot {
    pub fn empty(computed_at: DateTime<Utc>) -> Self {
        Self {
            computed_at,
            total_series: 0,
            per_metric: HashMap::new(),
            per_label: HashMap::new(),
            growth_rate: HashMap::new(),
        }
    }
}
