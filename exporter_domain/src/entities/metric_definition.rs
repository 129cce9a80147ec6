// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A collector's declared shape for one metric, registered once at startup.

use crate::error::ExporterError;
use crate::value_objects::{LabelSchema, MetricKind};
use once_cell::sync::Lazy;
use regex::Regex;

static METRIC_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").unwrap());

/// The default geometric bucket spec for collector duration histograms,
/// per §4.5.
pub const DEFAULT_DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// `{name, kind, help_text, label_schema, bucket_spec?}` from §3. Immutable;
/// registered exactly once at startup — double registration of the same
/// name is a fatal startup error (enforced by the registry, not here).
#[derive(Debug, Clone)]
pub struct MetricDefinition {
    pub name: String,
    pub kind: MetricKind,
    pub help_text: String,
    pub label_schema: LabelSchema,
    pub bucket_spec: Option<Vec<f64>>,
}

impl MetricDefinition {
    pub fn new(
        name: impl Into<String>,
        kind: MetricKind,
        help_text: impl Into<String>,
        label_schema: LabelSchema,
    ) -> Result<Self, ExporterError> {
        let name = name.into();
        if !METRIC_NAME_RE.is_match(&name) {
            return Err(ExporterError::validation(format!("invalid metric name: {name}")));
        }
        let bucket_spec = match kind {
            MetricKind::Histogram => Some(DEFAULT_DURATION_BUCKETS.to_vec()),
            _ => None,
        };
        Ok(Self { name, kind, help_text: help_text.into(), label_schema, bucket_spec })
    }

    pub fn with_buckets(mut self, buckets: Vec<f64>) -> Result<Self, ExporterError> {
        if self.kind != MetricKind::Histogram {
            return Err(ExporterError::validation(format!(
                "bucket_spec only applies to Histogram metrics, '{}' is a {}",
                self.name, self.kind
            )));
        }
        self.bucket_spec = Some(buckets);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_metric_name() {
        let schema = LabelSchema::new(["org_id"]).unwrap();
        assert!(MetricDefinition::new("1bad-name", MetricKind::Gauge, "help", schema).is_err());
    }

    #[test]
    fn histogram_gets_default_buckets() {
        let schema = LabelSchema::new(["collector"]).unwrap();
        let def = MetricDefinition::new("duration_seconds", MetricKind::Histogram, "help", schema).unwrap();
        assert_eq!(def.bucket_spec.as_deref(), Some(DEFAULT_DURATION_BUCKETS));
    }

    #[test]
    fn gauge_has_no_buckets() {
        let schema = LabelSchema::new(["org_id"]).unwrap();
        let def = MetricDefinition::new("devices_total", MetricKind::Gauge, "help", schema).unwrap();
        assert!(def.bucket_spec.is_none());
    }
}
