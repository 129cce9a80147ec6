// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The ordered label name list a metric is declared against.

use crate::error::ExporterError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap());

/// An ordered, immutable list of label names a metric was registered with.
///
/// Order matters for series-key construction (§3's "canonical ordered
/// tuple"), so this wraps a `Vec`, not a `HashSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema(Vec<String>);

impl LabelSchema {
    /// Validates every label name against the exposition format's lexical
    /// rules (`[a-zA-Z_][a-zA-Z0-9_]*`) and rejects duplicates.
    pub fn new(labels: impl IntoIterator<Item = impl Into<String>>) -> Result<Self, ExporterError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let mut seen = std::collections::HashSet::new();
        for label in &labels {
            if !NAME_RE.is_match(label) {
                return Err(ExporterError::validation(format!("invalid label name: {label}")));
            }
            if !seen.insert(label.clone()) {
                return Err(ExporterError::validation(format!("duplicate label name: {label}")));
            }
        }
        Ok(Self(labels))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Builds a canonical, order-preserving value tuple from a label map,
    /// failing if the map's key set is not exactly equal to the schema
    /// (§4.5's "same set, same count, no extras, no omissions").
    pub fn ordered_values(&self, labels: &HashMap<String, String>) -> Result<Vec<String>, ExporterError> {
        if labels.len() != self.0.len() {
            return Err(ExporterError::validation(format!(
                "label set size mismatch: expected {} labels, got {}",
                self.0.len(),
                labels.len()
            )));
        }
        let mut values = Vec::with_capacity(self.0.len());
        for name in &self.0 {
            match labels.get(name) {
                Some(value) => values.push(value.clone()),
                None => {
                    return Err(ExporterError::validation(format!("missing label '{name}' in write")));
                }
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_labels() {
        assert!(LabelSchema::new(["org_id", "org_id"]).is_err());
    }

    #[test]
    fn rejects_invalid_lexical_form() {
        assert!(LabelSchema::new(["org-id"]).is_err());
        assert!(LabelSchema::new(["9org"]).is_err());
    }

    #[test]
    fn extra_label_is_rejected() {
        let schema = LabelSchema::new(["org_id", "serial"]).unwrap();
        let mut labels = HashMap::new();
        labels.insert("org_id".to_string(), "1".to_string());
        labels.insert("serial".to_string(), "Q2XX".to_string());
        labels.insert("extra".to_string(), "nope".to_string());
        assert!(schema.ordered_values(&labels).is_err());
    }

    #[test]
    fn missing_label_is_rejected() {
        let schema = LabelSchema::new(["org_id", "serial"]).unwrap();
        let mut labels = HashMap::new();
        labels.insert("org_id".to_string(), "1".to_string());
        assert!(schema.ordered_values(&labels).is_err());
    }

    #[test]
    fn exact_match_preserves_schema_order() {
        let schema = LabelSchema::new(["org_id", "serial"]).unwrap();
        let mut labels = HashMap::new();
        labels.insert("serial".to_string(), "Q2XX".to_string());
        labels.insert("org_id".to_string(), "1".to_string());
        assert_eq!(schema.ordered_values(&labels).unwrap(), vec!["1".to_string(), "Q2XX".to_string()]);
    }
}
