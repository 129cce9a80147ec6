// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A structured record of one collector failure.

use crate::error::{ErrorCategory, ExporterError};
use chrono::{DateTime, Utc};

/// `{collector, category, when, message, retriable}` from §3.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub collector: String,
    pub category: ErrorCategory,
    pub when: DateTime<Utc>,
    pub message: String,
    pub retriable: bool,
}

impl ErrorRecord {
    pub fn from_error(collector: impl Into<String>, error: &ExporterError) -> Self {
        Self {
            collector: collector.into(),
            category: error.category(),
            when: Utc::now(),
            message: error.to_string(),
            retriable: error.is_retriable(),
        }
    }
}
