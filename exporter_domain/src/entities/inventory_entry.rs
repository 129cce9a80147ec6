// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One cached node of the organization/network/device hierarchy.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventoryKind {
    Org,
    Network,
    Device,
}

/// `{kind, id, attributes, fetched_at, ttl}` from §3. Owned exclusively by
/// the Inventory Cache for the lifetime of one cycle.
#[derive(Debug, Clone)]
pub struct InventoryEntry {
    pub kind: InventoryKind,
    pub id: String,
    pub attributes: Value,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl InventoryEntry {
    pub fn new(kind: InventoryKind, id: impl Into<String>, attributes: Value, ttl: Duration) -> Self {
        Self { kind, id: id.into(), attributes, fetched_at: Utc::now(), ttl }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (now - self.fetched_at).to_std() {
            Ok(age) => age > self.ttl,
            Err(_) => false, // fetched_at is in the future (clock skew); treat as fresh
        }
    }
}
