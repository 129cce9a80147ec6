// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The vendor REST API façade the engine drives (§6.2). Implemented by
//! infrastructure, consumed by the Inventory Cache and by collectors that
//! need a per-family data endpoint beyond the three listing operations.

use crate::error::ExporterError;
use async_trait::async_trait;
use serde_json::Value;

/// A thin, concurrency-limited façade over the vendor's REST API.
///
/// Every call must be cancellable (the implementation is expected to honor
/// `tokio::select!`-style cancellation at its await points) and must surface
/// exactly the closed taxonomy of §7 — no other error shape escapes this
/// trait.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// `GET /organizations`.
    async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError>;

    /// `GET /organizations/{org_id}/networks`.
    async fn list_networks(&self, org_id: &str) -> Result<Vec<Value>, ExporterError>;

    /// `GET /organizations/{org_id}/devices`, optionally scoped by a
    /// product-type filter set. An empty filter list means "no filter".
    async fn list_devices(&self, org_id: &str, filters: &[String]) -> Result<Vec<Value>, ExporterError>;

    /// Escape hatch for the ~200 per-family data endpoints (§1: "the catalog
    /// ... is data, not logic"). `query` is passed through as-is; the
    /// implementation normalizes the bare-list vs `{items:[...]}` shape at
    /// this boundary (§9's resolved open question) before returning.
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ExporterError>;
}
