// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Vendor API Façade
//!
//! A thin `reqwest` client implementing [`UpstreamApi`]. It owns exactly two
//! concerns per §6.2: mapping transport/HTTP outcomes onto the closed error
//! taxonomy, and normalizing the bare-list vs `{items: [...]}` response shape
//! at this single boundary (§9's resolved open question) so nothing upstream
//! of it ever has to branch on vendor response quirks again.
//!
//! Retry, backoff, and the 429 process-wide pause are the Execution
//! Pipeline's job (§4.4), not this client's — a single call here is always
//! exactly one HTTP round trip.

use crate::infrastructure::config::ApiConfig;
use async_trait::async_trait;
use exporter_domain::{ExporterError, UpstreamApi};
use serde_json::Value;
use std::time::Duration;

pub struct MerakiApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MerakiApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ExporterError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExporterError::validation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string(), api_key: config.key.clone() })
    }

    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ExporterError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header("X-Cisco-Meraki-API-Key", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            let body: Value = response.json().await.map_err(|e| ExporterError::parsing(e.to_string()))?;
            Ok(normalize_shape(body))
        } else {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(map_status_error(status_code, message))
        }
    }

    async fn get_list(&self, path: &str, query: &[(String, String)]) -> Result<Vec<Value>, ExporterError> {
        match self.get(path, query).await? {
            Value::Array(items) => Ok(items),
            other => Err(ExporterError::parsing(format!(
                "expected a list or {{items: [...]}} from {path}, got {other}"
            ))),
        }
    }
}

/// Unwraps `{"items": [...]}` into a bare `Array`; passes every other shape
/// through untouched. A caller expecting a list rejects anything that still
/// isn't an `Array` after this.
fn normalize_shape(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("items") => map.remove("items").unwrap_or(Value::Array(vec![])),
        other => other,
    }
}

fn map_status_error(status: u16, message: String) -> ExporterError {
    match status {
        429 => ExporterError::api_rate_limit(message),
        404 => ExporterError::api_not_available(message),
        401 | 403 => ExporterError::api_auth_error(message),
        400..=499 => ExporterError::api_client_error(status, message),
        500..=599 => ExporterError::api_server_error(status, message),
        _ => ExporterError::api_client_error(status, message),
    }
}

fn map_transport_error(error: reqwest::Error) -> ExporterError {
    if error.is_timeout() {
        ExporterError::api_timeout(error.to_string())
    } else if let Some(status) = error.status() {
        map_status_error(status.as_u16(), error.to_string())
    } else {
        // Connect failure, DNS failure, or a reset mid-transfer: no status
        // to classify by, but the same retry policy as a bounded upstream
        // timeout applies (§5).
        ExporterError::api_timeout(error.to_string())
    }
}

#[async_trait]
impl UpstreamApi for MerakiApiClient {
    async fn list_organizations(&self) -> Result<Vec<Value>, ExporterError> {
        self.get_list("/organizations", &[]).await
    }

    async fn list_networks(&self, org_id: &str) -> Result<Vec<Value>, ExporterError> {
        self.get_list(&format!("/organizations/{org_id}/networks"), &[]).await
    }

    async fn list_devices(&self, org_id: &str, filters: &[String]) -> Result<Vec<Value>, ExporterError> {
        let query: Vec<(String, String)> =
            filters.iter().map(|f| ("productTypes[]".to_string(), f.clone())).collect();
        self.get_list(&format!("/organizations/{org_id}/devices"), &query).await
    }

    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ExporterError> {
        self.get(path, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_items_wrapper_to_bare_array() {
        let wrapped = serde_json::json!({"items": [1, 2, 3]});
        assert_eq!(normalize_shape(wrapped), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn leaves_bare_array_untouched() {
        let bare = serde_json::json!([1, 2, 3]);
        assert_eq!(normalize_shape(bare.clone()), bare);
    }

    #[test]
    fn leaves_unrelated_objects_untouched() {
        let obj = serde_json::json!({"id": "abc", "name": "x"});
        assert_eq!(normalize_shape(obj.clone()), obj);
    }

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert_eq!(map_status_error(429, "x".into()).category().as_str(), "api_rate_limit");
        assert_eq!(map_status_error(404, "x".into()).category().as_str(), "api_not_available");
        assert_eq!(map_status_error(401, "x".into()).category().as_str(), "api_auth_error");
        assert_eq!(map_status_error(403, "x".into()).category().as_str(), "api_auth_error");
        assert_eq!(map_status_error(400, "x".into()).category().as_str(), "api_client_error");
        assert_eq!(map_status_error(503, "x".into()).category().as_str(), "api_server_error");
    }
}
