// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Taxonomy
//!
//! `ExporterError` is the closed set of failure categories the engine and its
//! collectors ever return. The set is closed deliberately: every category has
//! a fixed `retriable` policy and a fixed label value used on `errors_total`.

use thiserror::Error;

/// The closed error taxonomy. Variant order has no significance; `category()`
/// is the stable identifier used as a metric label, never the `Display` text.
#[derive(Debug, Error, Clone)]
pub enum ExporterError {
    /// 429 from upstream. Triggers a process-wide pause in the execution
    /// pipeline before any further API calls start.
    #[error("rate limited by upstream: {message}")]
    ApiRateLimit { message: String },

    /// 4xx other than 429 or 404. Never retried.
    #[error("upstream rejected request: {status} {message}")]
    ApiClientError { status: u16, message: String },

    /// 404 on an endpoint the collector treats as optional. Logged once per
    /// cycle, never retried; the collector skips the affected sub-task.
    #[error("endpoint not available: {message}")]
    ApiNotAvailable { message: String },

    /// 5xx. Retried per the execution pipeline's backoff policy.
    #[error("upstream server error: {status} {message}")]
    ApiServerError { status: u16, message: String },

    /// 401/403. Never retried; fatal for the collector (possibly for
    /// startup, if the credential check runs before the scheduler starts).
    #[error("upstream authentication failed: {message}")]
    ApiAuthError { message: String },

    /// Upstream call or collector deadline exceeded. `retriable` separates
    /// the two sources that share this category (§7): a transport-level
    /// `api.timeout` is retried under the execution pipeline's backoff
    /// policy per §5 ("surface as retriable errors, not cancellation"),
    /// while a collector or tier deadline expiring is not — retrying it
    /// would only consume more of a budget that has already run out.
    #[error("timed out: {message}")]
    Timeout { message: String, retriable: bool },

    /// Upstream returned a shape the normalizing deserializer did not
    /// recognize (neither a bare list nor `{items: [...]}`).
    #[error("failed to parse upstream response: {message}")]
    Parsing { message: String },

    /// Label schema mismatch, metric contract violation, or bad
    /// configuration. Fatal at startup, never fatal at steady state.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Cooperative cancellation: shutdown or tier-deadline overrun.
    #[error("cancelled: {message}")]
    Cancellation { message: String },
}

impl ExporterError {
    pub fn api_rate_limit(message: impl Into<String>) -> Self {
        Self::ApiRateLimit { message: message.into() }
    }

    pub fn api_client_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiClientError { status, message: message.into() }
    }

    pub fn api_not_available(message: impl Into<String>) -> Self {
        Self::ApiNotAvailable { message: message.into() }
    }

    pub fn api_server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiServerError { status, message: message.into() }
    }

    pub fn api_auth_error(message: impl Into<String>) -> Self {
        Self::ApiAuthError { message: message.into() }
    }

    /// A collector or tier deadline expiring. Not retried — the budget that
    /// expired is already spent.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into(), retriable: false }
    }

    /// An upstream HTTP call timing out at the transport level (§5). Retried
    /// under the execution pipeline's backoff policy, same as a 5xx.
    pub fn api_timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into(), retriable: true }
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn cancellation(message: impl Into<String>) -> Self {
        Self::Cancellation { message: message.into() }
    }

    /// The stable taxonomy tag, used verbatim as the `category` label value.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiRateLimit { .. } => ErrorCategory::ApiRateLimit,
            Self::ApiClientError { .. } => ErrorCategory::ApiClientError,
            Self::ApiNotAvailable { .. } => ErrorCategory::ApiNotAvailable,
            Self::ApiServerError { .. } => ErrorCategory::ApiServerError,
            Self::ApiAuthError { .. } => ErrorCategory::ApiAuthError,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Parsing { .. } => ErrorCategory::Parsing,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Cancellation { .. } => ErrorCategory::Cancellation,
        }
    }

    /// Whether the execution pipeline's retry policy applies to this error.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ApiRateLimit { .. } | Self::ApiServerError { .. } | Self::Timeout { retriable: true, .. })
    }

    /// HTTP status code carried by API-originated errors, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::ApiClientError { status, .. } | Self::ApiServerError { status, .. } => Some(*status),
            Self::ApiRateLimit { .. } => Some(429),
            Self::ApiAuthError { .. } => None,
            _ => None,
        }
    }
}

/// Stable taxonomy tag. `Display` renders the exact token used as a metric
/// label value — do not reorder or rename these without checking downstream
/// dashboards that key on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    ApiRateLimit,
    ApiClientError,
    ApiNotAvailable,
    ApiServerError,
    ApiAuthError,
    Timeout,
    Parsing,
    Validation,
    Cancellation,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiRateLimit => "api_rate_limit",
            Self::ApiClientError => "api_client_error",
            Self::ApiNotAvailable => "api_not_available",
            Self::ApiServerError => "api_server_error",
            Self::ApiAuthError => "api_auth_error",
            Self::Timeout => "timeout",
            Self::Parsing => "parsing",
            Self::Validation => "validation",
            Self::Cancellation => "cancellation",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<std::io::Error> for ExporterError {
    fn from(err: std::io::Error) -> Self {
        Self::timeout(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_tokens_match_taxonomy() {
        assert_eq!(ExporterError::api_rate_limit("x").category().as_str(), "api_rate_limit");
        assert_eq!(ExporterError::api_client_error(400, "x").category().as_str(), "api_client_error");
        assert_eq!(ExporterError::api_not_available("x").category().as_str(), "api_not_available");
        assert_eq!(ExporterError::api_server_error(500, "x").category().as_str(), "api_server_error");
        assert_eq!(ExporterError::api_auth_error("x").category().as_str(), "api_auth_error");
        assert_eq!(ExporterError::timeout("x").category().as_str(), "timeout");
        assert_eq!(ExporterError::parsing("x").category().as_str(), "parsing");
        assert_eq!(ExporterError::validation("x").category().as_str(), "validation");
        assert_eq!(ExporterError::cancellation("x").category().as_str(), "cancellation");
    }

    #[test]
    fn only_rate_limit_server_error_and_transport_timeout_are_retriable() {
        assert!(ExporterError::api_rate_limit("x").is_retriable());
        assert!(ExporterError::api_server_error(503, "x").is_retriable());
        assert!(ExporterError::api_timeout("x").is_retriable());
        assert!(!ExporterError::api_client_error(400, "x").is_retriable());
        assert!(!ExporterError::api_not_available("x").is_retriable());
        assert!(!ExporterError::api_auth_error("x").is_retriable());
        assert!(!ExporterError::timeout("x").is_retriable());
        assert!(!ExporterError::parsing("x").is_retriable());
        assert!(!ExporterError::validation("x").is_retriable());
        assert!(!ExporterError::cancellation("x").is_retriable());
    }

    #[test]
    fn collector_timeout_and_api_timeout_share_the_timeout_category() {
        assert_eq!(ExporterError::timeout("x").category().as_str(), "timeout");
        assert_eq!(ExporterError::api_timeout("x").category().as_str(), "timeout");
    }
}
