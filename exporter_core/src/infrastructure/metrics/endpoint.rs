// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scrape HTTP Server
//!
//! A lightweight, hand-rolled HTTP/1.1 server — no framework, since the
//! route set is tiny and fixed: `/metrics` (Prometheus text exposition),
//! `/cardinality` (JSON snapshot), `/health` (liveness), `/` (plain-text
//! status page). Each accepted connection is handled on its own task;
//! parsing is limited to the request line, which is all four routes need.

use crate::infrastructure::config::{IntervalsConfig, ServerConfig};
use crate::infrastructure::engine::collector_registry::CollectorRegistry;
use crate::infrastructure::engine::health::HealthAccounting;
use crate::infrastructure::metrics::cardinality::CardinalityMonitor;
use crate::infrastructure::metrics::registry::MetricRegistry;
use chrono::Utc;
use exporter_domain::ExporterError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

pub struct ScrapeEndpoint {
    registry: Arc<MetricRegistry>,
    cardinality: Arc<CardinalityMonitor>,
    health: Arc<HealthAccounting>,
    collectors: Arc<CollectorRegistry>,
    intervals: IntervalsConfig,
    ttl_multiplier: f64,
    config: ServerConfig,
    /// Set to `false` once the Scheduler's startup warmup cycle completes
    /// (§4.1); until then, concurrent scrapers are told they're seeing a
    /// registry that hasn't finished its first pass.
    warming: Arc<AtomicBool>,
}

impl ScrapeEndpoint {
    pub fn new(
        registry: Arc<MetricRegistry>,
        cardinality: Arc<CardinalityMonitor>,
        health: Arc<HealthAccounting>,
        collectors: Arc<CollectorRegistry>,
        intervals: IntervalsConfig,
        ttl_multiplier: f64,
        config: ServerConfig,
        warming: Arc<AtomicBool>,
    ) -> Self {
        Self { registry, cardinality, health, collectors, intervals, ttl_multiplier, config, warming }
    }

    /// Binds and serves forever. Intended to be spawned as its own task
    /// alongside the Scheduler; a connection error never tears down the
    /// process.
    pub async fn start(&self) -> Result<(), ExporterError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ExporterError::validation(format!("failed to bind scrape endpoint on {addr}: {e}")))?;

        info!(%addr, "scrape endpoint listening");

        loop {
            match listener.accept().await {
                Ok((mut stream, _)) => {
                    let registry = self.registry.clone();
                    let cardinality = self.cardinality.clone();
                    let health = self.health.clone();
                    let collectors = self.collectors.clone();
                    let intervals = self.intervals.clone();
                    let ttl_multiplier = self.ttl_multiplier;
                    let warming = self.warming.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_request(
                            &mut stream,
                            registry,
                            cardinality,
                            health,
                            collectors,
                            intervals,
                            ttl_multiplier,
                            &warming,
                        )
                        .await
                        {
                            error!(error = %e, "error handling scrape request");
                        }
                    });
                }
                Err(e) => error!(error = %e, "error accepting connection"),
            }
        }
    }
}

/// `200` with an empty `stale` list if nothing has gone stale, `503` with the
/// offending collector names otherwise (§6.3). While the startup warmup
/// cycle is still running, staleness hasn't been established yet — the
/// response stays `200` and carries `"warming": true` instead (§4.1).
fn health_body(
    health: &HealthAccounting,
    collectors: &CollectorRegistry,
    intervals: &IntervalsConfig,
    ttl_multiplier: f64,
    warming: bool,
) -> (bool, String) {
    if warming {
        let body = serde_json::json!({ "healthy": true, "warming": true, "stale_collectors": [] }).to_string();
        return (true, body);
    }

    let now = Utc::now();
    let stale: Vec<String> = collectors
        .enabled_with_tier()
        .into_iter()
        .filter(|(name, tier)| health.is_stale(name, intervals.period(*tier), ttl_multiplier, now))
        .map(|(name, _)| name)
        .collect();

    let healthy = stale.is_empty();
    let body = serde_json::json!({ "healthy": healthy, "warming": false, "stale_collectors": stale }).to_string();
    (healthy, body)
}

fn respond(status_line: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

async fn handle_request(
    stream: &mut tokio::net::TcpStream,
    registry: Arc<MetricRegistry>,
    cardinality: Arc<CardinalityMonitor>,
    health: Arc<HealthAccounting>,
    collectors: Arc<CollectorRegistry>,
    intervals: IntervalsConfig,
    ttl_multiplier: f64,
    warming: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buffer = [0u8; 1024];
    let n = stream.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..n]);
    let request_line = request.lines().next().unwrap_or("");
    debug!(request_line, "received scrape request");
    let is_warming = warming.load(Ordering::Relaxed);

    let response = if request_line.starts_with("GET /metrics") {
        match registry.scrape_text() {
            Ok(text) => {
                let header = if is_warming { "# warming: startup warmup cycle has not finished yet\n" } else { "" };
                respond("200 OK", "text/plain; version=0.0.4; charset=utf-8", &format!("{header}{text}"))
            }
            Err(e) => {
                error!(error = %e, "failed to render metrics");
                respond("500 Internal Server Error", "text/plain", &format!("error rendering metrics: {e}"))
            }
        }
    } else if request_line.starts_with("GET /cardinality") {
        match cardinality.snapshot_json(Utc::now()) {
            Ok(json) => respond("200 OK", "application/json", &json),
            Err(e) => respond("500 Internal Server Error", "text/plain", &format!("error rendering cardinality: {e}")),
        }
    } else if request_line.starts_with("GET /health") {
        let (healthy, body) = health_body(&health, &collectors, &intervals, ttl_multiplier, is_warming);
        let status = if healthy { "200 OK" } else { "503 Service Unavailable" };
        respond(status, "application/json", &body)
    } else if request_line.starts_with("GET / ") || request_line == "GET / HTTP/1.1" || request_line == "GET / HTTP/1.0" {
        respond(
            "200 OK",
            "text/plain",
            "tiered collection engine\nroutes: /metrics /cardinality /health\n",
        )
    } else {
        respond("404 Not Found", "text/plain", "not found")
    };

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::CardinalityThresholds;

    #[tokio::test]
    async fn serves_metrics_and_health() {
        let intervals = IntervalsConfig { fast_secs: 60, medium_secs: 300, slow_secs: 900 };
        let registry = Arc::new(MetricRegistry::new(intervals.clone(), 2.0));
        let cardinality = Arc::new(CardinalityMonitor::new(
            registry.clone(),
            CardinalityThresholds { warning: 1000, critical: 10000 },
        ));
        let health = Arc::new(HealthAccounting::new(registry.clone(), 10));
        health.register_metrics().unwrap();
        let collectors = Arc::new(CollectorRegistry::new());
        let endpoint = ScrapeEndpoint::new(
            registry,
            cardinality,
            health,
            collectors,
            intervals,
            2.0,
            ServerConfig { host: "127.0.0.1".to_string(), port: 0 },
            Arc::new(AtomicBool::new(false)),
        );

        // Port 0 binds to an ephemeral port; we only verify construction and
        // that start() can bind without error by racing it against a
        // near-instant timeout (it never returns on its own).
        let result = tokio::time::timeout(std::time::Duration::from_millis(50), endpoint.start()).await;
        assert!(result.is_err(), "start() should still be serving when the timeout fires");
    }
}
