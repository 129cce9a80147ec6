// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exporter Entry Point
//!
//! Composition root: parses and validates the CLI, loads configuration,
//! wires the Execution Pipeline around the vendor API client, constructs the
//! Metric Registry, Cardinality Monitor, and Health Accounting, registers
//! every collector's metric catalog, and hands the Collector Registry to the
//! Scheduler. `serve` runs until a shutdown signal arrives; `validate-config`
//! and `list-collectors` are one-shot diagnostics that never start the
//! scheduler or scrape endpoint.

use exporter_bootstrap::cli::ValidatedCommand;
use exporter_bootstrap::shutdown::ShutdownCoordinator;
use exporter_bootstrap::{bootstrap_cli, result_to_exit_code};
use exporter_core::application::device::{SwitchFamilyCollector, WirelessFamilyCollector};
use exporter_core::application::{DeviceCollector, NetworkCollector, OrganizationCollector, TrafficHistoryCollector};
use exporter_core::infrastructure::api_client::MerakiApiClient;
use exporter_core::infrastructure::config::AppConfig;
use exporter_core::infrastructure::engine::collector_registry::{CollectorRegistry, MetricSink};
use exporter_core::infrastructure::engine::governed_api::GovernedUpstreamApi;
use exporter_core::infrastructure::engine::health::HealthAccounting;
use exporter_core::infrastructure::engine::pipeline::ExecutionPipeline;
use exporter_core::infrastructure::engine::scheduler::Scheduler;
use exporter_core::infrastructure::logging::init_tracing;
use exporter_core::infrastructure::metrics::cardinality::CardinalityMonitor;
use exporter_core::infrastructure::metrics::endpoint::ScrapeEndpoint;
use exporter_core::infrastructure::metrics::registry::MetricRegistry;
use exporter_core::{ExporterError, Tier, UpstreamApi};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    let validated_cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("CLI error: {e}");
            return std::process::ExitCode::from(64); // EX_USAGE
        }
    };

    let config_path = validated_cli.config.as_deref();

    match validated_cli.command {
        ValidatedCommand::ValidateConfig => result_to_exit_code(validate_config(config_path)),
        ValidatedCommand::ListCollectors => result_to_exit_code(list_collectors(config_path)),
        ValidatedCommand::Serve => result_to_exit_code(serve(config_path).await),
    }
}

fn validate_config(config_path: Option<&std::path::Path>) -> Result<(), ExporterError> {
    let config = AppConfig::load(config_path)?;
    println!("configuration is valid:");
    println!("{}", toml::to_string_pretty(&config).map_err(|e| ExporterError::validation(e.to_string()))?);
    Ok(())
}

fn list_collectors(config_path: Option<&std::path::Path>) -> Result<(), ExporterError> {
    let config = AppConfig::load(config_path)?;
    let registry = build_collector_registry(&config, &MetricSink::new(Arc::new(MetricRegistry::new(
        config.intervals.clone(),
        config.monitoring.metric_ttl_multiplier,
    )), Tier::Fast))?;

    for tier in Tier::ALL {
        for descriptor in registry.by_tier(tier) {
            println!("{:<8} {:<20} enabled", tier, descriptor.name);
        }
    }
    Ok(())
}

/// Instantiates every collector known to this build and registers it,
/// gated by `config.collectors.is_enabled`. Each collector's
/// `register_metrics` is also run against `sink`'s underlying registry so
/// `list-collectors` and `validate-config` see the full catalog without
/// starting the scheduler.
fn build_collector_registry(config: &AppConfig, sink: &MetricSink) -> Result<CollectorRegistry, ExporterError> {
    let mut registry = CollectorRegistry::new();
    let timeout = Duration::from_secs(config.collectors.timeout_secs);

    let organization = OrganizationCollector::new(Tier::Fast);
    organization.register_metrics(sink)?;
    registry.register("organization", Tier::Fast, config.collectors.is_enabled("organization"), timeout, Arc::new(organization))?;

    let network = NetworkCollector::new(Tier::Medium);
    network.register_metrics(sink)?;
    registry.register("network", Tier::Medium, config.collectors.is_enabled("network"), timeout, Arc::new(network))?;

    let device = DeviceCollector::new(
        Tier::Medium,
        vec![Arc::new(SwitchFamilyCollector), Arc::new(WirelessFamilyCollector)],
    );
    device.register_metrics(sink)?;
    registry.register("device", Tier::Medium, config.collectors.is_enabled("device"), timeout, Arc::new(device))?;

    let traffic_history = TrafficHistoryCollector::new();
    traffic_history.register_metrics(sink)?;
    registry.register(
        "traffic_history",
        Tier::Slow,
        config.collectors.is_enabled("traffic_history"),
        timeout,
        Arc::new(traffic_history),
    )?;

    Ok(registry)
}

async fn serve(config_path: Option<&std::path::Path>) -> Result<(), ExporterError> {
    let config = AppConfig::load(config_path)?;

    let metric_registry =
        Arc::new(MetricRegistry::new(config.intervals.clone(), config.monitoring.metric_ttl_multiplier));
    let sink = MetricSink::new(metric_registry.clone(), Tier::Fast);
    let collectors = Arc::new(build_collector_registry(&config, &sink)?);

    let health = Arc::new(HealthAccounting::new(metric_registry.clone(), config.monitoring.max_consecutive_failures));
    health.register_metrics()?;

    let client = MerakiApiClient::new(&config.api)?;
    let pipeline = Arc::new(ExecutionPipeline::new(
        config.api.concurrency_limit,
        config.api.max_retries,
        Duration::from_secs(config.api.rate_limit_retry_wait_secs),
        config.api.batch_size,
        Duration::from_secs_f64(config.api.batch_delay_secs),
    ));
    let api: Arc<dyn UpstreamApi> = Arc::new(GovernedUpstreamApi::new(Arc::new(client), pipeline.clone(), health.clone()));

    let cardinality = Arc::new(CardinalityMonitor::new(metric_registry.clone(), config.monitoring.cardinality.clone()));

    let shutdown_coordinator = Arc::new(ShutdownCoordinator::new(Duration::from_secs(
        exporter_bootstrap::shutdown::DEFAULT_GRACE_PERIOD_SECS,
    )));

    let scheduler = Arc::new(Scheduler::new(
        collectors.clone(),
        metric_registry.clone(),
        health.clone(),
        api,
        pipeline,
        config.intervals.clone(),
        shutdown_coordinator.token(),
    ));
    scheduler.register_metrics()?;

    let endpoint = Arc::new(ScrapeEndpoint::new(
        metric_registry.clone(),
        cardinality,
        health,
        collectors,
        config.intervals.clone(),
        config.monitoring.metric_ttl_multiplier,
        config.server.clone(),
        scheduler.warming_flag(),
    ));

    let signal_handler = exporter_bootstrap::signals::create_signal_handler();
    let coordinator_for_signal = shutdown_coordinator.clone();
    let signal_task = tokio::spawn(async move {
        signal_handler
            .wait_for_signal(Box::new(move || {
                coordinator_for_signal.initiate_shutdown();
            }))
            .await;
    });

    let scheduler_task = tokio::spawn(scheduler.run());
    let endpoint_task = tokio::spawn(async move {
        if let Err(e) = endpoint.start().await {
            tracing::error!(error = %e, "scrape endpoint exited");
        }
    });

    info!("exporter started");

    shutdown_coordinator.token().cancelled().await;
    info!("shutdown signal received, waiting for in-flight cycles to finish");
    shutdown_coordinator.wait_for_shutdown().await;
    shutdown_coordinator.complete_shutdown();

    scheduler_task.abort();
    endpoint_task.abort();
    signal_task.abort();

    Ok(())
}
