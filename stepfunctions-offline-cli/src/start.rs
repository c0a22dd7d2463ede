use crate::cli::Cli;
use crate::error::CliResult;
use crate::project::Project;
use crate::signal_handler::shutdown_token;
use colored::Colorize;
use std::sync::Arc;
use stepfunctions_offline::{
    ArnRegistry, Config, EventBridgeSink, EventForwarder, LifecycleCoordinator, LogEventSink,
};

/// Bring the environment up and keep it running until a shutdown signal
pub async fn run_start_command(project: Project, log_events: bool) -> CliResult<()> {
    let state_machines = project.state_machines()?;
    let forwarder = event_forwarder(&project.config, log_events)?;

    let mut coordinator =
        LifecycleCoordinator::from_config(project.config, forwarder)?.with_env_publication(true);
    let shutdown = shutdown_token();

    let startup = tokio::select! {
        result = coordinator.startup(&state_machines) => result,
        _ = shutdown.cancelled() => {
            tracing::info!("Interrupted during startup");
            coordinator.stop().await?;
            return Ok(());
        }
    };

    let registry = match startup {
        Ok(registry) => registry,
        Err(e) => {
            if let Err(stop_error) = coordinator.stop().await {
                tracing::warn!("Failed to stop Step Functions Local: {}", stop_error);
            }
            return Err(e.into());
        }
    };

    print!("{}", format_registry(&registry, Cli::should_use_color()));
    tracing::info!(
        "{} state machines registered, press Ctrl+C to stop",
        registry.len()
    );

    shutdown.cancelled().await;
    coordinator.stop().await?;
    Ok(())
}

/// Forwarder for the configured event destination
pub fn event_forwarder(config: &Config, log_events: bool) -> CliResult<EventForwarder> {
    let bridge = &config.event_bridge;
    let forwarder = match &bridge.endpoint {
        Some(endpoint) if bridge.enabled => {
            tracing::info!("Forwarding execution events to {}", endpoint);
            let sink = EventBridgeSink::new(endpoint.clone(), config.request_timeout)?;
            EventForwarder::new(Arc::new(sink)).with_event_bus_name(bridge.event_bus_name.clone())
        }
        _ if log_events => EventForwarder::new(Arc::new(LogEventSink)),
        _ => EventForwarder::disabled(),
    };
    Ok(forwarder)
}

/// One `KEY=ARN` line per registered state machine
pub fn format_registry(registry: &ArnRegistry, use_color: bool) -> String {
    registry
        .iter()
        .map(|(key, arn)| {
            if use_color {
                format!("{}={}\n", key.bold(), arn.green())
            } else {
                format!("{key}={arn}\n")
            }
        })
        .collect()
}
