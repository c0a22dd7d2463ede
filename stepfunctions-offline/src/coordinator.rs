//! Startup and shutdown of the local Step Functions environment
//!
//! The [`LifecycleCoordinator`] walks the emulator through
//! `UNINSTALLED → INSTALLED → STARTING → READY → REGISTERED → STOPPED`. When
//! an externally managed emulator is configured it starts out `READY` and
//! never installs, spawns or kills anything.

use crate::config::Config;
use crate::definition::StateMachines;
use crate::emulator::{
    wait_until_port_open, EmulatorCommand, EmulatorProcess, HttpManagementApi, Installer,
    ManagementApi,
};
use crate::error::{OfflineError, Result};
use crate::events::EventForwarder;
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::task::JoinHandle;

/// Prefix of the keys state machine ARNs are published under
pub const ARN_ENV_PREFIX: &str = "OFFLINE_STEP_FUNCTIONS_ARN_";

/// Where the emulator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Nothing has been done yet
    Uninstalled,
    /// The emulator distribution is present
    Installed,
    /// The process has been spawned and is not yet listening
    Starting,
    /// The management API accepts connections
    Ready,
    /// State machines have been registered
    Registered,
    /// The process has been terminated
    Stopped,
}

impl LifecycleState {
    /// Get the string representation of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninstalled => "UNINSTALLED",
            LifecycleState::Installed => "INSTALLED",
            LifecycleState::Starting => "STARTING",
            LifecycleState::Ready => "READY",
            LifecycleState::Registered => "REGISTERED",
            LifecycleState::Stopped => "STOPPED",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication key for a state machine name
///
/// Characters outside `[A-Za-z0-9_]` become `_` so the key is a valid
/// environment variable name.
pub fn arn_env_key(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{ARN_ENV_PREFIX}{sanitized}")
}

/// ARNs of registered state machines, keyed by publication key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArnRegistry(BTreeMap<String, String>);

impl ArnRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the ARN of the state machine `name`
    pub fn insert(&mut self, name: &str, arn: impl Into<String>) {
        self.0.insert(arn_env_key(name), arn.into());
    }

    /// ARN of the state machine `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&arn_env_key(name)).map(String::as_str)
    }

    /// Iterate over `(key, arn)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold another registry into this one
    pub fn extend(&mut self, other: ArnRegistry) {
        self.0.extend(other.0);
    }

    /// Mirror every entry into the process environment
    pub fn publish_to_env(&self) {
        for (key, arn) in &self.0 {
            tracing::debug!("{}={}", key, arn);
            std::env::set_var(key, arn);
        }
    }
}

/// Drives the emulator through its lifecycle
pub struct LifecycleCoordinator<A: ManagementApi> {
    config: Config,
    api: A,
    forwarder: EventForwarder,
    state: LifecycleState,
    process: Option<EmulatorProcess>,
    forwarder_task: Option<JoinHandle<usize>>,
    registry: ArnRegistry,
    publish_env: bool,
}

impl LifecycleCoordinator<HttpManagementApi> {
    /// Coordinator talking to the management API at the configured endpoint
    pub fn from_config(config: Config, forwarder: EventForwarder) -> Result<Self> {
        let api = HttpManagementApi::new(
            config.step_functions_endpoint.clone(),
            config.request_timeout,
        )?;
        Ok(Self::new(config, api, forwarder))
    }
}

impl<A: ManagementApi> LifecycleCoordinator<A> {
    /// Create a coordinator
    pub fn new(config: Config, api: A, forwarder: EventForwarder) -> Self {
        let state = if config.external_instance {
            LifecycleState::Ready
        } else {
            LifecycleState::Uninstalled
        };

        Self {
            config,
            api,
            forwarder,
            state,
            process: None,
            forwarder_task: None,
            registry: ArnRegistry::new(),
            publish_env: false,
        }
    }

    /// Also publish registered ARNs as process environment variables
    pub fn with_env_publication(mut self, publish_env: bool) -> Self {
        self.publish_env = publish_env;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether an externally managed emulator is used
    pub fn is_external(&self) -> bool {
        self.config.external_instance
    }

    /// Configuration the coordinator runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// ARNs registered so far
    pub fn registry(&self) -> &ArnRegistry {
        &self.registry
    }

    /// Make sure the emulator is installed
    pub async fn install(&mut self) -> Result<()> {
        if self.is_external() {
            tracing::debug!("External instance configured, skipping install");
            return Ok(());
        }
        if self.state != LifecycleState::Uninstalled {
            return Ok(());
        }

        Installer::from_config(&self.config).install().await?;
        self.state = LifecycleState::Installed;
        Ok(())
    }

    /// Launch the emulator and wait until its management API is reachable
    pub async fn start(&mut self) -> Result<()> {
        if self.is_external() {
            tracing::debug!("External instance configured, skipping start");
            return Ok(());
        }
        if !matches!(self.state, LifecycleState::Installed | LifecycleState::Stopped) {
            return Err(self.invalid_transition("start"));
        }

        let (host, port) = self.config.api_address()?;
        let mut process = EmulatorCommand::from_config(&self.config).spawn()?;
        self.state = LifecycleState::Starting;

        if let Some(stdout) = process.take_stdout() {
            let forwarder = self.forwarder.clone();
            self.forwarder_task = Some(tokio::spawn(async move { forwarder.run(stdout).await }));
        }
        self.process = Some(process);

        if let Err(e) = wait_until_port_open(
            &host,
            port,
            self.config.readiness_poll_interval,
            self.config.readiness_timeout,
        )
        .await
        {
            self.shutdown_process().await;
            self.state = LifecycleState::Installed;
            return Err(e);
        }

        tracing::info!("Step Functions Local listening on {}:{}", host, port);
        self.state = LifecycleState::Ready;
        Ok(())
    }

    /// Register every state machine with the emulator
    ///
    /// Definitions are rewritten with the configured task resource mapping
    /// first. Registrations run concurrently; the first failure fails the
    /// whole batch and names the state machine it concerns. The ARNs are
    /// recorded only once every registration succeeded.
    pub async fn register_all(&mut self, state_machines: &StateMachines) -> Result<ArnRegistry> {
        if !matches!(self.state, LifecycleState::Ready | LifecycleState::Registered) {
            return Err(self.invalid_transition("register state machines"));
        }
        check_key_collisions(state_machines)?;

        let role_arn = self.config.role_arn();
        let mapping = &self.config.task_resource_mapping;
        let api = &self.api;

        let registrations = state_machines.iter().map(|machine| {
            let machine = machine.rewritten(mapping);
            let role_arn = role_arn.as_str();
            async move {
                let name = machine.name.as_str();
                let arn = match machine.definition_json() {
                    Ok(definition) => api.create_state_machine(name, &definition, role_arn).await,
                    Err(e) => Err(e.into()),
                }
                .map_err(|e| match e {
                    OfflineError::Registration { .. } => e,
                    other => OfflineError::Registration {
                        name: name.to_string(),
                        reason: other.to_string(),
                    },
                })?;

                tracing::info!("Registered state machine {} as {}", name, arn);
                Ok::<_, OfflineError>((machine.name.to_string(), arn))
            }
        });

        let mut registered = ArnRegistry::new();
        for (name, arn) in try_join_all(registrations).await? {
            registered.insert(&name, arn);
        }

        if self.publish_env {
            registered.publish_to_env();
        }
        self.registry.extend(registered.clone());
        self.state = LifecycleState::Registered;
        Ok(registered)
    }

    /// Install, start and register in one go
    pub async fn startup(&mut self, state_machines: &StateMachines) -> Result<ArnRegistry> {
        self.install().await?;
        self.start().await?;
        self.register_all(state_machines).await
    }

    /// Terminate the emulator
    ///
    /// Safe to call in any state and more than once.
    pub async fn stop(&mut self) -> Result<()> {
        if self.is_external() {
            tracing::debug!("External instance configured, skipping stop");
            return Ok(());
        }
        if !matches!(
            self.state,
            LifecycleState::Starting | LifecycleState::Ready | LifecycleState::Registered
        ) {
            return Ok(());
        }

        let result = match self.process.take() {
            Some(process) => process.stop().await,
            None => Ok(()),
        };
        self.join_forwarder().await;
        self.state = LifecycleState::Stopped;
        result
    }

    async fn shutdown_process(&mut self) {
        if let Some(process) = self.process.take() {
            if let Err(e) = process.stop().await {
                tracing::warn!("Failed to stop Step Functions Local: {}", e);
            }
        }
        self.join_forwarder().await;
    }

    async fn join_forwarder(&mut self) {
        if let Some(task) = self.forwarder_task.take() {
            match task.await {
                Ok(delivered) => tracing::debug!("Forwarded {} execution events", delivered),
                Err(e) => tracing::warn!("Event forwarder ended abnormally: {}", e),
            }
        }
    }

    fn invalid_transition(&self, operation: &'static str) -> OfflineError {
        OfflineError::InvalidTransition {
            operation,
            from: self.state.to_string(),
        }
    }
}

/// Reject batches where two names sanitize to the same publication key
fn check_key_collisions(state_machines: &StateMachines) -> Result<()> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for machine in state_machines.iter() {
        let name = machine.name.as_str();
        let key = arn_env_key(name);
        if let Some(first) = seen.insert(key.clone(), name) {
            return Err(OfflineError::ArnKeyCollision {
                key,
                first: first.to_string(),
                second: name.to_string(),
            });
        }
    }
    Ok(())
}

impl<A: ManagementApi> std::fmt::Debug for LifecycleCoordinator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("state", &self.state)
            .field("external", &self.config.external_instance)
            .field("pid", &self.process.as_ref().and_then(|p| p.id()))
            .field("registry", &self.registry)
            .finish()
    }
}
