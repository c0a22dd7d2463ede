//! Configuration management for stepfunctions-offline
//!
//! Settings are resolved from three layers, later layers overriding earlier
//! ones:
//! 1. Defaults
//! 2. `STEP_FUNCTIONS_LOCAL_*` environment variables
//! 3. The `custom.stepFunctionsLocal` block of `serverless.yml`
//!
//! The CLI applies its own flags on top of the resolved [`Config`].

use crate::common::EnvLoader;
use crate::definition::{ResourceMapping, StateMachines};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "STEP_FUNCTIONS_LOCAL";

const DEFAULT_LAMBDA_ENDPOINT: &str = "http://localhost:4000";
const DEFAULT_INSTALL_PATH: &str = "./.step-functions-local";
const DEFAULT_STEP_FUNCTIONS_ENDPOINT: &str = "http://localhost:8083";
const DEFAULT_DOWNLOAD_URL: &str =
    "https://s3.amazonaws.com/stepfunctionslocal/StepFunctionsLocal.zip";
const DEFAULT_JAVA_PATH: &str = "java";
const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READINESS_POLL_INTERVAL: Duration = Duration::from_millis(200);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// File names searched for when no configuration path is given
const SERVERLESS_FILE_NAMES: [&str; 2] = ["serverless.yml", "serverless.yaml"];

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path to the configuration file that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML content from a configuration file
    #[error("Invalid YAML syntax in {path}:\n{source}\n\nHint: Check for proper indentation and YAML formatting")]
    YamlParse {
        /// Path to the configuration file with invalid YAML content
        path: PathBuf,
        /// Underlying YAML parsing error
        #[source]
        source: serde_yaml::Error,
    },

    /// A required setting was not supplied by any layer
    #[error("Step Functions Local: missing {field}")]
    Missing {
        /// Name of the missing setting, as written in serverless.yml
        field: String,
    },

    /// Invalid configuration value for a specific field
    #[error("Invalid configuration value for '{field}': {value}\n{hint}")]
    InvalidValue {
        /// Name of the configuration field that has an invalid value
        field: String,
        /// The invalid value that was provided
        value: String,
        /// Helpful hint about how to fix the issue
        hint: String,
    },
}

/// Where execution status events are delivered
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventBridgeConfig {
    /// Whether execution events are forwarded at all
    pub enabled: bool,
    /// EventBridge-compatible endpoint receiving `PutEvents`
    pub endpoint: Option<String>,
    /// Target bus; the service default bus when unset
    pub event_bus_name: Option<String>,
}

/// Resolved settings for one emulator session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Account id the emulator pretends to run in
    pub account_id: String,
    /// Region the emulator pretends to run in
    pub region: String,
    /// Endpoint the emulator invokes Lambda functions through
    pub lambda_endpoint: String,
    /// Directory the emulator is installed into
    pub path: PathBuf,
    /// Management API endpoint; its port doubles as the readiness check
    pub step_functions_endpoint: String,
    /// Multiplier applied to `Wait` state durations
    pub wait_time_scale: Option<f64>,
    /// Use an emulator someone else started instead of spawning one
    pub external_instance: bool,
    /// Replacement task resources keyed by state name
    pub task_resource_mapping: ResourceMapping,
    /// Execution event forwarding
    pub event_bridge: EventBridgeConfig,
    /// How long to wait for the emulator port to open
    pub readiness_timeout: Duration,
    /// How often to poll the emulator port
    pub readiness_poll_interval: Duration,
    /// Upper bound on one request to the management API or the event bus
    pub request_timeout: Duration,
    /// Java executable used to launch the emulator
    pub java_path: PathBuf,
    /// Where the emulator archive is downloaded from
    pub download_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            region: String::new(),
            lambda_endpoint: DEFAULT_LAMBDA_ENDPOINT.to_string(),
            path: PathBuf::from(DEFAULT_INSTALL_PATH),
            step_functions_endpoint: DEFAULT_STEP_FUNCTIONS_ENDPOINT.to_string(),
            wait_time_scale: None,
            external_instance: false,
            task_resource_mapping: ResourceMapping::new(),
            event_bridge: EventBridgeConfig::default(),
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            readiness_poll_interval: DEFAULT_READINESS_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            java_path: PathBuf::from(DEFAULT_JAVA_PATH),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
        }
    }
}

impl Config {
    /// Resolve configuration from defaults, environment variables and the
    /// `custom.stepFunctionsLocal` block, then validate it
    pub fn resolve(yaml: Option<&YamlConfig>) -> Result<Self, ConfigError> {
        let config = Self::layered(yaml);
        config.validate()?;
        Ok(config)
    }

    /// Merge defaults, environment variables and the YAML block without
    /// validating, so callers can apply further overrides first
    pub fn layered(yaml: Option<&YamlConfig>) -> Self {
        let mut config = Self::default();
        config.apply_env_vars();
        if let Some(yaml) = yaml {
            yaml.apply_to_config(&mut config);
        }
        config
    }

    /// Apply environment variable configuration to this config
    fn apply_env_vars(&mut self) {
        let loader = EnvLoader::new(ENV_PREFIX);

        if let Some(account_id) = loader.load_string("ACCOUNT_ID") {
            self.account_id = account_id;
        }
        if let Some(region) = loader.load_string("REGION") {
            self.region = region;
        }
        if let Some(endpoint) = loader.load_string("LAMBDA_ENDPOINT") {
            self.lambda_endpoint = endpoint;
        }
        if let Some(path) = loader.load_string("PATH") {
            self.path = PathBuf::from(path);
        }
        if let Some(endpoint) = loader.load_string("ENDPOINT") {
            self.step_functions_endpoint = endpoint;
        }
        if let Some(scale) = loader.load_optional::<f64>("WAIT_TIME_SCALE") {
            self.wait_time_scale = Some(scale);
        }
        if let Some(external) = loader.load_flag("EXTERNAL_INSTANCE") {
            self.external_instance = external;
        }
        if let Some(enabled) = loader.load_flag("EVENT_BRIDGE_ENABLED") {
            self.event_bridge.enabled = enabled;
        }
        if let Some(endpoint) = loader.load_string("EVENT_BRIDGE_ENDPOINT") {
            self.event_bridge.endpoint = Some(endpoint);
        }
        if let Some(millis) = loader.load_optional::<u64>("READINESS_TIMEOUT_MS") {
            self.readiness_timeout = Duration::from_millis(millis);
        }
        if let Some(millis) = loader.load_optional::<u64>("READINESS_POLL_MS") {
            self.readiness_poll_interval = Duration::from_millis(millis);
        }
        if let Some(millis) = loader.load_optional::<u64>("REQUEST_TIMEOUT_MS") {
            self.request_timeout = Duration::from_millis(millis);
        }
        if let Some(java) = loader.load_string("JAVA_PATH") {
            self.java_path = PathBuf::from(java);
        }
    }

    /// Validate the current configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "accountId".to_string(),
            });
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "region".to_string(),
            });
        }

        Self::validate_endpoint("lambdaEndpoint", &self.lambda_endpoint)?;
        self.api_address()?;

        if let Some(scale) = self.wait_time_scale {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: "waitTimeScale".to_string(),
                    value: scale.to_string(),
                    hint: "waitTimeScale must be a positive number, e.g. 0.1 for ten times faster waits"
                        .to_string(),
                });
            }
        }

        if self.event_bridge.enabled {
            match &self.event_bridge.endpoint {
                Some(endpoint) => Self::validate_endpoint("eventBridgeEvents.endpoint", endpoint)?,
                None => {
                    return Err(ConfigError::Missing {
                        field: "eventBridgeEvents.endpoint".to_string(),
                    })
                }
            }
        }

        if self.readiness_timeout.is_zero() || self.readiness_poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "readiness".to_string(),
                value: format!(
                    "timeout {:?}, poll interval {:?}",
                    self.readiness_timeout, self.readiness_poll_interval
                ),
                hint: "readiness timeout and poll interval must both be greater than zero"
                    .to_string(),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "requestTimeoutMs".to_string(),
                value: "0".to_string(),
                hint: "requests to the emulator and event bus need a timeout above zero"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Host and port of the management API, used for the readiness check
    pub fn api_address(&self) -> Result<(String, u16), ConfigError> {
        let invalid = |hint: &str| ConfigError::InvalidValue {
            field: "stepFunctionsEndpoint".to_string(),
            value: self.step_functions_endpoint.clone(),
            hint: hint.to_string(),
        };

        let url = reqwest::Url::parse(&self.step_functions_endpoint)
            .map_err(|e| invalid(&format!("not a valid URL: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid("the endpoint must include a host"))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("the endpoint must include a port"))?;

        Ok((host, port))
    }

    /// Synthetic role attached to every registered state machine
    pub fn role_arn(&self) -> String {
        crate::emulator::dummy_role_arn(&self.account_id)
    }

    /// Find a serverless configuration file in the current directory or
    /// one of its parents
    pub fn find_serverless_file() -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        Self::find_serverless_file_from(&cwd)
    }

    /// Find a serverless configuration file in `start` or the nearest
    /// ancestor that has one
    pub fn find_serverless_file_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .flat_map(|dir| SERVERLESS_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|path| path.is_file())
            .inspect(|path| tracing::debug!("Found configuration file: {:?}", path))
    }

    fn validate_endpoint(field: &str, endpoint: &str) -> Result<(), ConfigError> {
        match reqwest::Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            Ok(url) => Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: endpoint.to_string(),
                hint: format!("unsupported scheme '{}', use http or https", url.scheme()),
            }),
            Err(e) => Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: endpoint.to_string(),
                hint: format!("not a valid URL: {e}"),
            }),
        }
    }
}

/// Account ids are often written as bare numbers in YAML
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AccountId {
    /// `accountId: 101010101010`
    Number(u64),
    /// `accountId: "101010101010"`
    Text(String),
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountId::Number(n) => write!(f, "{n}"),
            AccountId::Text(s) => write!(f, "{s}"),
        }
    }
}

/// `eventBridgeEvents` block
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YamlEventBridgeConfig {
    /// Forward execution events
    pub enabled: Option<bool>,
    /// EventBridge-compatible endpoint
    pub endpoint: Option<String>,
    /// Target bus name
    pub event_bus_name: Option<String>,
}

/// Configuration loaded from the `custom.stepFunctionsLocal` block
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YamlConfig {
    /// Account id
    pub account_id: Option<AccountId>,
    /// Region
    pub region: Option<String>,
    /// Lambda endpoint
    pub lambda_endpoint: Option<String>,
    /// Install directory
    pub path: Option<PathBuf>,
    /// Management API endpoint
    pub step_functions_endpoint: Option<String>,
    /// Wait state time scale
    pub wait_time_scale: Option<f64>,
    /// Skip install/start/stop
    pub external_instance: Option<bool>,
    /// Replacement task resources
    #[serde(rename = "TaskResourceMapping", alias = "taskResourceMapping")]
    pub task_resource_mapping: Option<ResourceMapping>,
    /// Event forwarding
    pub event_bridge_events: Option<YamlEventBridgeConfig>,
    /// Readiness timeout in milliseconds
    pub readiness_timeout_ms: Option<u64>,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: Option<u64>,
    /// Java executable
    pub java_path: Option<PathBuf>,
}

impl YamlConfig {
    /// Apply YAML configuration values to an existing Config
    /// YAML values take precedence over existing values
    pub fn apply_to_config(&self, config: &mut Config) {
        if let Some(ref account_id) = self.account_id {
            config.account_id = account_id.to_string();
        }
        if let Some(ref region) = self.region {
            config.region = region.clone();
        }
        if let Some(ref endpoint) = self.lambda_endpoint {
            config.lambda_endpoint = endpoint.clone();
        }
        if let Some(ref path) = self.path {
            config.path = path.clone();
        }
        if let Some(ref endpoint) = self.step_functions_endpoint {
            config.step_functions_endpoint = endpoint.clone();
        }
        if let Some(scale) = self.wait_time_scale {
            config.wait_time_scale = Some(scale);
        }
        if let Some(external) = self.external_instance {
            config.external_instance = external;
        }
        if let Some(ref mapping) = self.task_resource_mapping {
            config.task_resource_mapping = mapping.clone();
        }
        if let Some(ref events) = self.event_bridge_events {
            if let Some(enabled) = events.enabled {
                config.event_bridge.enabled = enabled;
            }
            if let Some(ref endpoint) = events.endpoint {
                config.event_bridge.endpoint = Some(endpoint.clone());
            }
            if let Some(ref bus) = events.event_bus_name {
                config.event_bridge.event_bus_name = Some(bus.clone());
            }
        }
        if let Some(millis) = self.readiness_timeout_ms {
            config.readiness_timeout = Duration::from_millis(millis);
        }
        if let Some(millis) = self.request_timeout_ms {
            config.request_timeout = Duration::from_millis(millis);
        }
        if let Some(ref java) = self.java_path {
            config.java_path = java.clone();
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomSection {
    step_functions_local: Option<YamlConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepFunctionsSection {
    #[serde(default)]
    state_machines: serde_yaml::Mapping,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServerlessFile {
    custom: Option<CustomSection>,
    step_functions: Option<StepFunctionsSection>,
}

/// The parts of a `serverless.yml` this crate cares about
#[derive(Debug, Clone, Default)]
pub struct ServerlessFile {
    /// `custom.stepFunctionsLocal`, if present
    pub local: Option<YamlConfig>,
    /// `stepFunctions.stateMachines` as raw YAML
    pub state_machines: serde_yaml::Mapping,
}

impl ServerlessFile {
    /// Load a serverless configuration file from disk
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!("Loading serverless configuration from: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_yaml_str(&content).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse serverless configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        let raw: RawServerlessFile = serde_yaml::from_str(content)?;
        Ok(Self {
            local: raw.custom.and_then(|c| c.step_functions_local),
            state_machines: raw
                .step_functions
                .map(|s| s.state_machines)
                .unwrap_or_default(),
        })
    }

    /// State machine definitions declared in the file
    pub fn state_machines(&self) -> crate::Result<StateMachines> {
        Ok(StateMachines::from_yaml(&self.state_machines)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SERVERLESS_YML: &str = r#"
service: orders
custom:
  stepFunctionsLocal:
    accountId: 101010101010
    region: us-east-1
    waitTimeScale: 0.5
    TaskResourceMapping:
      Charge: arn:aws:lambda:us-east-1:101010101010:function:orders-dev-charge
    eventBridgeEvents:
      enabled: true
      endpoint: http://localhost:4010
stepFunctions:
  stateMachines:
    OrderFlow:
      name: order-flow
      definition:
        StartAt: Charge
        States:
          Charge:
            Type: Task
            Resource: !GetAtt charge.Arn
            End: true
"#;

    fn clear_env() {
        for suffix in [
            "ACCOUNT_ID",
            "REGION",
            "LAMBDA_ENDPOINT",
            "PATH",
            "ENDPOINT",
            "WAIT_TIME_SCALE",
            "EXTERNAL_INSTANCE",
            "EVENT_BRIDGE_ENABLED",
            "EVENT_BRIDGE_ENDPOINT",
            "READINESS_TIMEOUT_MS",
            "READINESS_POLL_MS",
            "REQUEST_TIMEOUT_MS",
            "JAVA_PATH",
        ] {
            std::env::remove_var(format!("{ENV_PREFIX}_{suffix}"));
        }
    }

    fn yaml(content: &str) -> YamlConfig {
        serde_yaml::from_str(content).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.lambda_endpoint, "http://localhost:4000");
        assert_eq!(config.path, PathBuf::from("./.step-functions-local"));
        assert_eq!(config.step_functions_endpoint, "http://localhost:8083");
        assert_eq!(config.readiness_timeout, Duration::from_secs(10));
        assert_eq!(config.readiness_poll_interval, Duration::from_millis(200));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(!config.external_instance);
        assert!(config.task_resource_mapping.is_empty());
    }

    #[test]
    #[serial]
    fn test_missing_account_id_is_fatal() {
        clear_env();
        let err = Config::resolve(Some(&yaml("region: us-east-1"))).unwrap_err();
        assert_eq!(err.to_string(), "Step Functions Local: missing accountId");
    }

    #[test]
    #[serial]
    fn test_missing_region_is_fatal() {
        clear_env();
        let err = Config::resolve(Some(&yaml("accountId: 101010101010"))).unwrap_err();
        assert_eq!(err.to_string(), "Step Functions Local: missing region");
    }

    #[test]
    #[serial]
    fn test_numeric_account_id_is_stringified() {
        clear_env();
        let config = Config::resolve(Some(&yaml(
            "accountId: 101010101010\nregion: us-east-1",
        )))
        .unwrap();
        assert_eq!(config.account_id, "101010101010");
        assert_eq!(config.role_arn(), "arn:aws:iam::101010101010:role/DummyRole");
    }

    #[test]
    #[serial]
    fn test_yaml_overrides_env_vars() {
        clear_env();
        std::env::set_var("STEP_FUNCTIONS_LOCAL_ACCOUNT_ID", "222222222222");
        std::env::set_var("STEP_FUNCTIONS_LOCAL_REGION", "eu-west-1");
        std::env::set_var("STEP_FUNCTIONS_LOCAL_LAMBDA_ENDPOINT", "http://localhost:3002");

        let config = Config::resolve(Some(&yaml("region: us-east-2"))).unwrap();

        assert_eq!(config.account_id, "222222222222");
        assert_eq!(config.region, "us-east-2");
        assert_eq!(config.lambda_endpoint, "http://localhost:3002");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_vars_alone_are_enough() {
        clear_env();
        std::env::set_var("STEP_FUNCTIONS_LOCAL_ACCOUNT_ID", "333333333333");
        std::env::set_var("STEP_FUNCTIONS_LOCAL_REGION", "ap-south-1");
        std::env::set_var("STEP_FUNCTIONS_LOCAL_EXTERNAL_INSTANCE", "true");
        std::env::set_var("STEP_FUNCTIONS_LOCAL_READINESS_TIMEOUT_MS", "2500");

        let config = Config::resolve(None).unwrap();

        assert!(config.external_instance);
        assert_eq!(config.readiness_timeout, Duration::from_millis(2500));

        clear_env();
    }

    #[test]
    fn test_invalid_wait_time_scale() {
        let config = Config {
            account_id: "1".to_string(),
            region: "us-east-1".to_string(),
            wait_time_scale: Some(0.0),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "waitTimeScale"));
    }

    #[test]
    fn test_event_bridge_requires_endpoint() {
        let config = Config {
            account_id: "1".to_string(),
            region: "us-east-1".to_string(),
            event_bridge: EventBridgeConfig {
                enabled: true,
                endpoint: None,
                event_bus_name: None,
            },
            ..Config::default()
        };
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Step Functions Local: missing eventBridgeEvents.endpoint"
        );
    }

    #[test]
    fn test_api_address() {
        let mut config = Config::default();
        assert_eq!(config.api_address().unwrap(), ("localhost".to_string(), 8083));

        config.step_functions_endpoint = "http://127.0.0.1:9000/".to_string();
        assert_eq!(config.api_address().unwrap(), ("127.0.0.1".to_string(), 9000));

        config.step_functions_endpoint = "not a url".to_string();
        assert!(config.api_address().is_err());
    }

    #[test]
    #[serial]
    fn test_serverless_file_parsing() {
        clear_env();
        let file = ServerlessFile::from_yaml_str(SERVERLESS_YML).unwrap();
        let config = Config::resolve(file.local.as_ref()).unwrap();

        assert_eq!(config.wait_time_scale, Some(0.5));
        assert!(config.event_bridge.enabled);
        assert_eq!(
            config.event_bridge.endpoint.as_deref(),
            Some("http://localhost:4010")
        );
        assert_eq!(
            config.task_resource_mapping.get("Charge"),
            Some("arn:aws:lambda:us-east-1:101010101010:function:orders-dev-charge")
        );

        let machines = file.state_machines().unwrap();
        assert_eq!(machines.len(), 1);
        let flow = machines.get("order-flow").unwrap();
        assert_eq!(flow.key, "OrderFlow");
        assert_eq!(flow.definition["States"]["Charge"]["Resource"], "charge.Arn");
    }

    #[test]
    fn test_serverless_file_without_sections() {
        let file = ServerlessFile::from_yaml_str("service: bare\n").unwrap();
        assert!(file.local.is_none());
        assert!(file.state_machines().unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file_reports_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("serverless.yml");
        std::fs::write(&path, "custom: [unclosed").unwrap();

        let err = ServerlessFile::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::YamlParse { .. }));
        assert!(err.to_string().contains("serverless.yml"));

        let missing = ServerlessFile::load_from_file(temp_dir.path().join("nope.yml"));
        assert!(matches!(missing, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn test_find_serverless_file_walks_up() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let service = temp_dir.path().join("service");
        let nested = service.join("src").join("handlers");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(service.join("serverless.yaml"), "service: orders\n").unwrap();

        assert_eq!(
            Config::find_serverless_file_from(&nested),
            Some(service.join("serverless.yaml"))
        );

        // The nearest file wins over one further up
        std::fs::write(nested.join("serverless.yml"), "service: handlers\n").unwrap();
        assert_eq!(
            Config::find_serverless_file_from(&nested),
            Some(nested.join("serverless.yml"))
        );
    }

    #[test]
    fn test_request_timeout_from_yaml_and_validation() {
        let mut config = Config::default();
        yaml("accountId: '1'\nregion: us-east-1\nrequestTimeoutMs: 1500\n")
            .apply_to_config(&mut config);
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert!(config.validate().is_ok());

        config.request_timeout = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "requestTimeoutMs"));
    }
}
