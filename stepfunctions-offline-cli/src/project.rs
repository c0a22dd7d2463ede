//! Loading serverless.yml and resolving settings for a command

use crate::cli::ConfigOverrides;
use crate::error::CliResult;
use std::path::{Path, PathBuf};
use stepfunctions_offline::{Config, ServerlessFile, StateMachines};

/// Everything a command needs to know about the service it runs for
#[derive(Debug)]
pub struct Project {
    /// Resolved and validated settings
    pub config: Config,
    /// Parsed configuration file, empty when none was found
    pub file: ServerlessFile,
    /// Where the configuration file was read from
    pub source: Option<PathBuf>,
}

impl Project {
    /// Load `config_path`, or search the working directory, then resolve settings
    pub fn load(config_path: Option<&Path>, overrides: &ConfigOverrides) -> CliResult<Self> {
        let source = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => Config::find_serverless_file(),
        };

        let file = match &source {
            Some(path) => ServerlessFile::load_from_file(path)?,
            None => {
                tracing::debug!("No serverless.yml found, using environment and flags only");
                ServerlessFile::default()
            }
        };

        let mut config = Config::layered(file.local.as_ref());
        overrides.apply_to(&mut config);
        config.validate()?;

        Ok(Self {
            config,
            file,
            source,
        })
    }

    /// State machines declared in the configuration file
    pub fn state_machines(&self) -> CliResult<StateMachines> {
        Ok(self.file.state_machines()?)
    }
}

impl ConfigOverrides {
    /// Apply command-line flags on top of `config`
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref account_id) = self.account_id {
            config.account_id = account_id.clone();
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
        if let Some(ref endpoint) = self.endpoint {
            config.step_functions_endpoint = endpoint.clone();
        }
        if let Some(scale) = self.wait_time_scale {
            config.wait_time_scale = Some(scale);
        }
        if self.external {
            config.external_instance = true;
        }
    }
}
