use crate::error::CliResult;
use std::path::PathBuf;
use stepfunctions_offline::{Config, Installer};

/// Install Step Functions Local unless an external instance is configured
///
/// Returns the jar location, or `None` when installation was skipped.
pub async fn run_install_command(config: &Config) -> CliResult<Option<PathBuf>> {
    if config.external_instance {
        tracing::info!("External instance configured, nothing to install");
        return Ok(None);
    }

    let jar = Installer::from_config(config).install().await?;
    Ok(Some(jar))
}
