use std::process;

use clap::CommandFactory;
use stepfunctions_offline_cli::cli::{Cli, Commands, ConfigOverrides};
use stepfunctions_offline_cli::error::{handle_cli_result, CliResult};
use stepfunctions_offline_cli::exit_codes::EXIT_SUCCESS;
use stepfunctions_offline_cli::project::Project;
use stepfunctions_offline_cli::{install, logging, rewrite, settings, start, translate};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Fast path for help
    let Some(command) = cli.command else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Failed to print help: {e}");
        }
        process::exit(EXIT_SUCCESS);
    };

    logging::init(logging::log_level(cli.quiet, cli.debug, cli.verbose));

    let config_path = cli.config.as_deref();
    let result: CliResult<()> = match command {
        Commands::Start { log_events } => {
            tracing::info!("Running start command");
            match Project::load(config_path, &cli.overrides) {
                Ok(project) => start::run_start_command(project, log_events).await,
                Err(e) => Err(e),
            }
        }
        Commands::Install => {
            tracing::info!("Running install command");
            run_install(config_path, &cli.overrides).await
        }
        Commands::Rewrite { state_machine } => {
            tracing::debug!("Running rewrite command");
            Project::load(config_path, &cli.overrides)
                .and_then(|project| rewrite::run_rewrite_command(&project, state_machine.as_deref()))
                .map(|output| println!("{output}"))
        }
        Commands::Translate { file } => {
            tracing::debug!("Running translate command");
            translate::run_translate_command(file.as_deref())
                .await
                .map(|_| ())
        }
        Commands::Config { format } => {
            tracing::debug!("Running config command");
            Project::load(config_path, &cli.overrides)
                .and_then(|project| settings::run_config_command(&project, format))
                .map(|output| print!("{output}"))
        }
    };

    process::exit(handle_cli_result(result));
}

async fn run_install(
    config_path: Option<&std::path::Path>,
    overrides: &ConfigOverrides,
) -> CliResult<()> {
    let project = Project::load(config_path, overrides)?;
    if let Some(jar) = install::run_install_command(&project.config).await? {
        println!("{}", jar.display());
    }
    Ok(())
}
