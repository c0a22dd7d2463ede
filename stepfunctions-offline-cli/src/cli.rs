use clap::{Args, Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::io;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "sfn-offline")]
#[command(version)]
#[command(about = "Run AWS Step Functions Local next to a serverless application")]
#[command(long_about = "
sfn-offline installs and runs AWS Step Functions Local, registers the state
machines declared in serverless.yml, and turns the emulator's execution
history output into Step Functions Execution Status Change events.

Settings come from the custom.stepFunctionsLocal block of serverless.yml,
STEP_FUNCTIONS_LOCAL_* environment variables, and the flags below.

Example usage:
  sfn-offline start                      # Install, start and register everything
  sfn-offline rewrite --state-machine Orders
  sfn-offline translate emulator.log     # Classify captured emulator output
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to serverless.yml (defaults to ./serverless.yml or ./serverless.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Flags that take precedence over every other configuration source
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Account id the emulator runs as
    #[arg(long, global = true)]
    pub account_id: Option<String>,

    /// Region the emulator runs in
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Endpoint task states invoke functions through
    #[arg(long, global = true)]
    pub lambda_endpoint: Option<String>,

    /// Directory Step Functions Local is installed into
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// Management API endpoint of the emulator
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Multiplier applied to Wait state durations
    #[arg(long, global = true)]
    pub wait_time_scale: Option<f64>,

    /// Use an emulator that is already running instead of starting one
    #[arg(long, global = true)]
    pub external: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install, start and register state machines, then run until interrupted
    #[command(long_about = "
Runs the complete startup sequence:

- Installs Step Functions Local if it is not already present
- Starts the emulator and waits for its management API
- Registers every state machine, rewriting mapped task resources
- Forwards execution status changes to EventBridge when enabled

The ARN of each registered state machine is printed as
OFFLINE_STEP_FUNCTIONS_ARN_<name>=<arn>. Press Ctrl+C to stop the emulator.

Example:
  sfn-offline start
  sfn-offline start --external --endpoint http://localhost:8083
")]
    Start {
        /// Log execution events even when EventBridge forwarding is disabled
        #[arg(long)]
        log_events: bool,
    },
    /// Download Step Functions Local if it is not installed yet
    Install,
    /// Print state machine definitions with task resources rewritten
    #[command(long_about = "
Applies the TaskResourceMapping to every state machine and prints the
result as JSON, keyed by registration name.

Examples:
  sfn-offline rewrite
  sfn-offline rewrite --state-machine Orders
")]
    Rewrite {
        /// Only print this state machine (key or name)
        #[arg(short, long)]
        state_machine: Option<String>,
    },
    /// Turn emulator log lines into execution events
    #[command(long_about = "
Reads Step Functions Local output from FILE, or standard input when FILE is
omitted, and prints one JSON event per execution status change.

Examples:
  sfn-offline translate emulator.log
  java -jar StepFunctionsLocal.jar | sfn-offline translate
")]
    Translate {
        /// File with captured emulator output
        file: Option<PathBuf>,
    },
    /// Print the resolved configuration
    Config {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    #[allow(dead_code)]
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    pub fn is_tty() -> bool {
        io::stdout().is_terminal()
    }

    pub fn should_use_color() -> bool {
        Self::is_tty() && std::env::var("NO_COLOR").is_err()
    }
}
