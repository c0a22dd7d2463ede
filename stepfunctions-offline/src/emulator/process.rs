//! The Step Functions Local child process

use super::install::JAR_FILE_NAME;
use crate::config::Config;
use crate::error::{OfflineError, Result};
use crate::events::EMULATOR_LOG_TARGET;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

/// How to launch the emulator
#[derive(Debug, Clone, PartialEq)]
pub struct EmulatorCommand {
    /// Java executable
    pub java_path: PathBuf,
    /// Directory holding `StepFunctionsLocal.jar`; the process runs there
    pub working_dir: PathBuf,
    /// Where task states invoke functions
    pub lambda_endpoint: String,
    /// Account the emulator pretends to belong to
    pub account_id: String,
    /// Region the emulator pretends to run in
    pub region: String,
    /// Multiplier applied to `Wait` state durations
    pub wait_time_scale: Option<f64>,
}

impl EmulatorCommand {
    /// Launch parameters for `config`
    pub fn from_config(config: &Config) -> Self {
        Self {
            java_path: config.java_path.clone(),
            working_dir: config.path.clone(),
            lambda_endpoint: config.lambda_endpoint.clone(),
            account_id: config.account_id.clone(),
            region: config.region.clone(),
            wait_time_scale: config.wait_time_scale,
        }
    }

    /// Arguments passed to the Java executable
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-jar".into(),
            JAR_FILE_NAME.into(),
            "--lambda-endpoint".into(),
            self.lambda_endpoint.clone().into(),
            "--aws-account".into(),
            self.account_id.clone().into(),
            "--region".into(),
            self.region.clone().into(),
        ];

        if let Some(scale) = self.wait_time_scale {
            args.push("--wait-time-scale".into());
            args.push(scale.to_string().into());
        }

        args
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.java_path);
        cmd.args(self.args())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Start the emulator
    ///
    /// Standard error is drained into the log right away; standard output is
    /// left for the caller to take with [`EmulatorProcess::take_stdout`].
    pub fn spawn(&self) -> Result<EmulatorProcess> {
        tracing::debug!(
            "Spawning {} {:?} in {}",
            self.java_path.display(),
            self.args(),
            self.working_dir.display()
        );

        let mut child = self.command().spawn().map_err(|e| {
            OfflineError::Start(format!("could not run {}: {e}", self.java_path.display()))
        })?;

        let stdout = child.stdout.take();
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(target: EMULATOR_LOG_TARGET, "{}", line);
                }
            })
        });

        tracing::info!("Step Functions Local started (pid {:?})", child.id());
        Ok(EmulatorProcess {
            child,
            stdout,
            stderr_task,
        })
    }
}

/// A running emulator
#[derive(Debug)]
pub struct EmulatorProcess {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr_task: Option<JoinHandle<()>>,
}

impl EmulatorProcess {
    /// OS process id, while the process is running
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take the line-buffered standard output stream
    ///
    /// Returns `None` after the first call.
    pub fn take_stdout(&mut self) -> Option<BufReader<ChildStdout>> {
        self.stdout.take().map(BufReader::new)
    }

    /// Kill the process and wait for it to go away
    pub async fn stop(mut self) -> Result<()> {
        if self.child.try_wait()?.is_none() {
            self.child.kill().await?;
        }

        if let Some(task) = self.stderr_task.take() {
            if let Err(e) = task.await {
                tracing::debug!("stderr reader ended abnormally: {}", e);
            }
        }

        tracing::info!("Step Functions Local stopped");
        Ok(())
    }
}
