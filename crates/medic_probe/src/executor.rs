//! Shell command execution for restart and housekeeping actions

use crate::ProbeError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Runs shell commands on the local host with a timeout.
#[derive(Debug, Clone, Default)]
pub struct Executor;

/// Output from command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Check if a tool is available
    #[instrument(skip(self))]
    pub async fn check_tool(&self, tool: &str) -> bool {
        let cmd = format!("command -v {tool}");
        match self.run(&cmd, Duration::from_secs(5)).await {
            Ok(output) => output.exit_code == 0,
            Err(_) => false,
        }
    }

    /// Run a command with timeout
    #[instrument(skip(self))]
    pub async fn run(&self, cmd: &str, timeout: Duration) -> Result<CommandOutput, ProbeError> {
        debug!(cmd = %cmd, "Running local command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProbeError::ExecutionError(e.to_string()))?;

        let result = tokio::time::timeout(timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code().unwrap_or(-1),
            }),
            Ok(Err(e)) => Err(ProbeError::ExecutionError(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(timeout)),
        }
    }

    /// Run a command with timeout, returning stdout on success
    pub async fn run_timeout(&self, cmd: &str, timeout: Duration) -> Result<String, ProbeError> {
        let output = self.run(cmd, timeout).await?;
        if output.exit_code != 0 {
            return Err(ProbeError::ExecutionError(format!(
                "Command failed with exit code {}: {}",
                output.exit_code, output.stderr
            )));
        }
        Ok(output.stdout)
    }
}
