//! Host reboot handler.
//!
//! Runs the configured reboot command (`sudo reboot` by default) with a
//! timeout and reports the outcome. The command line is fixed at startup;
//! nothing from a request ever reaches it.

use std::time::{Duration, Instant};

use tokio::process::Command;

/// Upper bound on the reboot command itself.
const DEFAULT_REBOOT_TIMEOUT: Duration = Duration::from_secs(60);

/// Delay before the command runs so the triggering response can be sent.
const DEFAULT_REBOOT_DELAY: Duration = Duration::from_secs(1);

/// Outcome of one reboot attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebootResult {
    pub success: bool,
    pub message: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RebootCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    delay: Duration,
}

impl RebootCommand {
    /// Parse a whitespace-separated command line. `None` if blank.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            timeout: DEFAULT_REBOOT_TIMEOUT,
            delay: DEFAULT_REBOOT_DELAY,
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the command in the background after the configured delay.
    pub fn spawn(&self) -> tokio::task::JoinHandle<RebootResult> {
        let command = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(command.delay).await;
            command.execute().await
        })
    }

    /// Run the command now and wait for it.
    pub async fn execute(&self) -> RebootResult {
        let start = Instant::now();
        tracing::warn!(program = %self.program, "Executing host reboot");

        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program).args(&self.args).output(),
        )
        .await;

        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) if output.status.success() => RebootResult {
                success: true,
                message: "Reboot command accepted".to_string(),
                duration_ms,
            },
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::error!(
                    program = %self.program,
                    status = output.status.code().unwrap_or(-1),
                    stderr = %stderr.trim(),
                    "Reboot command failed",
                );
                RebootResult {
                    success: false,
                    message: format!(
                        "Reboot command failed (exit {}): {}",
                        output.status.code().unwrap_or(-1),
                        stderr.trim(),
                    ),
                    duration_ms,
                }
            }
            Ok(Err(e)) => {
                tracing::error!(program = %self.program, error = %e, "Failed to execute reboot command");
                RebootResult {
                    success: false,
                    message: format!("Failed to execute {}: {e}", self.program),
                    duration_ms,
                }
            }
            Err(_) => {
                tracing::error!(program = %self.program, "Reboot command timed out");
                RebootResult {
                    success: false,
                    message: format!(
                        "Reboot command timed out after {}s",
                        self.timeout.as_secs()
                    ),
                    duration_ms,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_line() {
        let command = RebootCommand::from_command_line("sudo reboot").unwrap();
        assert_eq!(command.program, "sudo");
        assert_eq!(command.args, vec!["reboot"]);
        assert_eq!(command.timeout, Duration::from_secs(60));
        assert!(RebootCommand::from_command_line("").is_none());
    }

    #[tokio::test]
    async fn missing_program_reports_failure() {
        let command =
            RebootCommand::from_command_line("/nonexistent/airwatch-reboot-helper").unwrap();
        let result = command.execute().await;
        assert!(!result.success);
        assert!(result.message.starts_with("Failed to execute"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("rebooted");
        let command =
            RebootCommand::from_command_line(&format!("touch {}", marker.display())).unwrap();

        let result = command.execute().await;
        assert!(result.success, "{}", result.message);
        assert!(marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let result = RebootCommand::from_command_line("false")
            .unwrap()
            .execute()
            .await;
        assert!(!result.success);
        assert!(result.message.contains("exit 1"));
    }
}
