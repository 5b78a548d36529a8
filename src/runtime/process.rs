//! Subprocess execution with timeouts.

use anyhow::{Context, Result, bail};
use log::debug;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::RealRuntime;

/// A fully substituted program invocation.
///
/// Arguments are passed to the program as-is, never re-parsed by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Exit state of a command that ran attached to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    pub code: Option<i32>,
}

impl CommandStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) async fn capture_impl(
        &self,
        command: &CommandLine,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        debug!("Running {} (timeout {:?})", command, timeout);

        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        // Dropping the output future on timeout kills the child.
        let output = match tokio::time::timeout(timeout, child).await {
            Ok(output) => output.with_context(|| format!("Failed to run `{}`", command))?,
            Err(_) => bail!("`{}` timed out after {:?}", command, timeout),
        };

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    #[tracing::instrument(skip(self))]
    pub(crate) async fn execute_impl(
        &self,
        command: &CommandLine,
        timeout: Option<Duration>,
    ) -> Result<CommandStatus> {
        debug!("Executing {}", command);

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start `{}`", command))?;

        let status = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    let _ = child.kill().await;
                    bail!("`{}` timed out after {:?}", command, limit);
                }
            },
            None => child.wait().await,
        }
        .with_context(|| format!("Failed to wait for `{}`", command))?;

        Ok(CommandStatus {
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh", vec!["-c".into(), script.into()])
    }

    #[test]
    fn test_command_line_display_quotes_spaces() {
        let cmd = CommandLine::new(
            "sudo",
            vec![
                "dpkg".into(),
                "-i".into(),
                "/tmp/my dir/app.deb".into(),
            ],
        );
        assert_eq!(cmd.to_string(), r#"sudo dpkg -i "/tmp/my dir/app.deb""#);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_collects_output_and_code() {
        let runtime = RealRuntime;
        let output = runtime
            .capture(&sh("echo app 1.2.3; echo oops >&2; exit 3"), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "app 1.2.3");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_times_out() {
        let runtime = RealRuntime;
        let started = std::time::Instant::now();
        let result = runtime
            .capture(&sh("sleep 5"), Duration::from_millis(200))
            .await;

        assert!(result.unwrap_err().to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_capture_missing_program() {
        let runtime = RealRuntime;
        let result = runtime
            .capture(
                &CommandLine::new("ghpm-no-such-program", vec!["--version".into()]),
                Duration::from_secs(5),
            )
            .await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_reports_status() {
        let runtime = RealRuntime;

        let status = runtime.execute(&sh("exit 0"), None).await.unwrap();
        assert!(status.success());

        let status = runtime.execute(&sh("exit 7"), None).await.unwrap();
        assert_eq!(status.code, Some(7));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_times_out() {
        let runtime = RealRuntime;
        let result = runtime
            .execute(&sh("sleep 5"), Some(Duration::from_millis(200)))
            .await;
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }
}
