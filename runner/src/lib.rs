//! Subprocess execution seam.
//!
//! Session management and probing are fundamentally a process supervisor for
//! `ssh` (and `ssh-keygen`, `ping` on the remote side). Everything that
//! shells out depends on `Arc<dyn Runner>` rather than on
//! `tokio::process::Command` directly, so tests can substitute a scripted
//! runner without invoking real binaries.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Result of running an external command.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Process exit code, if the process ran to completion (`None` if it was
    /// killed before exiting, e.g. by the wall-clock timeout).
    pub exit_code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Whether the wall-clock timeout fired before the process exited.
    pub timed_out: bool,
}

impl RunOutcome {
    /// True iff the process ran to completion with exit code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external programs under a wall-clock timeout.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run `program` with `args`, killing it if it hasn't exited within
    /// `timeout`.
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> RunOutcome;
}

/// Production `Runner` backed by `tokio::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

#[async_trait]
impl Runner for TokioRunner {
    async fn run(&self, program: &str, args: &[String], wall_clock: Duration) -> RunOutcome {
        debug!(program, ?args, "spawning subprocess");

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program, error = %e, "failed to spawn subprocess");
                return RunOutcome {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                    timed_out: false,
                };
            }
        };

        match timeout(wall_clock, child.wait_with_output()).await {
            Ok(Ok(output)) => RunOutcome {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                timed_out: false,
            },
            Ok(Err(e)) => {
                warn!(program, error = %e, "subprocess wait failed");
                RunOutcome {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: e.to_string(),
                    timed_out: false,
                }
            }
            Err(_) => {
                warn!(program, ?wall_clock, "subprocess timed out");
                RunOutcome {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: "timed out".to_string(),
                    timed_out: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_is_exit_code_zero() {
        let runner = TokioRunner;
        let outcome = runner
            .run("true", &[], Duration::from_secs(5))
            .await;
        assert!(outcome.success());
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_success() {
        let runner = TokioRunner;
        let outcome = runner
            .run("false", &[], Duration::from_secs(5))
            .await;
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn missing_binary_is_reported_not_panicked() {
        let runner = TokioRunner;
        let outcome = runner
            .run(
                "definitely-not-a-real-binary-xyz",
                &[],
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(outcome.exit_code, None);
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let runner = TokioRunner;
        let outcome = runner
            .run(
                "sleep",
                &["5".to_string()],
                Duration::from_millis(50),
            )
            .await;
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, None);
    }
}
