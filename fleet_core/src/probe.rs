//! Probe executor: runs the remote `ping` over an existing multiplexed
//! session and classifies the outcome.

use std::fmt;
use std::sync::Arc;

use fleet_config::Settings;
use runner::Runner;
use tracing::{debug, warn};

/// How a single-node probe attempt turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The remote `ping` produced a parseable `rtt` summary line.
    Ok,
    /// The command succeeded but no `rtt` line was found.
    NoRtt,
    /// The remote `ping` exited non-zero.
    PingError,
    /// The wall-clock timeout fired before the command completed.
    SshTimeout,
    /// Any other local failure (e.g. failed to spawn `ssh` at all).
    Exception,
}

impl ProbeOutcome {
    /// Lower-case label used as the Prometheus `status` value and the JSON
    /// `status` field, matching the original Python classifier strings
    /// verbatim.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NoRtt => "no_rtt",
            Self::PingError => "ping_error",
            Self::SshTimeout => "ssh_timeout",
            Self::Exception => "exception",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parsed RTT summary, present only when `outcome == ProbeOutcome::Ok`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub mdev: f64,
}

/// Result of probing one node.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub hostname: String,
    pub outcome: ProbeOutcome,
    pub stats: Option<RttStats>,
}

/// Runs the remote ping command and classifies its result.
pub struct ProbeExecutor {
    runner: Arc<dyn Runner>,
    config: Arc<Settings>,
}

impl ProbeExecutor {
    #[must_use]
    pub fn new(config: Arc<Settings>, runner: Arc<dyn Runner>) -> Self {
        Self { runner, config }
    }

    /// Run `ping -c<count> -W<timeout> <target>` on `hostname` via its
    /// existing control channel, under a hard wall-clock timeout. No
    /// retries: the caller's fan-out worker pool retries at a higher level
    /// if it chooses to.
    pub async fn ping(&self, hostname: &str, target: &str) -> ProbeResult {
        let control_path = self.config.ssh_control_path(hostname);
        let remote_cmd = format!(
            "ping -c{} -W{} {target}",
            self.config.ping_count, self.config.ping_timeout
        );

        debug!(hostname, target, "running SSH ping");

        let args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.ssh_connect_timeout.as_secs()),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-i".to_string(),
            self.config.ssh_key_path.to_string_lossy().into_owned(),
            "-l".to_string(),
            self.config.ssh_username.clone(),
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
            hostname.to_string(),
            remote_cmd,
        ];

        let outcome = self
            .runner
            .run("ssh", &args, self.config.ssh_subprocess_timeout)
            .await;

        let (outcome_label, stats) = classify(&outcome, hostname);
        ProbeResult {
            hostname: hostname.to_string(),
            outcome: outcome_label,
            stats,
        }
    }
}

fn classify(outcome: &runner::RunOutcome, hostname: &str) -> (ProbeOutcome, Option<RttStats>) {
    if outcome.timed_out {
        warn!(hostname, "SSH ping timed out");
        return (ProbeOutcome::SshTimeout, None);
    }

    let Some(code) = outcome.exit_code else {
        warn!(hostname, error = %outcome.stderr, "error pinging from node");
        return (ProbeOutcome::Exception, None);
    };

    if code != 0 {
        warn!(hostname, code, "ping command failed");
        return (ProbeOutcome::PingError, None);
    }

    let merged = format!("{}{}", outcome.stdout, outcome.stderr);
    match parse_rtt_line(&merged) {
        Some(stats) => (ProbeOutcome::Ok, Some(stats)),
        None => {
            warn!(hostname, "no RTT line found in ping output");
            (ProbeOutcome::NoRtt, None)
        }
    }
}

/// Parse a line of the shape `rtt min/avg/max/mdev = A/B/C/D ms` into its
/// four floats.
fn parse_rtt_line(output: &str) -> Option<RttStats> {
    let line = output.lines().find(|l| l.starts_with("rtt"))?;
    let after_eq = line.split('=').nth(1)?;
    let numbers = after_eq.split_whitespace().next()?;
    let mut parts = numbers.split('/');
    let min = parts.next()?.parse().ok()?;
    let avg = parts.next()?.parse().ok()?;
    let max = parts.next()?.parse().ok()?;
    let mdev = parts.next()?.parse().ok()?;
    Some(RttStats { min, avg, max, mdev })
}

/// Strip a target at the first `?` and trim surrounding whitespace, matching
/// the original's `target.split('?')[0].strip()`.
#[must_use]
pub fn sanitize_target(target: &str) -> String {
    target.split('?').next().unwrap_or("").trim().to_string()
}

/// Whether `target` resolves via the system resolver (DNS or a literal
/// address).
pub async fn is_valid_target(target: &str) -> bool {
    tokio::net::lookup_host((target, 0u16)).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner::RunOutcome;

    #[test]
    fn parses_standard_rtt_line() {
        let output = "PING 1.1.1.1 (1.1.1.1): 56 data bytes\n\
                       --- 1.1.1.1 ping statistics ---\n\
                       rtt min/avg/max/mdev = 10.123/12.456/15.789/1.234 ms\n";
        let stats = parse_rtt_line(output).unwrap();
        assert_eq!(stats.min, 10.123);
        assert_eq!(stats.avg, 12.456);
        assert_eq!(stats.max, 15.789);
        assert_eq!(stats.mdev, 1.234);
    }

    #[test]
    fn missing_rtt_line_yields_none() {
        assert!(parse_rtt_line("no stats here").is_none());
    }

    #[test]
    fn classify_timeout() {
        let outcome = RunOutcome {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        };
        let (label, stats) = classify(&outcome, "a.example");
        assert_eq!(label, ProbeOutcome::SshTimeout);
        assert!(stats.is_none());
    }

    #[test]
    fn classify_spawn_failure_as_exception() {
        let outcome = RunOutcome {
            exit_code: None,
            stdout: String::new(),
            stderr: "no such file".to_string(),
            timed_out: false,
        };
        let (label, _) = classify(&outcome, "a.example");
        assert_eq!(label, ProbeOutcome::Exception);
    }

    #[test]
    fn classify_nonzero_exit_as_ping_error() {
        let outcome = RunOutcome {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "ssh: connect to host".to_string(),
            timed_out: false,
        };
        let (label, _) = classify(&outcome, "a.example");
        assert_eq!(label, ProbeOutcome::PingError);
    }

    #[test]
    fn classify_success_without_rtt_line() {
        let outcome = RunOutcome {
            exit_code: Some(0),
            stdout: "no rtt here".to_string(),
            stderr: String::new(),
            timed_out: false,
        };
        let (label, stats) = classify(&outcome, "a.example");
        assert_eq!(label, ProbeOutcome::NoRtt);
        assert!(stats.is_none());
    }

    #[test]
    fn classify_success_with_rtt_line() {
        let outcome = RunOutcome {
            exit_code: Some(0),
            stdout: "rtt min/avg/max/mdev = 1.0/2.0/3.0/0.5 ms".to_string(),
            stderr: String::new(),
            timed_out: false,
        };
        let (label, stats) = classify(&outcome, "a.example");
        assert_eq!(label, ProbeOutcome::Ok);
        assert_eq!(stats.unwrap().avg, 2.0);
    }

    #[test]
    fn sanitize_target_truncates_at_question_mark_and_trims() {
        assert_eq!(sanitize_target("  1.1.1.1?x=1  "), "1.1.1.1");
        assert_eq!(sanitize_target("example.com"), "example.com");
    }

    #[tokio::test]
    async fn is_valid_target_accepts_literal_ip() {
        assert!(is_valid_target("127.0.0.1").await);
    }

    #[tokio::test]
    async fn is_valid_target_rejects_garbage() {
        assert!(!is_valid_target("not a host").await);
    }
}
