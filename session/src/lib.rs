//! Lifecycle of multiplexed SSH control channels ("sessions") to remote
//! nodes.
//!
//! A session, once established, lets many short-lived remote commands reuse
//! a single authenticated transport with sub-millisecond setup — the whole
//! reason the fan-out probe executor can afford to hit hundreds of nodes per
//! request. This module owns only the `SessionState` map (§5 of the design
//! doc): present-or-absent per hostname, guarded by one `std::sync::Mutex`
//! that is never held across a subprocess invocation.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleet_config::Settings;
use runner::Runner;
use tracing::{debug, info, warn};

/// Lifecycle manager for multiplexed SSH control channels.
pub struct SessionManager {
    sessions: Mutex<HashMap<String, PathBuf>>,
    config: Arc<Settings>,
    runner: Arc<dyn Runner>,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: Arc<Settings>, runner: Arc<dyn Runner>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
            runner,
        }
    }

    fn common_opts(&self) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=No".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.ssh_connect_timeout.as_secs()),
        ]
    }

    /// Start a control-master session to `hostname`. Idempotent: returns
    /// `true` immediately if a session is already recorded present.
    ///
    /// The insert happens *before* the subprocess spawns, which is the
    /// load-bearing ordering primitive that prevents two concurrent callers
    /// from racing to start duplicate masters; on spawn failure the
    /// optimistic entry is rolled back.
    pub async fn start(&self, hostname: &str) -> bool {
        let control_path = self.config.ssh_control_path(hostname);

        {
            let mut sessions = self.sessions.lock().unwrap();
            if sessions.contains_key(hostname) {
                return true;
            }
            sessions.insert(hostname.to_string(), control_path.clone());
        }

        debug!(hostname, username = %self.config.ssh_username, "starting persistent SSH session");

        let mut args = vec!["-MNf".to_string()];
        args.extend(self.common_opts());
        args.extend([
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
            "-o".to_string(),
            "ControlPersist=yes".to_string(),
        ]);
        args.push("-i".to_string());
        args.push(self.config.ssh_key_path.to_string_lossy().into_owned());
        args.push(format!("{}@{hostname}", self.config.ssh_username));

        let outcome = self
            .runner
            .run("ssh", &args, self.config.ssh_connect_timeout + Duration::from_secs(5))
            .await;

        if outcome.success() {
            true
        } else {
            let reason = if outcome.stderr.trim().is_empty() {
                format!("exit code {:?}", outcome.exit_code)
            } else {
                outcome.stderr.trim().to_string()
            };
            warn!(hostname, reason, "SSH session start failed");
            self.sessions.lock().unwrap().remove(hostname);
            false
        }
    }

    /// Stop the session for `hostname`. No-op if absent. Failures are
    /// logged, never raised.
    pub async fn stop(&self, hostname: &str) {
        let control_path = {
            let mut sessions = self.sessions.lock().unwrap();
            match sessions.remove(hostname) {
                Some(path) => path,
                None => return,
            }
        };

        debug!(hostname, "stopping SSH session");

        let mut args = vec!["-O".to_string(), "exit".to_string()];
        args.extend(self.common_opts());
        args.extend([
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
        ]);
        args.push(format!("{}@{hostname}", self.config.ssh_username));

        let outcome = self.runner.run("ssh", &args, Duration::from_secs(5)).await;
        if !outcome.success() {
            let reason = if outcome.stderr.trim().is_empty() {
                format!("exit code {:?}", outcome.exit_code)
            } else {
                outcome.stderr.trim().to_string()
            };
            warn!(hostname, reason, "SSH session stop failed");
        }
    }

    /// Query the control master for `hostname` directly (`ssh -O check`).
    /// Zero exit means healthy.
    pub async fn check(&self, hostname: &str) -> bool {
        let control_path = self.config.ssh_control_path(hostname);
        self.check_socket(&control_path, hostname, self.config.ssh_connect_timeout)
            .await
    }

    async fn check_socket(&self, control_path: &PathBuf, hostname: &str, timeout: Duration) -> bool {
        let args = vec![
            "-O".to_string(),
            "check".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", control_path.display()),
            format!("{}@{hostname}", self.config.ssh_username),
        ];
        let outcome = self.runner.run("ssh", &args, timeout).await;
        outcome.success()
    }

    /// Reconcile the active session set to exactly `desired`: start every
    /// missing hostname, stop every hostname no longer wanted.
    pub async fn sync(&self, desired: &HashSet<String>) {
        let current: HashSet<String> = self.sessions.lock().unwrap().keys().cloned().collect();

        for host in desired.difference(&current) {
            self.start(host).await;
        }
        for host in current.difference(desired) {
            self.stop(host).await;
        }
    }

    /// Start sessions for every hostname in `hostnames` not already present,
    /// fanned out across a pool bounded by `max_workers`. Calls
    /// `progress_cb(hostname, ok)` as each completes, and logs progress every
    /// 50 completions (and on the final one), matching the original's
    /// `completed % 50 == 0 or completed == len(to_start)` cadence.
    pub async fn start_parallel<F>(&self, hostnames: &[String], max_workers: usize, progress_cb: F)
    where
        F: Fn(&str, bool) + Send + Sync,
    {
        let current: HashSet<String> = self.sessions.lock().unwrap().keys().cloned().collect();
        let mut to_start: Vec<String> = hostnames
            .iter()
            .filter(|h| !current.contains(*h))
            .cloned()
            .collect();
        to_start.sort();

        if to_start.is_empty() {
            info!(count = hostnames.len(), "all sessions already active");
            return;
        }

        info!(count = to_start.len(), max_workers, "starting SSH sessions");

        let semaphore = Arc::new(tokio::sync::Semaphore::new(max_workers.max(1)));
        let total = to_start.len();
        let completed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let progress_cb = &progress_cb;

        let tasks = to_start.into_iter().map(|hostname| {
            let semaphore = semaphore.clone();
            let completed = completed.clone();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                let ok = self.start(&hostname).await;
                progress_cb(&hostname, ok);

                let done = completed.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                if done % 50 == 0 || done == total {
                    info!(completed = done, total, "session startup progress");
                }
            }
        });

        futures::future::join_all(tasks).await;
    }

    /// Scan the control socket directory for sockets this process didn't
    /// start itself (e.g. it survived a process restart), adopting live ones
    /// and deleting dead ones. Returns `(recovered, removed)`.
    pub async fn recover_stale_sockets(&self) -> (usize, usize) {
        let control_dir = self.config.ssh_control_dir();
        let prefix = self.config.ssh_control_prefix();

        let mut entries = match tokio::fs::read_dir(&control_dir).await {
            Ok(entries) => entries,
            Err(_) => {
                info!(dir = %control_dir.display(), "control socket directory does not exist");
                return (0, 0);
            }
        };

        let mut recovered = 0usize;
        let mut removed = 0usize;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(remainder) = name.strip_prefix(&prefix) else {
                continue;
            };
            let Some(hostname) = parse_hostname(remainder) else {
                debug!(file = name, "could not parse hostname from socket file");
                continue;
            };

            let socket_path = entry.path();
            let alive = self
                .check_socket(&socket_path, &hostname, Duration::from_secs(5))
                .await;

            if alive {
                info!(hostname, "recovered live session from socket");
                self.sessions
                    .lock()
                    .unwrap()
                    .insert(hostname.clone(), socket_path);
                recovered += 1;
            } else {
                debug!(hostname, "removing stale socket");
                if let Err(e) = tokio::fs::remove_file(&socket_path).await {
                    warn!(path = %socket_path.display(), error = %e, "error removing stale socket");
                }
                removed += 1;
            }
        }

        info!(recovered, removed, "socket cleanup complete");
        (recovered, removed)
    }

    /// Stop every active session. Used on shutdown.
    pub async fn cleanup(&self) {
        let hosts: Vec<String> = self.sessions.lock().unwrap().keys().cloned().collect();
        for host in hosts {
            self.stop(&host).await;
        }
        self.sessions.lock().unwrap().clear();
    }

    /// Snapshot of hostnames currently believed present. Read-only, used by
    /// the HTTP surface for diagnostics.
    #[must_use]
    pub fn snapshot_present(&self) -> HashSet<String> {
        self.sessions.lock().unwrap().keys().cloned().collect()
    }

    #[must_use]
    pub fn is_present(&self, hostname: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(hostname)
    }
}

/// Parse `hostname` out of a control-socket basename remainder using the
/// template's `user@host:port` suffix convention: first `@` to last `:`.
fn parse_hostname(remainder: &str) -> Option<String> {
    let at_idx = remainder.find('@')?;
    let colon_idx = remainder.rfind(':')?;
    if colon_idx <= at_idx + 1 {
        return None;
    }
    Some(remainder[at_idx + 1..colon_idx].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner::RunOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    struct ScriptedRunner {
        next_success: std::sync::atomic::AtomicBool,
        calls: AtomicUsize,
    }

    impl ScriptedRunner {
        fn new(success: bool) -> Self {
            Self {
                next_success: std::sync::atomic::AtomicBool::new(success),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Runner for ScriptedRunner {
        async fn run(&self, _program: &str, _args: &[String], _timeout: StdDuration) -> RunOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ok = self.next_success.load(Ordering::SeqCst);
            RunOutcome {
                exit_code: Some(if ok { 0 } else { 1 }),
                stdout: String::new(),
                stderr: if ok { String::new() } else { "denied".to_string() },
                timed_out: false,
            }
        }
    }

    fn settings() -> Arc<Settings> {
        Arc::new(Settings {
            nlnog_api: String::new(),
            nlnog_participants_api: String::new(),
            nlnog_api_timeout: StdDuration::from_secs(10),
            ssh_username: "rise".to_string(),
            ssh_connect_timeout: StdDuration::from_secs(5),
            ssh_subprocess_timeout: StdDuration::from_secs(15),
            ssh_key_path: PathBuf::from("/tmp/key"),
            ssh_control_path_template: "/tmp/ssh-control-test/nlnog-%r@%h:%p".to_string(),
            ping_count: 10,
            ping_timeout: 5,
            startup_max_workers: 10,
            threads: 10,
            cache_refresh_interval: StdDuration::from_secs(300),
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "INFO".to_string(),
            debug: false,
        })
    }

    #[tokio::test]
    async fn start_is_idempotent_once_present() {
        let runner = Arc::new(ScriptedRunner::new(true));
        let manager = SessionManager::new(settings(), runner.clone());

        assert!(manager.start("a.example").await);
        assert!(manager.start("a.example").await);
        // Second call short-circuits on presence, no second spawn.
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_spawn_rolls_back_optimistic_insert() {
        let runner = Arc::new(ScriptedRunner::new(false));
        let manager = SessionManager::new(settings(), runner);

        assert!(!manager.start("a.example").await);
        assert!(!manager.is_present("a.example"));
    }

    #[tokio::test]
    async fn stop_is_noop_when_absent() {
        let runner = Arc::new(ScriptedRunner::new(true));
        let manager = SessionManager::new(settings(), runner.clone());

        manager.stop("never-started.example").await;
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sync_adds_and_removes_to_match_desired_set() {
        let runner = Arc::new(ScriptedRunner::new(true));
        let manager = SessionManager::new(settings(), runner);

        manager.start("keep.example").await;
        manager.start("drop.example").await;

        let mut desired = HashSet::new();
        desired.insert("keep.example".to_string());
        desired.insert("new.example".to_string());

        manager.sync(&desired).await;

        let present = manager.snapshot_present();
        assert!(present.contains("keep.example"));
        assert!(present.contains("new.example"));
        assert!(!present.contains("drop.example"));
    }

    #[test]
    fn parse_hostname_from_socket_filename() {
        assert_eq!(
            parse_hostname("rise@ams01.ring.nlnog.net:22"),
            Some("ams01.ring.nlnog.net".to_string())
        );
        assert_eq!(parse_hostname("no-at-sign:22"), None);
        assert_eq!(parse_hostname("rise@hostwithoutport"), None);
    }

    #[tokio::test]
    async fn recover_stale_sockets_adopts_live_and_removes_dead() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = (*settings()).clone();
        cfg.ssh_control_path_template =
            format!("{}/nlnog-%r@%h:%p", dir.path().to_string_lossy());
        let cfg = Arc::new(cfg);

        tokio::fs::write(dir.path().join("nlnog-rise@alive.example:22"), b"")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("nlnog-rise@dead.example:22"), b"")
            .await
            .unwrap();

        struct PerHostRunner;
        #[async_trait::async_trait]
        impl Runner for PerHostRunner {
            async fn run(&self, _program: &str, args: &[String], _timeout: StdDuration) -> RunOutcome {
                let alive = args.iter().any(|a| a.contains("alive.example"));
                RunOutcome {
                    exit_code: Some(if alive { 0 } else { 1 }),
                    stdout: String::new(),
                    stderr: String::new(),
                    timed_out: false,
                }
            }
        }

        let manager = SessionManager::new(cfg, Arc::new(PerHostRunner));
        let (recovered, removed) = manager.recover_stale_sockets().await;

        assert_eq!(recovered, 1);
        assert_eq!(removed, 1);
        assert!(manager.is_present("alive.example"));
        assert!(!dir.path().join("nlnog-rise@dead.example:22").exists());
    }
}
