//! Typed, environment-driven configuration for the fleet session core.
//!
//! Mirrors the original ring exporter's `core/config.py`: every setting has a
//! documented default, is read once, and is validated eagerly rather than on
//! first use. Unlike the Python module-level globals, this is a plain struct
//! built once in `main` and threaded through the application via `Arc`.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use runner::Runner;
use thiserror::Error;
use tracing::{info, warn};

/// Failures loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {name} must be a valid {kind}, got {value:?}")]
    InvalidValue {
        name: &'static str,
        kind: &'static str,
        value: String,
    },
}

/// Fully-resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub nlnog_api: String,
    pub nlnog_participants_api: String,
    pub nlnog_api_timeout: Duration,

    pub ssh_username: String,
    pub ssh_connect_timeout: Duration,
    pub ssh_subprocess_timeout: Duration,
    pub ssh_key_path: PathBuf,
    pub ssh_control_path_template: String,

    pub ping_count: u32,
    pub ping_timeout: u32,

    pub startup_max_workers: usize,
    pub threads: usize,
    pub cache_refresh_interval: Duration,

    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub debug: bool,
}

impl Settings {
    /// Load settings from the process environment (optionally populated by a
    /// `.env` file via `dotenvy`, matching the teacher's `dotenv().ok()`
    /// call at process start).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric or boolean field
    /// can't be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            nlnog_api: env_or(
                "NLNOG_API",
                "https://api.ring.nlnog.net/1.0/nodes/active",
            ),
            nlnog_participants_api: env_or(
                "NLNOG_PARTICIPANTS_API",
                "https://api.ring.nlnog.net/1.0/participants",
            ),
            nlnog_api_timeout: Duration::from_secs(parse_env("NLNOG_API_TIMEOUT", 10)?),

            ssh_username: env_or("SSH_USERNAME", "rise"),
            ssh_connect_timeout: Duration::from_secs(parse_env("SSH_CONNECT_TIMEOUT", 5)?),
            ssh_subprocess_timeout: Duration::from_secs(parse_env(
                "SSH_SUBPROCESS_TIMEOUT",
                15,
            )?),
            ssh_key_path: PathBuf::from(env_or("SSH_KEY_PATH", "/app/ssh/nlnog")),
            ssh_control_path_template: env_or(
                "SSH_CONTROL_PATH_TEMPLATE",
                "/tmp/ssh-control/nlnog-%r@%h:%p",
            ),

            ping_count: parse_env("PING_COUNT", 10)?,
            ping_timeout: parse_env("PING_TIMEOUT", 5)?,

            startup_max_workers: parse_env("STARTUP_MAX_WORKERS", 50)?,
            threads: parse_env("THREADS", 100)?,
            cache_refresh_interval: Duration::from_secs(parse_env(
                "CACHE_REFRESH_INTERVAL",
                300,
            )?),

            host: env::var("FLASK_HOST")
                .or_else(|_| env::var("HOST"))
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("FLASK_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "FLASK_PORT/PORT",
                    kind: "u16",
                    value: env::var("FLASK_PORT")
                        .or_else(|_| env::var("PORT"))
                        .unwrap_or_default(),
                })?,
            log_level: env_or("LOG_LEVEL", "INFO").to_uppercase(),
            debug: parse_bool_env("DEBUG"),
        })
    }

    /// Expand the control-path template (`%r %h %p`) for `hostname`,
    /// substituting the configured username, the hostname, and port `22`,
    /// then performing `~` expansion exactly as `os.path.expanduser` does.
    #[must_use]
    pub fn ssh_control_path(&self, hostname: &str) -> PathBuf {
        let expanded = self
            .ssh_control_path_template
            .replace("%r", &self.ssh_username)
            .replace("%h", hostname)
            .replace("%p", "22");
        expand_tilde(&expanded)
    }

    /// The control socket directory, derived from the template (used by
    /// stale-socket recovery to know where to scan).
    #[must_use]
    pub fn ssh_control_dir(&self) -> PathBuf {
        self.ssh_control_path("x")
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// The fixed filename prefix shared by every control socket this
    /// template produces (everything in the basename before the first `%`).
    #[must_use]
    pub fn ssh_control_prefix(&self) -> String {
        let basename = self
            .ssh_control_path_template
            .rsplit('/')
            .next()
            .unwrap_or(&self.ssh_control_path_template);
        basename.split('%').next().unwrap_or(basename).to_string()
    }

    /// Log a configuration summary and validate the SSH key, mirroring the
    /// original's `_startup_banner`/`_validate_ssh_key`. Never fails the
    /// process: a bad key is logged at `error` and sessions will simply fail
    /// to start, which the refresh loop observes and labels.
    pub async fn log_startup_banner(&self, runner: &dyn Runner) {
        info!("============================================================");
        info!("Starting NLNOG Ring Prometheus Exporter");
        info!("============================================================");
        info!("Configuration:");
        info!(nlnog_api = %self.nlnog_api, "  NLNOG API");
        info!(nlnog_participants_api = %self.nlnog_participants_api, "  NLNOG Participants");
        info!(timeout_s = self.nlnog_api_timeout.as_secs(), "  NLNOG API timeout");
        info!(username = %self.ssh_username, "  SSH username");
        info!(timeout_s = self.ssh_connect_timeout.as_secs(), "  SSH connect timeout");
        info!(timeout_s = self.ssh_subprocess_timeout.as_secs(), "  SSH command timeout");
        info!(template = %self.ssh_control_path_template, "  SSH control path");
        info!(count = self.ping_count, timeout_s = self.ping_timeout, "  Ping count/timeout");
        info!(workers = self.startup_max_workers, "  Startup max workers");
        info!(threads = self.threads, "  Worker threads");
        info!(interval_s = self.cache_refresh_interval.as_secs(), "  Cache refresh");
        info!(level = %self.log_level, "  Log level");
        info!(debug = self.debug, "  Debug mode");
        info!(host = %self.host, port = self.port, "  Listen");

        info!("------------------------------------------------------------");
        let key_ok = self.validate_ssh_key(runner).await;
        info!("------------------------------------------------------------");

        if key_ok {
            info!("SSH key validation passed");
        } else {
            tracing::error!("SSH key validation failed — SSH sessions will not work");
        }
        info!("============================================================");
    }

    /// Check that the configured SSH key exists, is a regular file, and is
    /// readable; warn on loose permissions; log its `ssh-keygen` fingerprint
    /// on a best-effort basis.
    pub async fn validate_ssh_key(&self, runner: &dyn Runner) -> bool {
        let expanded = expand_tilde(&self.ssh_key_path.to_string_lossy());
        info!(configured = %self.ssh_key_path.display(), expanded = %expanded.display(), "SSH key path");

        let metadata = match std::fs::metadata(&expanded) {
            Ok(m) => m,
            Err(_) => {
                tracing::error!(path = %expanded.display(), "SSH key file does not exist");
                return false;
            }
        };

        if !metadata.is_file() {
            tracing::error!(path = %expanded.display(), "SSH key path is not a regular file");
            return false;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                warn!(path = %expanded.display(), mode = format!("{:o}", mode & 0o777), "SSH key file has loose permissions — SSH may refuse it");
            } else {
                info!(mode = format!("{:o}", mode & 0o777), "SSH key file permissions");
            }
        }

        let outcome = runner
            .run(
                "ssh-keygen",
                &[
                    "-l".to_string(),
                    "-f".to_string(),
                    expanded.to_string_lossy().into_owned(),
                ],
                Duration::from_secs(5),
            )
            .await;

        if outcome.timed_out {
            warn!("ssh-keygen timed out reading key");
        } else if outcome.success() {
            info!(fingerprint = %outcome.stdout.trim(), "SSH key fingerprint");
        } else {
            warn!(stderr = %outcome.stderr.trim(), "ssh-keygen could not read key");
        }

        true
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + ToString,
{
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            kind: std::any::type_name::<T>(),
            value,
        }),
    }
}

fn parse_bool_env(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    } else if path == "~" {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner::RunOutcome;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedRunner {
        outcome: Mutex<Option<RunOutcome>>,
    }

    #[async_trait::async_trait]
    impl Runner for ScriptedRunner {
        async fn run(&self, _program: &str, _args: &[String], _timeout: Duration) -> RunOutcome {
            self.outcome.lock().unwrap().clone().unwrap_or_default()
        }
    }

    #[test]
    fn control_path_substitutes_template_tokens() {
        let mut settings = bare_settings();
        settings.ssh_control_path_template = "/tmp/ssh-control/nlnog-%r@%h:%p".to_string();
        settings.ssh_username = "rise".to_string();

        let path = settings.ssh_control_path("ams01.ring.nlnog.net");
        assert_eq!(
            path,
            PathBuf::from("/tmp/ssh-control/nlnog-rise@ams01.ring.nlnog.net:22")
        );
    }

    #[test]
    fn control_dir_and_prefix_derive_from_template() {
        let mut settings = bare_settings();
        settings.ssh_control_path_template = "/tmp/ssh-control/nlnog-%r@%h:%p".to_string();

        assert_eq!(settings.ssh_control_dir(), PathBuf::from("/tmp/ssh-control"));
        assert_eq!(settings.ssh_control_prefix(), "nlnog-");
    }

    #[test]
    fn tilde_expansion_uses_home() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            expand_tilde("~/ssh/nlnog"),
            PathBuf::from("/home/tester/ssh/nlnog")
        );
        assert_eq!(expand_tilde("/already/absolute"), PathBuf::from("/already/absolute"));
    }

    #[tokio::test]
    async fn missing_key_file_fails_validation() {
        let mut settings = bare_settings();
        settings.ssh_key_path = PathBuf::from("/nonexistent/path/to/key");
        let runner = ScriptedRunner::default();
        assert!(!settings.validate_ssh_key(&runner).await);
    }

    #[tokio::test]
    async fn existing_regular_file_passes_validation() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("id_nlnog");
        std::fs::write(&key_path, b"not a real key").unwrap();

        let mut settings = bare_settings();
        settings.ssh_key_path = key_path;
        let runner = ScriptedRunner::default();
        assert!(settings.validate_ssh_key(&runner).await);
    }

    fn bare_settings() -> Settings {
        Settings {
            nlnog_api: String::new(),
            nlnog_participants_api: String::new(),
            nlnog_api_timeout: Duration::from_secs(10),
            ssh_username: "rise".to_string(),
            ssh_connect_timeout: Duration::from_secs(5),
            ssh_subprocess_timeout: Duration::from_secs(15),
            ssh_key_path: PathBuf::new(),
            ssh_control_path_template: String::new(),
            ping_count: 10,
            ping_timeout: 5,
            startup_max_workers: 50,
            threads: 100,
            cache_refresh_interval: Duration::from_secs(300),
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "INFO".to_string(),
            debug: false,
        }
    }
}
