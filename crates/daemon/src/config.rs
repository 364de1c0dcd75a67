//! Environment-driven configuration for the daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use keywheel_core::schedule::{DEFAULT_ROTATION_HOUR, DEFAULT_ROTATION_MINUTE};
use keywheel_core::secrets;

/// Default rotation executable path.
const DEFAULT_COMMAND: &str = "/usr/local/bin/rotate-keys";

/// Default application root the secrets file lives under.
const DEFAULT_APP_ROOT: &str = "/var/www/app";

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

/// HTTP server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default   |
    /// |-------------------------|-----------|
    /// | `HOST`                  | `0.0.0.0` |
    /// | `PORT`                  | `3000`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`      |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            request_timeout_secs,
            shutdown_timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Rotation behavior
// ---------------------------------------------------------------------------

/// Rotation behavior configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Kill switch: when set, every engine entry point is a no-op.
    pub disabled: bool,
    /// How many snapshots survive the post-success cleanup.
    pub retention: i64,
    /// Path to the rotation executable.
    pub command: PathBuf,
    /// Fixed arguments passed on every invocation.
    pub command_args: Vec<String>,
    /// Wall-clock bound on one command run.
    pub command_timeout: Duration,
    /// Candidate secrets-file locations, tried in order.
    pub secrets_candidates: Vec<PathBuf>,
    /// Whether a failed rotation sends an alert.
    pub notify_on_failure: bool,
    /// Local hour of the daily scheduled run.
    pub rotation_hour: u32,
    /// Local minute of the daily scheduled run.
    pub rotation_minute: u32,
}

impl RotationConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                      |
    /// |-------------------------|------------------------------|
    /// | `ROTATION_DISABLED`     | unset (rotations enabled)    |
    /// | `ROTATION_RETENTION`    | `5`                          |
    /// | `ROTATION_COMMAND`      | `/usr/local/bin/rotate-keys` |
    /// | `ROTATION_TIMEOUT_SECS` | `120`                        |
    /// | `APP_ROOT`              | `/var/www/app`               |
    /// | `SECRETS_FILE`          | unset (derived from root)    |
    /// | `ROTATION_NOTIFY`       | `true`                       |
    /// | `ROTATION_HOUR`         | `3`                          |
    /// | `ROTATION_MINUTE`       | `0`                          |
    ///
    /// `SECRETS_FILE`, when set, names the single secrets location to read.
    /// Otherwise the candidates are `<APP_ROOT>/secrets.conf` and
    /// `<APP_ROOT>/../secrets.conf`, tried in that order.
    pub fn from_env() -> Self {
        let disabled = flag_set("ROTATION_DISABLED");

        let retention: i64 = std::env::var("ROTATION_RETENTION")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("ROTATION_RETENTION must be a valid integer");

        let command = PathBuf::from(
            std::env::var("ROTATION_COMMAND").unwrap_or_else(|_| DEFAULT_COMMAND.into()),
        );

        let timeout_secs: u64 = std::env::var("ROTATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("ROTATION_TIMEOUT_SECS must be a valid u64");

        let app_root = std::env::var("APP_ROOT").unwrap_or_else(|_| DEFAULT_APP_ROOT.into());

        let secrets_candidates = match std::env::var("SECRETS_FILE") {
            Ok(path) => vec![PathBuf::from(path)],
            Err(_) => secrets::candidate_paths(Path::new(&app_root)),
        };

        let command_args = vec!["shuffle".to_string(), "--path".to_string(), app_root];

        let notify_on_failure = std::env::var("ROTATION_NOTIFY")
            .map(|v| {
                let v = v.trim().to_ascii_lowercase();
                v != "0" && v != "false"
            })
            .unwrap_or(true);

        let rotation_hour: u32 = std::env::var("ROTATION_HOUR")
            .unwrap_or_else(|_| DEFAULT_ROTATION_HOUR.to_string())
            .parse()
            .expect("ROTATION_HOUR must be a valid hour");

        let rotation_minute: u32 = std::env::var("ROTATION_MINUTE")
            .unwrap_or_else(|_| DEFAULT_ROTATION_MINUTE.to_string())
            .parse()
            .expect("ROTATION_MINUTE must be a valid minute");

        Self {
            disabled,
            retention,
            command,
            command_args,
            command_timeout: Duration::from_secs(timeout_secs),
            secrets_candidates,
            notify_on_failure,
            rotation_hour,
            rotation_minute,
        }
    }
}

/// Whether a boolean env flag is set (`1` or `true`, case-insensitive).
fn flag_set(name: &str) -> bool {
    std::env::var(name)
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            v == "1" || v == "true"
        })
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// One combined test because env vars are process-global: parallel tests
    /// mutating the same variables would race.
    #[test]
    fn from_env_applies_defaults_and_overrides() {
        let vars = [
            "HOST",
            "PORT",
            "REQUEST_TIMEOUT_SECS",
            "SHUTDOWN_TIMEOUT_SECS",
            "ROTATION_DISABLED",
            "ROTATION_RETENTION",
            "ROTATION_COMMAND",
            "ROTATION_TIMEOUT_SECS",
            "APP_ROOT",
            "SECRETS_FILE",
            "ROTATION_NOTIFY",
            "ROTATION_HOUR",
            "ROTATION_MINUTE",
        ];
        for var in vars {
            std::env::remove_var(var);
        }

        // Defaults.
        let server = ServerConfig::from_env();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 3000);
        assert_eq!(server.request_timeout_secs, 30);

        let rotation = RotationConfig::from_env();
        assert!(!rotation.disabled);
        assert_eq!(rotation.retention, 5);
        assert_eq!(rotation.command, PathBuf::from(DEFAULT_COMMAND));
        assert_eq!(rotation.command_timeout, Duration::from_secs(120));
        assert_eq!(
            rotation.secrets_candidates,
            vec![
                PathBuf::from("/var/www/app/secrets.conf"),
                PathBuf::from("/var/www/app/../secrets.conf"),
            ]
        );
        assert_eq!(
            rotation.command_args,
            vec!["shuffle", "--path", "/var/www/app"]
        );
        assert!(rotation.notify_on_failure);
        assert_eq!(rotation.rotation_hour, 3);
        assert_eq!(rotation.rotation_minute, 0);

        // Overrides.
        std::env::set_var("ROTATION_DISABLED", "TRUE");
        std::env::set_var("ROTATION_RETENTION", "9");
        std::env::set_var("ROTATION_COMMAND", "/opt/bin/rotate");
        std::env::set_var("ROTATION_TIMEOUT_SECS", "15");
        std::env::set_var("SECRETS_FILE", "/etc/keywheel/secrets.conf");
        std::env::set_var("ROTATION_NOTIFY", "false");
        std::env::set_var("ROTATION_HOUR", "23");
        std::env::set_var("ROTATION_MINUTE", "45");

        let rotation = RotationConfig::from_env();
        assert!(rotation.disabled);
        assert_eq!(rotation.retention, 9);
        assert_eq!(rotation.command, PathBuf::from("/opt/bin/rotate"));
        assert_eq!(rotation.command_timeout, Duration::from_secs(15));
        assert_eq!(
            rotation.secrets_candidates,
            vec![PathBuf::from("/etc/keywheel/secrets.conf")]
        );
        assert!(!rotation.notify_on_failure);
        assert_eq!(rotation.rotation_hour, 23);
        assert_eq!(rotation.rotation_minute, 45);

        for var in vars {
            std::env::remove_var(var);
        }
    }
}
