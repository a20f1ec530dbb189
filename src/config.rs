//! Configuration loader and validator for the care dashboard client.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub server: Server,
    pub dashboard: Dashboard,
    pub notifications: Notifications,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub base_url: String,
    /// Login email; when empty the client assumes an already-authorized backend.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub request_timeout_secs: u64,
}

/// List and polling settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dashboard {
    pub page_size: u32,
    pub poll_interval_secs: u64,
    pub fanout_timeout_secs: u64,
}

/// Notification queue settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notifications {
    pub max_visible: usize,
    pub routine_dismiss_ms: u64,
    pub new_alert_dismiss_ms: u64,
    pub sound: bool,
}

impl Config {
    pub fn has_credentials(&self) -> bool {
        !self.server.email.trim().is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard.poll_interval_secs)
    }

    pub fn fanout_timeout(&self) -> Duration {
        Duration::from_secs(self.dashboard.fanout_timeout_secs)
    }
}

impl Notifications {
    pub fn routine_dismiss(&self) -> Duration {
        Duration::from_millis(self.routine_dismiss_ms)
    }

    pub fn new_alert_dismiss(&self) -> Duration {
        Duration::from_millis(self.new_alert_dismiss_ms)
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            max_visible: 5,
            routine_dismiss_ms: 3_000,
            new_alert_dismiss_ms: 30_000,
            sound: true,
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let base = cfg.server.base_url.trim();
    if base.is_empty() {
        return Err(ConfigError::Invalid("server.base_url must be non-empty"));
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::Invalid("server.base_url must be an http(s) URL"));
    }
    if cfg.has_credentials() && cfg.server.password.is_empty() {
        return Err(ConfigError::Invalid(
            "server.password must be set when server.email is set",
        ));
    }
    if cfg.server.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("server.request_timeout_secs must be > 0"));
    }

    if cfg.dashboard.page_size == 0 {
        return Err(ConfigError::Invalid("dashboard.page_size must be > 0"));
    }
    if cfg.dashboard.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid("dashboard.poll_interval_secs must be > 0"));
    }
    if cfg.dashboard.fanout_timeout_secs == 0 {
        return Err(ConfigError::Invalid("dashboard.fanout_timeout_secs must be > 0"));
    }

    let n = &cfg.notifications;
    if n.max_visible == 0 {
        return Err(ConfigError::Invalid("notifications.max_visible must be > 0"));
    }
    if n.routine_dismiss_ms == 0 {
        return Err(ConfigError::Invalid("notifications.routine_dismiss_ms must be > 0"));
    }
    if n.new_alert_dismiss_ms == 0 {
        return Err(ConfigError::Invalid("notifications.new_alert_dismiss_ms must be > 0"));
    }

    Ok(())
}

/// Returns the example YAML shipped with the client.
pub fn example() -> &'static str {
    r#"server:
  base_url: "http://localhost:5000/"
  email: "coordinator@example.org"
  password: "CHANGE_ME"
  request_timeout_secs: 15

dashboard:
  page_size: 6
  poll_interval_secs: 60
  fanout_timeout_secs: 10

notifications:
  max_visible: 5
  routine_dismiss_ms: 3000
  new_alert_dismiss_ms: 30000
  sound: true
"#
}
