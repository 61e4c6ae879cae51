//! Configuration loader and validator for the dispatch engine.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
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
    pub app: App,
    pub backend: Backend,
    pub automation: Automation,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Fixed UTC offset of the deployment, applied to the send-hour window.
    pub utc_offset_hours: i32,
}

/// Backend REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backend {
    pub base_url: String,
    pub token: String,
}

/// Local automation bridge driving the chat surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Automation {
    pub bridge_url: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
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
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if !(-12..=14).contains(&cfg.app.utc_offset_hours) {
        return Err(ConfigError::Invalid(
            "app.utc_offset_hours must be between -12 and 14",
        ));
    }

    if cfg.backend.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.base_url must be non-empty"));
    }
    if cfg.backend.token.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.token must be non-empty"));
    }

    if cfg.automation.bridge_url.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "automation.bridge_url must be non-empty",
        ));
    }

    Ok(())
}

/// Example YAML used in docs and tests.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  utc_offset_hours: -3

backend:
  base_url: "https://panel.example.com/api"
  token: "YOUR_API_TOKEN"

automation:
  bridge_url: "http://127.0.0.1:4821"
"#
}
