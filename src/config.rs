//! Configuration module for httpcheck.
//!
//! Loads the target list and optional InfluxDB settings from a YAML file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::probe::{Target, TlsOptions};

/// Default timeout for metric writes.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}

/// One `address` entry of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    #[serde(default)]
    pub method: String,
    /// Duration string such as `5s` or `1500ms`.
    #[serde(default)]
    pub response_timeout: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub follow_redirects: bool,
    #[serde(default)]
    pub response_string_match: Option<String>,
    #[serde(default)]
    pub ssl_ca: Option<PathBuf>,
    #[serde(default)]
    pub ssl_cert: Option<PathBuf>,
    #[serde(default)]
    pub ssl_key: Option<PathBuf>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl TargetConfig {
    /// Build a probe target. Defaults are left to target resolution.
    pub fn to_target(&self) -> Result<Target, ConfigError> {
        let timeout = parse_duration(&self.response_timeout).map_err(|e| {
            ConfigError::Validation(format!(
                "invalid response_timeout {:?} for {}: {}",
                self.response_timeout, self.url, e
            ))
        })?;

        let mut target = Target::new(&self.url)
            .with_method(&self.method)
            .with_timeout(timeout)
            .with_follow_redirects(self.follow_redirects)
            .with_tls(TlsOptions {
                ssl_ca: self.ssl_ca.clone(),
                ssl_cert: self.ssl_cert.clone(),
                ssl_key: self.ssl_key.clone(),
                insecure_skip_verify: self.insecure_skip_verify,
            });
        target.body = self.body.clone();
        target.headers = self.headers.clone();
        if let Some(pattern) = &self.response_string_match {
            target = target.with_string_match(pattern);
        }

        Ok(target)
    }
}

fn default_sink_timeout() -> Duration {
    DEFAULT_SINK_TIMEOUT
}

/// InfluxDB v1 write settings.
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
    /// Base URL, e.g. `http://127.0.0.1:8086`.
    pub url: String,
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(
        default = "default_sink_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub timeout: Duration,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Targets to probe, in order.
    #[serde(default)]
    pub address: Vec<TargetConfig>,
    /// When present, metrics are written to InfluxDB instead of stdout.
    #[serde(default)]
    pub influxdb: Option<InfluxConfig>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for target in &self.address {
            target.to_target()?;
        }
        if let Some(influx) = &self.influxdb {
            if influx.url.trim().is_empty() {
                return Err(ConfigError::Validation("influxdb.url is empty".to_string()));
            }
            if influx.database.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "influxdb.database is empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Build probe targets in configuration order.
    pub fn targets(&self) -> Result<Vec<Target>, ConfigError> {
        self.address.iter().map(TargetConfig::to_target).collect()
    }
}

/// Parse a duration string; empty means zero.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}
