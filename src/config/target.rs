//! Harness configuration types
//!
//! Defines the structure of the agriprobe configuration file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::checks::{CheckContext, CheckOptions};
use crate::client::{DEFAULT_REQUEST_TIMEOUT, DeviceClient};
use crate::monitor::{DEFAULT_MONITOR_DURATION, DEFAULT_SAMPLE_INTERVAL, MonitorOptions};

/// Address of a device running as its own access point
pub const DEFAULT_BASE_URL: &str = "http://192.168.4.1";

/// Errors that can occur during configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create client: {0}")]
    Client(#[from] crate::client::DeviceError),
}

/// The device under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Device identifier for logs
    #[serde(default = "default_target_name")]
    pub name: String,

    /// HTTP base URL (e.g., "http://192.168.4.1")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_target_name() -> String {
    "agrishield".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            name: default_target_name(),
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl TargetConfig {
    /// Build the device client for this target
    pub fn to_client(&self) -> Result<DeviceClient, ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "target.request_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(DeviceClient::with_timeout(&self.base_url, self.request_timeout)?.with_name(&self.name))
    }

    /// Create a CheckContext for this target
    pub fn to_check_context(&self) -> Result<CheckContext, ConfigError> {
        Ok(CheckContext::new(self.to_client()?))
    }
}

/// Continuous monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Total time to keep sampling
    #[serde(default = "default_monitor_duration", with = "humantime_serde")]
    pub duration: Duration,

    /// Wait between samples
    #[serde(default = "default_sample_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_monitor_duration() -> Duration {
    DEFAULT_MONITOR_DURATION
}

fn default_sample_interval() -> Duration {
    DEFAULT_SAMPLE_INTERVAL
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            duration: default_monitor_duration(),
            interval: default_sample_interval(),
        }
    }
}

impl MonitorConfig {
    pub fn to_options(&self) -> Result<MonitorOptions, ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "monitor.interval must be greater than zero".to_string(),
            ));
        }
        Ok(MonitorOptions {
            duration: self.duration,
            interval: self.interval,
        })
    }
}

/// Configuration for a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Whether this check is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Timeout for this check
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,

    /// Additional check-specific options
    #[serde(default, flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl CheckConfig {
    /// Convert to CheckOptions, filling gaps from the check's defaults
    pub fn to_check_options(&self, defaults: &CheckOptions) -> CheckOptions {
        let mut extra = defaults.extra.clone();
        extra.extend(self.extra.clone());
        CheckOptions {
            timeout: self.timeout.or(defaults.timeout),
            extra,
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: None,
            extra: HashMap::new(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Device under test
    #[serde(default)]
    pub target: TargetConfig,

    /// Continuous monitor settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Check configurations (check_name -> config)
    #[serde(default)]
    pub checks: HashMap<String, CheckConfig>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Get configuration for a specific check
    pub fn check_config(&self, name: &str) -> Option<&CheckConfig> {
        self.checks.get(name)
    }

    /// Check if a specific check is enabled
    pub fn is_check_enabled(&self, name: &str) -> bool {
        self.checks.get(name).map(|c| c.enabled).unwrap_or(true) // Default to enabled if not specified
    }

    /// Options for a check: config file values over the check's defaults
    pub fn check_options(&self, name: &str, defaults: CheckOptions) -> CheckOptions {
        match self.check_config(name) {
            Some(c) => c.to_check_options(&defaults),
            None => defaults,
        }
    }

    /// Check names that are configured but not known to the registry
    pub fn unknown_checks(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .checks
            .keys()
            .map(String::as_str)
            .filter(|name| !crate::checks::CHECKS.contains_key(*name))
            .collect();
        names.sort_unstable();
        names
    }

    /// Generate a default configuration
    pub fn default_config() -> Self {
        let mut roundtrip = CheckConfig {
            timeout: Some(Duration::from_secs(60)),
            ..CheckConfig::default()
        };
        roundtrip
            .extra
            .insert("settle_delay_ms".to_string(), serde_json::json!(1000));

        Config {
            target: TargetConfig::default(),
            monitor: MonitorConfig::default(),
            checks: {
                let mut checks = HashMap::new();
                for name in ["health", "ping", "status", "datalog", "config"] {
                    checks.insert(name.to_string(), CheckConfig::default());
                }
                checks.insert("config-roundtrip".to_string(), roundtrip);
                checks
            },
        }
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r"
target:
  name: north-field
  base_url: http://10.0.0.42
  request_timeout: 3s

monitor:
  duration: 1m
  interval: 5s

checks:
  datalog:
    enabled: false
  config-roundtrip:
    timeout: 2m
    settle_delay_ms: 250
    sentinel_profile: HARNESS_PROBE
";

    #[test]
    fn test_parse_config() {
        let config = Config::from_yaml(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.target.name, "north-field");
        assert_eq!(config.target.base_url, "http://10.0.0.42");
        assert_eq!(config.target.request_timeout, Duration::from_secs(3));
        assert_eq!(config.monitor.duration, Duration::from_secs(60));
        assert_eq!(config.monitor.interval, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.target.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.target.request_timeout, Duration::from_secs(5));
        assert_eq!(config.monitor.duration, Duration::from_secs(30));
        assert_eq!(config.monitor.interval, Duration::from_secs(2));
        assert!(config.checks.is_empty());
    }

    #[test]
    fn test_check_enabled() {
        let config = Config::from_yaml(SAMPLE_CONFIG).unwrap();
        assert!(!config.is_check_enabled("datalog"));
        assert!(config.is_check_enabled("config-roundtrip"));
        assert!(config.is_check_enabled("health")); // Default to enabled
    }

    #[test]
    fn test_check_options_merge() {
        let config = Config::from_yaml(SAMPLE_CONFIG).unwrap();
        let defaults = CheckOptions {
            timeout: Some(Duration::from_secs(60)),
            extra: HashMap::new(),
        }
        .with_extra("settle_delay_ms", 1000u64);

        let opts = config.check_options("config-roundtrip", defaults.clone());
        assert_eq!(opts.timeout, Some(Duration::from_secs(120)));
        assert_eq!(opts.get_extra::<u64>("settle_delay_ms"), Some(250));
        assert_eq!(
            opts.get_extra::<String>("sentinel_profile").as_deref(),
            Some("HARNESS_PROBE")
        );

        let untouched = config.check_options("health", defaults);
        assert_eq!(untouched.get_extra::<u64>("settle_delay_ms"), Some(1000));
    }

    #[test]
    fn test_unknown_checks() {
        let config = Config::from_yaml("checks:\n  pingpong: {}\n  ping: {}\n").unwrap();
        assert_eq!(config.unknown_checks(), vec!["pingpong"]);
    }

    #[test]
    fn test_target_to_client() {
        let config = Config::from_yaml(SAMPLE_CONFIG).unwrap();
        let client = config.target.to_client().unwrap();
        assert_eq!(client.name(), Some("north-field"));
        assert_eq!(client.base_url().as_str(), "http://10.0.0.42/");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config::from_yaml("target:\n  request_timeout: 0s\n").unwrap();
        assert!(matches!(
            config.target.to_client(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = Config::from_yaml("monitor:\n  interval: 0s\n").unwrap();
        assert!(config.monitor.to_options().is_err());
    }

    #[test]
    fn test_default_config_roundtrips_through_yaml() {
        let config = Config::default_config();
        let yaml = config.to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.checks.len(), 6);
        assert!(parsed.unknown_checks().is_empty());
        assert_eq!(
            parsed
                .check_config("config-roundtrip")
                .and_then(|c| c.extra.get("settle_delay_ms"))
                .and_then(serde_json::Value::as_u64),
            Some(1000)
        );
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, SAMPLE_CONFIG.as_bytes()).unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.target.name, "north-field");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/agriprobe.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
