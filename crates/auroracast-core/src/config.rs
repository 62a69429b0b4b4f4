use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Smallest periodic interval the host platforms accept.
pub const MIN_SYNC_INTERVAL_MINUTES: u32 = 15;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Join all errors into one line for logging
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.toml and the shared store
    pub config_dir: PathBuf,

    /// Aggregation backend
    pub backend: BackendConfig,

    /// Background task registration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Notification rules
    #[serde(default)]
    pub alerts: AlertConfig,

    /// Widget payload settings
    #[serde(default)]
    pub widget: WidgetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the weather/aurora aggregation API
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of forecast days requested per sync
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_forecast_days() -> u32 {
    3
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: default_timeout_secs(),
            forecast_days: default_forecast_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minimum interval between background invocations (>= 15)
    pub minimum_interval_minutes: u32,
    pub requires_network: bool,
    pub survives_reboot: bool,
    pub allow_headless: bool,
    /// Wall-clock budget for a single invocation
    pub time_budget_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            minimum_interval_minutes: MIN_SYNC_INTERVAL_MINUTES,
            requires_network: true,
            survives_reboot: true,
            allow_headless: true,
            time_budget_secs: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// First local hour (inclusive) a daily brief may be sent
    pub brief_window_start_hour: u32,
    /// Last local hour (inclusive) a daily brief may be sent
    pub brief_window_end_hour: u32,
    /// Maximum characters of brief text shown in the notification
    pub brief_max_chars: usize,
    /// Aurora alert fires when current Kp is strictly above this
    pub aurora_kp_threshold: f64,
    /// Aurora alert fires when visibility probability is strictly above this
    pub aurora_probability_threshold: u8,
    pub aurora_cooldown_hours: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            brief_window_start_hour: 7,
            brief_window_end_hour: 10,
            brief_max_chars: 120,
            aurora_kp_threshold: 4.0,
            aurora_probability_threshold: 20,
            aurora_cooldown_hours: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Payload age after which the widget shows a "last updated" hint
    pub stale_after_minutes: u32,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            stale_after_minutes: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("auroracast");

        Self {
            config_dir,
            backend: BackendConfig::default(),
            sync: SyncConfig::default(),
            alerts: AlertConfig::default(),
            widget: WidgetConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load configuration and reject it if validation finds errors
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.backend.base_url, "backend.base_url", &mut result);

        if self.backend.timeout_secs == 0 {
            result.add_error("backend.timeout_secs", "Timeout must be greater than 0");
        } else if self.backend.timeout_secs >= self.sync.time_budget_secs {
            result.add_warning(
                "backend.timeout_secs",
                "Request timeout is not shorter than the task budget; a slow call can starve the widget publish",
            );
        }

        if self.backend.forecast_days == 0 {
            result.add_error("backend.forecast_days", "At least one forecast day is required");
        }

        if self.sync.minimum_interval_minutes < MIN_SYNC_INTERVAL_MINUTES {
            result.add_warning(
                "sync.minimum_interval_minutes",
                format!(
                    "Interval below {} minutes will be raised to the platform minimum",
                    MIN_SYNC_INTERVAL_MINUTES
                ),
            );
        }

        if self.sync.time_budget_secs == 0 {
            result.add_error("sync.time_budget_secs", "Task budget must be greater than 0");
        }

        let alerts = &self.alerts;
        if alerts.brief_window_start_hour > 23 || alerts.brief_window_end_hour > 23 {
            result.add_error("alerts.brief_window", "Hours must be in 0..=23");
        } else if alerts.brief_window_start_hour > alerts.brief_window_end_hour {
            result.add_error("alerts.brief_window", "Window start is after window end");
        }

        if alerts.brief_max_chars == 0 {
            result.add_error("alerts.brief_max_chars", "Brief length must be greater than 0");
        }

        if alerts.aurora_probability_threshold > 100 {
            result.add_error(
                "alerts.aurora_probability_threshold",
                "Probability threshold must be a percentage",
            );
        }

        if alerts.aurora_cooldown_hours == 0 {
            result.add_warning(
                "alerts.aurora_cooldown_hours",
                "Aurora cooldown disabled; an alert may fire on every sync",
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Path of the SQLite file shared with the widget renderer
    pub fn store_path(&self) -> PathBuf {
        self.config_dir.join("auroracast.db")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("auroracast");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_invalid_backend_url() {
        let mut config = Config::default();
        config.backend.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "backend.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.backend.base_url = "ftp://localhost:8000".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_short_interval_is_warning() {
        let mut config = Config::default();
        config.sync.minimum_interval_minutes = 5;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "sync.minimum_interval_minutes"));
    }

    #[test]
    fn test_inverted_brief_window() {
        let mut config = Config::default();
        config.alerts.brief_window_start_hour = 11;
        config.alerts.brief_window_end_hour = 7;
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_timeout_longer_than_budget_warns() {
        let mut config = Config::default();
        config.backend.timeout_secs = 30;
        config.sync.time_budget_secs = 25;
        let result = config.validate();
        assert!(result.warnings.iter().any(|w| w.field == "backend.timeout_secs"));
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_dir, dir.path());
        assert_eq!(config.store_path(), dir.path().join("auroracast.db"));
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
config_dir = "/tmp/auroracast"

[backend]
base_url = "https://api.example.com"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.sync.minimum_interval_minutes, 15);
        assert_eq!(config.alerts.aurora_cooldown_hours, 6);
        assert_eq!(config.widget.stale_after_minutes, 60);
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
