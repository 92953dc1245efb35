use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

use crate::error::ConfigError;

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

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
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
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Remote API endpoints
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Geolocation settings
    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

/// Unit system requested from the forecast API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Celsius,
    Fahrenheit,
}

impl Units {
    /// Single-letter code used in forecast queries.
    pub fn code(self) -> &'static str {
        match self {
            Units::Celsius => "c",
            Units::Fahrenheit => "f",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(Units::Celsius),
            "f" | "fahrenheit" => Ok(Units::Fahrenheit),
            other => Err(format!("unknown unit system: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Base URL of the structured query API
    #[serde(default = "default_query_url")]
    pub query_url: String,

    /// Path of the query endpoint, appended to `query_url`
    #[serde(default = "default_query_path")]
    pub query_path: String,

    /// Base URL of the IP geolocation service
    #[serde(default = "default_geo_ip_url")]
    pub geo_ip_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_query_url() -> String {
    "https://query.yahooapis.com".to_string()
}

fn default_query_path() -> String {
    "/v1/public/yql".to_string()
}

fn default_geo_ip_url() -> String {
    "https://freegeoip.net".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            query_url: default_query_url(),
            query_path: default_query_path(),
            geo_ip_url: default_geo_ip_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EndpointsConfig {
    /// Full URL of the query endpoint.
    pub fn query_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.query_url.trim_end_matches('/'),
            self.query_path
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Place used when the user gives none
    #[serde(default = "default_location")]
    pub default_location: String,

    /// Unit system preference
    #[serde(default)]
    pub units: Units,
}

fn default_location() -> String {
    "Los Angeles, United States".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            default_location: default_location(),
            units: Units::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// How long a provider may take to locate the user, in milliseconds
    #[serde(default = "default_geolocation_timeout_ms")]
    pub timeout_ms: u64,

    /// Try the device locator before the IP locator
    #[serde(default = "default_prefer_device")]
    pub prefer_device: bool,

    /// Desktop id reported to the system location service
    #[serde(default = "default_desktop_id")]
    pub desktop_id: String,
}

fn default_geolocation_timeout_ms() -> u64 {
    5000
}

fn default_prefer_device() -> bool {
    true
}

fn default_desktop_id() -> String {
    "skycast".to_string()
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_geolocation_timeout_ms(),
            prefer_device: default_prefer_device(),
            desktop_id: default_desktop_id(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycast")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            endpoints: EndpointsConfig::default(),
            weather: WeatherConfig::default(),
            geolocation: GeolocationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {e}", config_path.display())))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load_validated_from(&Self::config_path()?)
    }

    /// [`load_validated`](Self::load_validated) for an explicit path
    pub fn load_validated_from(config_path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(config_path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.endpoints.query_url, "endpoints.query_url", &mut result);
        self.validate_url(&self.endpoints.geo_ip_url, "endpoints.geo_ip_url", &mut result);

        if !self.endpoints.query_path.starts_with('/') {
            result.add_error("endpoints.query_path", "Query path must start with '/'");
        }

        if self.endpoints.request_timeout_secs == 0 {
            result.add_error(
                "endpoints.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.endpoints.request_timeout_secs > 300 {
            result.add_warning(
                "endpoints.request_timeout_secs",
                "Request timeout is unusually long (>300s)",
            );
        }

        if self.weather.default_location.trim().is_empty() {
            result.add_error("weather.default_location", "Default location cannot be empty");
        }

        if self.geolocation.timeout_ms == 0 {
            result.add_error(
                "geolocation.timeout_ms",
                "Geolocation timeout must be greater than 0",
            );
        } else if self.geolocation.timeout_ms > 60_000 {
            result.add_warning(
                "geolocation.timeout_ms",
                "Geolocation timeout is more than a minute",
            );
        }

        if self.geolocation.prefer_device && self.geolocation.desktop_id.trim().is_empty() {
            result.add_warning(
                "geolocation.desktop_id",
                "Empty desktop id - the system location service may refuse access",
            );
        }

        result
    }

    /// Validate a URL field
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

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
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

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

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
    fn test_default_endpoints() {
        let config = Config::default();
        assert_eq!(
            config.endpoints.query_endpoint(),
            "https://query.yahooapis.com/v1/public/yql"
        );
        assert_eq!(config.endpoints.geo_ip_url, "https://freegeoip.net");
        assert_eq!(config.weather.default_location, "Los Angeles, United States");
        assert_eq!(config.geolocation.timeout_ms, 5000);
    }

    #[test]
    fn test_query_endpoint_trims_trailing_slash() {
        let endpoints = EndpointsConfig {
            query_url: "http://localhost:9000/".to_string(),
            ..EndpointsConfig::default()
        };
        assert_eq!(endpoints.query_endpoint(), "http://localhost:9000/v1/public/yql");
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.endpoints.query_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "endpoints.query_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.endpoints.geo_ip_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_geolocation_timeout() {
        let mut config = Config::default();
        config.geolocation.timeout_ms = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "geolocation.timeout_ms"));
    }

    #[test]
    fn test_long_request_timeout_is_warning() {
        let mut config = Config::default();
        config.endpoints.request_timeout_secs = 600;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "endpoints.request_timeout_secs"));
    }

    #[test]
    fn test_units_parsing() {
        assert_eq!("f".parse::<Units>(), Ok(Units::Fahrenheit));
        assert_eq!("Celsius".parse::<Units>(), Ok(Units::Celsius));
        assert!("kelvin".parse::<Units>().is_err());
        assert_eq!(Units::default().code(), "c");
    }

    #[test]
    fn test_load_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.geolocation.timeout_ms, 5000);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/skycast\"\n\n[weather]\nunits = \"fahrenheit\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.units, Units::Fahrenheit);
        assert_eq!(config.weather.default_location, "Los Angeles, United States");
        assert_eq!(config.endpoints.query_path, "/v1/public/yql");
    }

    #[test]
    fn test_missing_config_dir_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather]\ndefault_location = \"Paris, France\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.weather.default_location, "Paris, France");
        assert_eq!(config.config_dir, default_config_dir());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\nunits = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_validated_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/skycast\"\n\n[endpoints]\nquery_url = \"not a url\"\n",
        )
        .unwrap();

        let err = Config::load_validated_from(&path).unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Invalid(summary)) => assert!(summary.contains("endpoints.query_url")),
            other => panic!("unexpected error: {other:?}"),
        }
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
