use serde::{Deserialize, Serialize};
use std::path::PathBuf;
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
        if self.errors.is_empty() {
            return String::new();
        }
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
    pub config_dir: PathBuf,

    /// Upstream forecast settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Location settings
    #[serde(default)]
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// WFS endpoint serving the forecast stored queries
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// Reverse-geocoding endpoint for place labels
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,

    /// Forecast time alignment, in minutes
    #[serde(default = "default_granularity_minutes")]
    pub granularity_minutes: u32,

    /// Altitude levels to request, in meters above ground (0 = surface)
    #[serde(default = "default_levels")]
    pub levels: Vec<u32>,

    /// Upper bound for the random refresh jitter, in seconds
    #[serde(default = "default_jitter_secs")]
    pub jitter_secs: u64,
}

fn default_endpoint_url() -> String {
    "https://opendata.fmi.fi/wfs".to_string()
}

fn default_geocode_url() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

fn default_granularity_minutes() -> u32 {
    5
}

fn default_levels() -> Vec<u32> {
    vec![4000, 3500, 3000, 2500, 2000, 1500, 1000, 600, 300, 0]
}

fn default_jitter_secs() -> u64 {
    60
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            geocode_url: default_geocode_url(),
            granularity_minutes: default_granularity_minutes(),
            levels: default_levels(),
            jitter_secs: default_jitter_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Fixed latitude, decimal degrees
    pub latitude: Option<f64>,

    /// Fixed longitude, decimal degrees
    pub longitude: Option<f64>,

    /// Accept cached positions up to this age, in seconds
    #[serde(default = "default_maximum_age_secs")]
    pub maximum_age_secs: u64,

    /// Request a high-accuracy position fix
    #[serde(default)]
    pub high_accuracy: bool,
}

fn default_maximum_age_secs() -> u64 {
    60
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            maximum_age_secs: default_maximum_age_secs(),
            high_accuracy: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aloft");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            location: LocationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.weather.endpoint_url,
            "weather.endpoint_url",
            &mut result,
        );
        self.validate_url(&self.weather.geocode_url, "weather.geocode_url", &mut result);

        if self.weather.granularity_minutes == 0 {
            result.add_error(
                "weather.granularity_minutes",
                "Granularity must be greater than 0",
            );
        } else if self.weather.granularity_minutes > 60 {
            result.add_warning(
                "weather.granularity_minutes",
                "Granularity above one hour produces stale forecasts",
            );
        }

        if self.weather.levels.is_empty() {
            result.add_error("weather.levels", "At least one altitude level is required");
        }

        if self.weather.jitter_secs > 300 {
            result.add_warning(
                "weather.jitter_secs",
                "Jitter above 5 minutes delays refreshes noticeably",
            );
        }

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("location.latitude", "Latitude must be within -90..90");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    result.add_error("location.longitude", "Longitude must be within -180..180");
                }
            }
            (Some(_), None) => {
                result.add_error("location.longitude", "Longitude is required with latitude");
            }
            (None, Some(_)) => {
                result.add_error("location.latitude", "Latitude is required with longitude");
            }
            (None, None) => {
                result.add_warning(
                    "location",
                    "No fixed location configured - a location provider must be supplied",
                );
            }
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
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("aloft");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let result = config.validate();
        assert!(
            result.is_valid(),
            "Default config should be valid: {:?}",
            result.errors
        );
    }

    #[test]
    fn test_missing_location_is_warning() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.warnings.iter().any(|w| w.field == "location"));
    }

    #[test]
    fn test_invalid_endpoint_url() {
        let mut config = Config::default();
        config.weather.endpoint_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "weather.endpoint_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.endpoint_url = "ftp://opendata.fmi.fi/wfs".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_granularity_is_error() {
        let mut config = Config::default();
        config.weather.granularity_minutes = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "weather.granularity_minutes"));
    }

    #[test]
    fn test_empty_levels_is_error() {
        let mut config = Config::default();
        config.weather.levels.clear();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.levels"));
    }

    #[test]
    fn test_latitude_without_longitude_is_error() {
        let mut config = Config::default();
        config.location.latitude = Some(60.17);
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "location.longitude"));
    }

    #[test]
    fn test_out_of_range_latitude_is_error() {
        let mut config = Config::default();
        config.location.latitude = Some(123.0);
        config.location.longitude = Some(24.94);
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "location.latitude"));
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

    #[test]
    fn test_config_roundtrip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.weather.endpoint_url, config.weather.endpoint_url);
        assert_eq!(parsed.weather.levels, config.weather.levels);
        assert_eq!(
            parsed.location.maximum_age_secs,
            config.location.maximum_age_secs
        );
    }
}
