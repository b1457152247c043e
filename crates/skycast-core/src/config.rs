use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that supplies the weather API key when the config file has none.
pub const API_KEY_ENV: &str = "SKYCAST_API_KEY";

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
    /// Application configuration directory (preferences database lives here)
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Location auto-detection settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Display preferences
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Unit suffix used when printing temperatures.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

impl std::str::FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" | "celsius" | "metric" => Ok(Self::Celsius),
            "f" | "fahrenheit" | "imperial" => Ok(Self::Fahrenheit),
            other => Err(format!("unknown temperature unit: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API key for the weather provider (falls back to `SKYCAST_API_KEY`)
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the weather REST API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Temperature unit used when no stored preference exists
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,

    /// Number of forecast days to request
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,
}

fn default_weather_base_url() -> String {
    "https://api.weatherapi.com".to_string()
}

fn default_forecast_days() -> u8 {
    7
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_weather_base_url(),
            temperature_unit: TemperatureUnit::default(),
            forecast_days: default_forecast_days(),
        }
    }
}

impl WeatherConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Try the platform location service before IP lookups
    #[serde(default = "default_true")]
    pub device_geolocation: bool,

    /// How long to wait for a device position fix
    #[serde(default = "default_geolocation_timeout")]
    pub geolocation_timeout_secs: u64,

    /// Primary IP geolocation service
    #[serde(default = "default_ipinfo_url")]
    pub ipinfo_url: String,

    /// Last-resort IP geolocation service
    #[serde(default = "default_geolocation_db_url")]
    pub geolocation_db_url: String,

    /// City used when every detection step fails
    #[serde(default = "default_city")]
    pub default_city: String,

    #[serde(default = "default_lat")]
    pub default_lat: f64,

    #[serde(default = "default_lon")]
    pub default_lon: f64,
}

fn default_true() -> bool {
    true
}

fn default_geolocation_timeout() -> u64 {
    15
}

fn default_ipinfo_url() -> String {
    "https://ipinfo.io/json".to_string()
}

fn default_geolocation_db_url() -> String {
    "https://geolocation-db.com/json/".to_string()
}

fn default_city() -> String {
    "New Delhi".to_string()
}

fn default_lat() -> f64 {
    28.6139
}

fn default_lon() -> f64 {
    77.2090
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            device_geolocation: default_true(),
            geolocation_timeout_secs: default_geolocation_timeout(),
            ipinfo_url: default_ipinfo_url(),
            geolocation_db_url: default_geolocation_db_url(),
            default_city: default_city(),
            default_lat: default_lat(),
            default_lon: default_lon(),
        }
    }
}

/// Mapping used to place the sun/moon marker on the day arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressCurve {
    /// Day squeezed into 25–75%, night split across 75–100% and 0–25%
    #[default]
    Arc,
    /// Straight 0–100% over the 24 hours
    Linear,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub progress_curve: ProgressCurve,
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
            weather: WeatherConfig::default(),
            location: LocationConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating a default file if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            tracing::info!("Created default config at {}", config_path.display());
            config
        };

        if !config.weather.has_api_key() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                config.weather.api_key = key;
            }
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
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

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        self.validate_url(&self.location.ipinfo_url, "location.ipinfo_url", &mut result);
        self.validate_url(
            &self.location.geolocation_db_url,
            "location.geolocation_db_url",
            &mut result,
        );

        if !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured (set it here or via {})", API_KEY_ENV),
            );
        }

        if self.weather.forecast_days == 0 || self.weather.forecast_days > 14 {
            result.add_error(
                "weather.forecast_days",
                "Forecast days must be between 1 and 14",
            );
        }

        if self.location.geolocation_timeout_secs == 0 {
            result.add_error(
                "location.geolocation_timeout_secs",
                "Geolocation timeout must be greater than 0",
            );
        } else if self.location.geolocation_timeout_secs > 120 {
            result.add_warning(
                "location.geolocation_timeout_secs",
                "Geolocation timeout is unusually long (>120s)",
            );
        }

        if self.location.default_city.trim().is_empty() {
            result.add_error("location.default_city", "Default city cannot be empty");
        }

        if !(-90.0..=90.0).contains(&self.location.default_lat) {
            result.add_error("location.default_lat", "Latitude must be within -90..=90");
        }
        if !(-180.0..=180.0).contains(&self.location.default_lon) {
            result.add_error("location.default_lon", "Longitude must be within -180..=180");
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

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the preferences database inside the config directory
    pub fn prefs_path(&self) -> PathBuf {
        self.config_dir.join("prefs.db")
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
