use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const APP_DIR_NAME: &str = "breezy";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable that overrides `weather.api_key`.
pub const WEATHER_API_KEY_ENV: &str = "BREEZY_WEATHER_API_KEY";
/// Environment variable that overrides `firebase.api_key`.
pub const FIREBASE_API_KEY_ENV: &str = "BREEZY_FIREBASE_API_KEY";

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

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Measurement system used for every displayed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// The other system.
    pub fn toggled(self) -> Self {
        match self {
            Self::Metric => Self::Imperial,
            Self::Imperial => Self::Metric,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

impl std::str::FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" | "c" | "celsius" => Ok(Self::Metric),
            "imperial" | "f" | "fahrenheit" => Ok(Self::Imperial),
            other => Err(format!("unknown unit system: {}", other)),
        }
    }
}

/// Color theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Device location settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Identity and document store settings
    #[serde(default)]
    pub firebase: FirebaseConfig,

    /// Google sign-in settings
    #[serde(default)]
    pub google: GoogleConfig,

    /// Display preferences used while signed out
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the forecast API
    #[serde(default = "default_weather_base_url")]
    pub api_base_url: String,

    /// API key (overridden by `BREEZY_WEATHER_API_KEY`)
    #[serde(default)]
    pub api_key: String,

    /// Number of forecast days requested
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,

    /// Request air quality data
    #[serde(default)]
    pub include_air_quality: bool,

    /// Request weather alerts
    #[serde(default)]
    pub include_alerts: bool,

    /// Age after which cached responses are refetched, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// HTTP timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Location shown on startup
    #[serde(default = "default_location")]
    pub default_location: String,
}

fn default_weather_base_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

fn default_forecast_days() -> u8 {
    7
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_location() -> String {
    "San Francisco".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_weather_base_url(),
            api_key: String::new(),
            forecast_days: default_forecast_days(),
            include_air_quality: false,
            include_alerts: false,
            cache_ttl_secs: default_cache_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            default_location: default_location(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Upper bound for one position request, in seconds
    #[serde(default = "default_location_timeout_secs")]
    pub timeout_secs: u64,

    /// IP geolocation endpoint
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,

    /// Fixed position used instead of the IP lookup when both are set
    #[serde(default)]
    pub fixed_latitude: Option<f64>,
    #[serde(default)]
    pub fixed_longitude: Option<f64>,
}

fn default_location_timeout_secs() -> u64 {
    10
}

fn default_ip_lookup_url() -> String {
    "http://ip-api.com/json".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_location_timeout_secs(),
            ip_lookup_url: default_ip_lookup_url(),
            fixed_latitude: None,
            fixed_longitude: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Web API key (overridden by `BREEZY_FIREBASE_API_KEY`)
    #[serde(default)]
    pub api_key: String,

    /// Project identifier for the document store
    #[serde(default)]
    pub project_id: String,

    #[serde(default = "default_identity_url")]
    pub identity_url: String,

    #[serde(default = "default_secure_token_url")]
    pub secure_token_url: String,

    #[serde(default = "default_firestore_url")]
    pub firestore_url: String,
}

fn default_identity_url() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_secure_token_url() -> String {
    "https://securetoken.googleapis.com/v1".to_string()
}

fn default_firestore_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

impl FirebaseConfig {
    /// Check if credentials are configured (not placeholders)
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
            && !self.project_id.is_empty()
            && !self.api_key.starts_with("YOUR_")
            && !self.project_id.starts_with("YOUR_")
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: "YOUR_FIREBASE_API_KEY".to_string(),
            project_id: "YOUR_FIREBASE_PROJECT_ID".to_string(),
            identity_url: default_identity_url(),
            secure_token_url: default_secure_token_url(),
            firestore_url: default_firestore_url(),
        }
    }
}

/// Google OAuth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Loopback port for the OAuth redirect
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
}

fn default_callback_port() -> u16 {
    8085
}

impl GoogleConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.client_id.starts_with("YOUR_")
            && !self.client_secret.starts_with("YOUR_")
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: "YOUR_GOOGLE_CLIENT_ID".to_string(),
            client_secret: "YOUR_GOOGLE_CLIENT_SECRET".to_string(),
            callback_port: default_callback_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub unit_system: UnitSystem,

    #[serde(default)]
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            location: LocationConfig::default(),
            firebase: FirebaseConfig::default(),
            google: GoogleConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&contents).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
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

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(WEATHER_API_KEY_ENV) {
            if !key.is_empty() {
                self.weather.api_key = key;
            }
        }
        if let Ok(key) = std::env::var(FIREBASE_API_KEY_ENV) {
            if !key.is_empty() {
                self.firebase.api_key = key;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.weather.api_base_url, "weather.api_base_url", &mut result);
        validate_url(&self.location.ip_lookup_url, "location.ip_lookup_url", &mut result);
        validate_url(&self.firebase.identity_url, "firebase.identity_url", &mut result);
        validate_url(&self.firebase.secure_token_url, "firebase.secure_token_url", &mut result);
        validate_url(&self.firebase.firestore_url, "firebase.firestore_url", &mut result);

        if self.weather.api_key.is_empty() {
            result.add_warning(
                "weather.api_key",
                format!("No API key set; export {} or edit the config", WEATHER_API_KEY_ENV),
            );
        }

        if self.weather.forecast_days == 0 {
            result.add_error("weather.forecast_days", "Forecast days must be greater than 0");
        } else if self.weather.forecast_days > 14 {
            result.add_error("weather.forecast_days", "Provider serves at most 14 forecast days");
        }

        if self.weather.cache_ttl_secs == 0 {
            result.add_warning("weather.cache_ttl_secs", "Weather caching disabled (0 seconds)");
        } else if self.weather.cache_ttl_secs > 86_400 {
            result.add_warning(
                "weather.cache_ttl_secs",
                "Weather cache TTL is more than 24 hours",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error("weather.request_timeout_secs", "Request timeout must be greater than 0");
        }

        if self.location.timeout_secs == 0 {
            result.add_error("location.timeout_secs", "Location timeout must be greater than 0");
        }

        match (self.location.fixed_latitude, self.location.fixed_longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("location.fixed_latitude", "Latitude must be within -90..90");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    result.add_error("location.fixed_longitude", "Longitude must be within -180..180");
                }
            }
            (None, None) => {}
            _ => result.add_warning(
                "location",
                "Only one of fixed_latitude/fixed_longitude is set; IP lookup will be used",
            ),
        }

        if !self.firebase.is_configured() {
            result.add_warning(
                "firebase",
                "Accounts not configured - favorites and settings stay local",
            );
        }

        if !self.google.is_configured() {
            result.add_warning("google", "Google sign-in not configured");
        }

        result
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the local key-value database
    pub fn local_db_path(&self) -> PathBuf {
        self.config_dir.join("local.db")
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }
}

/// Validate a URL field
fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
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
