//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/solar-locate/config.toml

pub mod defaults;

use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::map::BaseLayer;
use crate::position::PositionOptions;
use defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Geocoding providers
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Search box behaviour
    #[serde(default)]
    pub search: SearchConfig,

    /// Device position requests
    #[serde(default)]
    pub geolocation: GeolocationConfig,

    /// Map view settings
    #[serde(default)]
    pub map: MapConfig,

    /// Location shown before any user interaction
    #[serde(default)]
    pub default_location: DefaultLocationConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Downstream analysis service
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// URL generation settings
    #[serde(default)]
    pub url: UrlConfig,
}

/// Geocoding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Primary provider base URL
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,

    /// Secondary provider tried when the primary fails (empty = none)
    #[serde(default)]
    pub fallback_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_geocode_timeout")]
    pub timeout_secs: u64,

    /// Maximum candidates returned by a search
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Country restriction for forward search
    #[serde(default = "default_country_codes")]
    pub country_codes: String,
}

/// Search box settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Geolocation request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,

    #[serde(default = "default_geolocation_timeout")]
    pub timeout_secs: u64,

    /// Oldest cached position accepted
    #[serde(default = "default_maximum_age")]
    pub maximum_age_secs: u64,
}

/// Map view settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Base layer shown on load ("satellite" or "street")
    #[serde(default = "default_map_layer")]
    pub default_layer: String,

    /// Zoom used when recentering
    #[serde(default = "default_map_zoom")]
    pub zoom: u8,
}

/// Default location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultLocationConfig {
    #[serde(default = "default_lat")]
    pub lat: f64,

    #[serde(default = "default_lng")]
    pub lng: f64,

    #[serde(default = "default_address")]
    pub address: String,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Analysis service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_analysis_timeout")]
    pub timeout_secs: u64,
}

/// URL generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Default URL provider
    #[serde(default = "default_url_provider")]
    pub default: String,

    /// URL provider templates
    #[serde(default = "default_url_providers")]
    pub providers: HashMap<String, String>,
}

// Default value functions for serde
fn default_geocoder_url() -> String {
    DEFAULT_GEOCODER_URL.to_string()
}
fn default_geocode_timeout() -> u64 {
    DEFAULT_GEOCODE_TIMEOUT_SECS
}
fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}
fn default_country_codes() -> String {
    DEFAULT_COUNTRY_CODES.to_string()
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_high_accuracy() -> bool {
    DEFAULT_HIGH_ACCURACY
}
fn default_geolocation_timeout() -> u64 {
    DEFAULT_GEOLOCATION_TIMEOUT_SECS
}
fn default_maximum_age() -> u64 {
    DEFAULT_MAXIMUM_AGE_SECS
}
fn default_map_layer() -> String {
    DEFAULT_MAP_LAYER.to_string()
}
fn default_map_zoom() -> u8 {
    DEFAULT_MAP_ZOOM
}
fn default_lat() -> f64 {
    DEFAULT_LAT
}
fn default_lng() -> f64 {
    DEFAULT_LNG
}
fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_analysis_endpoint() -> String {
    DEFAULT_ANALYSIS_ENDPOINT.to_string()
}
fn default_analysis_timeout() -> u64 {
    DEFAULT_ANALYSIS_TIMEOUT_SECS
}
fn default_url_provider() -> String {
    DEFAULT_URL_PROVIDER.to_string()
}
fn default_url_providers() -> HashMap<String, String> {
    let mut providers = HashMap::new();
    providers.insert(
        "google".to_string(),
        "https://www.google.com/maps/@{lat},{lng},18z".to_string(),
    );
    providers.insert(
        "openstreetmap".to_string(),
        "https://www.openstreetmap.org/#map=18/{lat}/{lng}".to_string(),
    );
    providers.insert(
        "apple".to_string(),
        "https://maps.apple.com/?ll={lat},{lng}".to_string(),
    );
    providers
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_url(),
            fallback_url: String::new(),
            timeout_secs: default_geocode_timeout(),
            result_limit: default_result_limit(),
            country_codes: default_country_codes(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: default_high_accuracy(),
            timeout_secs: default_geolocation_timeout(),
            maximum_age_secs: default_maximum_age(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_layer: default_map_layer(),
            zoom: default_map_zoom(),
        }
    }
}

impl Default for DefaultLocationConfig {
    fn default() -> Self {
        Self {
            lat: default_lat(),
            lng: default_lng(),
            address: default_address(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_analysis_endpoint(),
            timeout_secs: default_analysis_timeout(),
        }
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            default: default_url_provider(),
            providers: default_url_providers(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read config file: {}", e))
            })?;

            toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse config file: {}", e))
            })
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(&path, content).map_err(|e| {
            Error::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["geocoding", "base_url"] => Some(self.geocoding.base_url.clone()),
            ["geocoding", "fallback_url"] => Some(self.geocoding.fallback_url.clone()),
            ["geocoding", "timeout_secs"] => Some(self.geocoding.timeout_secs.to_string()),
            ["geocoding", "result_limit"] => Some(self.geocoding.result_limit.to_string()),
            ["geocoding", "country_codes"] => Some(self.geocoding.country_codes.clone()),

            ["search", "debounce_ms"] => Some(self.search.debounce_ms.to_string()),

            ["geolocation", "high_accuracy"] => Some(self.geolocation.high_accuracy.to_string()),
            ["geolocation", "timeout_secs"] => Some(self.geolocation.timeout_secs.to_string()),
            ["geolocation", "maximum_age_secs"] => {
                Some(self.geolocation.maximum_age_secs.to_string())
            }

            ["map", "default_layer"] => Some(self.map.default_layer.clone()),
            ["map", "zoom"] => Some(self.map.zoom.to_string()),

            ["default_location", "lat"] => Some(self.default_location.lat.to_string()),
            ["default_location", "lng"] => Some(self.default_location.lng.to_string()),
            ["default_location", "address"] => Some(self.default_location.address.clone()),

            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["analysis", "endpoint"] => Some(self.analysis.endpoint.clone()),
            ["analysis", "timeout_secs"] => Some(self.analysis.timeout_secs.to_string()),

            ["url", "default"] => Some(self.url.default.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["geocoding", "base_url"] => {
                self.geocoding.base_url = value.to_string();
            }
            ["geocoding", "fallback_url"] => {
                self.geocoding.fallback_url = value.to_string();
            }
            ["geocoding", "timeout_secs"] => {
                self.geocoding.timeout_secs = parse_value(key, value)?;
            }
            ["geocoding", "result_limit"] => {
                self.geocoding.result_limit = parse_value(key, value)?;
            }
            ["geocoding", "country_codes"] => {
                self.geocoding.country_codes = value.to_string();
            }

            ["search", "debounce_ms"] => {
                self.search.debounce_ms = parse_value(key, value)?;
            }

            ["geolocation", "high_accuracy"] => {
                self.geolocation.high_accuracy = parse_value(key, value)?;
            }
            ["geolocation", "timeout_secs"] => {
                self.geolocation.timeout_secs = parse_value(key, value)?;
            }
            ["geolocation", "maximum_age_secs"] => {
                self.geolocation.maximum_age_secs = parse_value(key, value)?;
            }

            ["map", "default_layer"] => {
                let layer: BaseLayer = value.parse().map_err(Error::Config)?;
                self.map.default_layer = layer.to_string();
            }
            ["map", "zoom"] => {
                self.map.zoom = parse_value(key, value)?;
            }

            ["default_location", "lat"] => {
                let lat = parse_value(key, value)?;
                Coordinates::checked(lat, self.default_location.lng)?;
                self.default_location.lat = lat;
            }
            ["default_location", "lng"] => {
                let lng = parse_value(key, value)?;
                Coordinates::checked(self.default_location.lat, lng)?;
                self.default_location.lng = lng;
            }
            ["default_location", "address"] => {
                self.default_location.address = value.to_string();
            }

            ["server", "host"] => {
                self.server.host = value.to_string();
            }
            ["server", "port"] => {
                self.server.port = parse_value(key, value)?;
            }

            ["analysis", "endpoint"] => {
                self.analysis.endpoint = value.to_string();
            }
            ["analysis", "timeout_secs"] => {
                self.analysis.timeout_secs = parse_value(key, value)?;
            }

            ["url", "default"] => {
                self.url.default = value.to_string();
            }

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "geocoding.base_url",
            "geocoding.fallback_url",
            "geocoding.timeout_secs",
            "geocoding.result_limit",
            "geocoding.country_codes",
            "search.debounce_ms",
            "geolocation.high_accuracy",
            "geolocation.timeout_secs",
            "geolocation.maximum_age_secs",
            "map.default_layer",
            "map.zoom",
            "default_location.lat",
            "default_location.lng",
            "default_location.address",
            "server.host",
            "server.port",
            "analysis.endpoint",
            "analysis.timeout_secs",
            "url.default",
        ]
    }

    /// Format a URL using the specified provider
    ///
    /// Replaces {lat} and {lng} placeholders with actual values
    pub fn format_url(&self, provider: Option<&str>, lat: f64, lng: f64) -> Result<String> {
        let provider_name = provider.unwrap_or(&self.url.default);

        let template = self.url.providers.get(provider_name).ok_or_else(|| {
            Error::Config(format!("Unknown URL provider: {}", provider_name))
        })?;

        Ok(template
            .replace("{lat}", &lat.to_string())
            .replace("{lng}", &lng.to_string()))
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Apply command-line bind overrides and return the resulting address
    pub fn override_server(&mut self, host: Option<String>, port: Option<u16>) -> String {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self.server_addr()
    }

    /// Coordinates and label of the pre-interaction location
    pub fn default_location(&self) -> Result<(Coordinates, String)> {
        let coords = Coordinates::checked(self.default_location.lat, self.default_location.lng)?;
        Ok((coords, self.default_location.address.clone()))
    }

    /// Base layer shown when the map loads
    pub fn default_layer(&self) -> Result<BaseLayer> {
        self.map.default_layer.parse().map_err(Error::Config)
    }

    /// Geocoding provider base URLs in fallback order
    pub fn geocoder_urls(&self) -> Vec<String> {
        [&self.geocoding.base_url, &self.geocoding.fallback_url]
            .into_iter()
            .filter(|url| !url.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoding.timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    /// Options passed to every position request
    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            enable_high_accuracy: self.geolocation.high_accuracy,
            timeout: Duration::from_secs(self.geolocation.timeout_secs),
            maximum_age: Duration::from_secs(self.geolocation.maximum_age_secs),
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}
