//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Primary geocoding provider
pub const DEFAULT_GEOCODER_URL: &str = crate::constants::api::NOMINATIM_URL;

/// Per-request geocoding timeout in seconds
pub const DEFAULT_GEOCODE_TIMEOUT_SECS: u64 = 10;

/// Maximum number of search candidates shown
pub const DEFAULT_RESULT_LIMIT: usize = 5;

/// Country restriction for forward search (ISO 3166-1 alpha-2, comma separated)
pub const DEFAULT_COUNTRY_CODES: &str = "in";

/// Keystroke debounce for the search box in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Request high-accuracy positions
pub const DEFAULT_HIGH_ACCURACY: bool = true;

/// Geolocation timeout in seconds
pub const DEFAULT_GEOLOCATION_TIMEOUT_SECS: u64 = 20;

/// Oldest cached position accepted, in seconds
pub const DEFAULT_MAXIMUM_AGE_SECS: u64 = 300;

/// Base layer shown when the map loads
pub const DEFAULT_MAP_LAYER: &str = "satellite";

/// Camera zoom used when recentering on a location
pub const DEFAULT_MAP_ZOOM: u8 = 15;

/// Location shown before any user interaction (Mumbai)
pub const DEFAULT_LAT: f64 = 19.076;
pub const DEFAULT_LNG: f64 = 72.8777;
pub const DEFAULT_ADDRESS: &str = "Mumbai, Maharashtra";

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7878;

/// Downstream solar analysis endpoint
pub const DEFAULT_ANALYSIS_ENDPOINT: &str = "http://127.0.0.1:5000/api/analyze";

/// Analysis request timeout in seconds
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 60;

/// Default URL provider
pub const DEFAULT_URL_PROVIDER: &str = "openstreetmap";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "solar-locate";
