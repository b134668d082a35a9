//! Centralized constants for the solar-locate crate
//!
//! Provider endpoints and fixed parameters shared across modules.

/// External API endpoints
pub mod api {
    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// IP geolocation API (free, no key required)
    pub const IP_API_URL: &str = "http://ip-api.com/json";

    /// User agent sent to every provider (Nominatim rejects anonymous clients)
    pub const USER_AGENT: &str = concat!("solar-locate/", env!("CARGO_PKG_VERSION"));
}

/// Geocoding request parameters
pub mod geocoding {
    /// Zoom level requested from reverse geocoding (building-level detail)
    pub const REVERSE_ZOOM: u8 = 18;

    /// Hard upper bound on candidates shown for one search
    pub const MAX_RESULT_LIMIT: usize = 10;
}

/// Map tile layers
pub mod tiles {
    /// OpenStreetMap street tiles
    pub const STREET_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

    /// Esri World Imagery satellite tiles
    pub const SATELLITE_URL: &str =
        "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";

    pub const STREET_ATTRIBUTION: &str = "© OpenStreetMap contributors";
    pub const SATELLITE_ATTRIBUTION: &str = "© Esri, Maxar, Earthstar Geographics";

    /// Maximum zoom supported by both tile sets
    pub const MAX_ZOOM: u8 = 19;
}

/// IP location settings
pub mod ip_location {
    /// Accuracy radius reported for IP-derived positions (city level)
    pub const ACCURACY_METERS: f64 = 5_000.0;

    /// IP location cache file name
    pub const CACHE_FILE: &str = "ip_location_cache.json";
}
