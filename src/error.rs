//! Error types for solar-locate

use thiserror::Error;

/// Main error type for solar-locate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Geolocation error: {0}")]
    Geolocation(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Location must be confirmed before analysis")]
    ConfirmationRequired,

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for solar-locate operations
pub type Result<T> = std::result::Result<T, Error>;
