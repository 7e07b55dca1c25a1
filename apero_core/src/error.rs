//! Error types for the apero_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for apero_core operations
///
/// The BAC engine itself never fails; these errors come from input
/// validation and from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected drink input
    #[error("Invalid drink: {0}")]
    InvalidDrink(String),

    /// Rejected profile input
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Drink preset catalog error
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// State management error
    #[error("State error: {0}")]
    State(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
