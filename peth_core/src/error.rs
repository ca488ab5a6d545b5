//! Error types for the peth_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for peth_core operations
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

    /// A drinking session violates its invariants
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Subject parameters are out of range
    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    /// Beverage volume / ABV cannot be converted to grams
    #[error("Invalid beverage: {0}")]
    InvalidBeverage(String),

    /// Session input file could not be interpreted
    #[error("Input error: {0}")]
    Input(String),
}
