//! Error types for honeybadger-core
//!
//! These never escape `notify`; the notifier converts them into log events.

use thiserror::Error;

/// Main error type for the honeybadger-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Request could not be built or sent
    #[error("transport error: {0}")]
    Transport(String),

    /// The notices API answered with a non-success status
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Result type alias for honeybadger-core
pub type Result<T> = std::result::Result<T, Error>;
