//! Error types for testkit

use thiserror::Error;

/// Result type alias using testkit Error
pub type Result<T> = std::result::Result<T, Error>;

/// testkit error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TEST_USER_EMAIL and TEST_USER_PASSWORD must be set in environment variables")]
    MissingCredentials,

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
