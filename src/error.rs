//! Domain error types for the comment validator chain
//!
//! Validator errors are contained by the chain runner and only ever show up
//! as a missing signal. Configuration, factory, and store errors surface to
//! the caller, and are fatal when they happen at startup.

use thiserror::Error;

/// Top-level error type
#[derive(Error, Debug)]
pub enum SieveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validator setup error: {0}")]
    Factory(#[from] FactoryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Undefined environment variable: {0}")]
    UndefinedVariable(String),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Blacklist not found: {0}")]
    BlacklistNotFound(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unknown store backend: {0}")]
    UnknownBackend(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Infrastructure failure inside a single validator
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("API key rejected by {0}")]
    Auth(&'static str),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Errors that can occur when building validators from configuration
#[derive(Error, Debug, Clone)]
pub enum FactoryError {
    #[error("Unknown validator: {0}")]
    UnknownValidator(String),

    #[error("Invalid validator parameters: {0}")]
    InvalidParameters(String),

    #[error("Validator {validator} requires {setting} to be set")]
    MissingCredential {
        validator: &'static str,
        setting: &'static str,
    },
}
