//! Configuration error types

use thiserror::Error;

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Cannot read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    /// Configuration file is not valid YAML
    #[error("Cannot parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// An environment override carries an unusable value
    #[error("Invalid environment override: {0}")]
    EnvError(String),

    /// A domain rejected one of its values
    #[error("Invalid {domain} configuration: {message}")]
    DomainError { domain: String, message: String },
}
