//! Configuration validation traits and utilities

use crate::error::{ConfigError, ConfigResult};

/// Trait implemented by every configuration domain.
///
/// `validate` checks the values a deserialized document arrived with;
/// `domain_name` tags the resulting errors so a failing field can be
/// traced back to its section.
pub trait Validatable {
    /// Validate the configuration values
    fn validate(&self) -> ConfigResult<()>;

    /// Domain name used to tag validation errors
    fn domain_name(&self) -> &'static str;

    /// Build a validation error tagged with this domain
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Reject empty or whitespace-only values for a required field.
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must not be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a process image name.
///
/// Instance checks match by bare image name against the process table, so
/// a value carrying a path would never match anything.
pub fn validate_image_name(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    validate_required_string(value, field_name, domain)?;
    if value.contains('/') || value.contains('\\') {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!(
                "{} must be a bare image name without path separators, got '{}'",
                field_name, value
            ),
        });
    }
    Ok(())
}

/// Reject a zero bound for a timeout given in seconds.
pub fn validate_nonzero_secs(value: u64, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be at least 1 second", field_name),
        });
    }
    Ok(())
}
