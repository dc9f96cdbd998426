// Configuration validation

use crate::{ConfigError, Result};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a character can separate key segments
    pub fn is_delimiter(value: char, field: &str) -> Result<()> {
        if value.is_whitespace() || value.is_alphanumeric() {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a punctuation character, got {:?}",
                field, value
            )));
        }
        Ok(())
    }
}
