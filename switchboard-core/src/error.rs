//! Error types for switch storage, condition evaluation and the registry.

use thiserror::Error;

/// Result type for switch operations.
pub type Result<T> = std::result::Result<T, SwitchError>;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by a [`SwitchStore`](crate::SwitchStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic store error
    #[error("Store error: {0}")]
    Other(String),
}

/// Errors raised while evaluating or editing condition payloads.
#[derive(Debug, Error)]
pub enum ConditionError {
    /// The payload stored under a namespace does not have the expected shape
    #[error("Malformed condition payload for namespace '{namespace}': {reason}")]
    MalformedPayload { namespace: String, reason: String },

    /// A single condition string is not valid for its field
    #[error("Invalid condition '{condition}' for field '{field}': {reason}")]
    InvalidCondition {
        field: String,
        condition: String,
        reason: String,
    },

    /// The evaluator failed while deciding activation
    #[error("Evaluator failure in namespace '{namespace}': {reason}")]
    Evaluator { namespace: String, reason: String },
}

impl ConditionError {
    pub(crate) fn invalid(
        field: impl Into<String>,
        condition: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidCondition {
            field: field.into(),
            condition: condition.into(),
            reason: reason.into(),
        }
    }
}

/// Registry lookup errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No condition set registered under the given id or namespace
    #[error("Condition set not found: {0}")]
    NotFound(String),
}

/// Errors raised by a [`VersioningHook`](crate::VersioningHook).
#[derive(Debug, Error)]
pub enum VersioningError {
    /// The version record could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The version backend rejected the record
    #[error("Version backend error: {0}")]
    Backend(String),
}

/// Umbrella error for switch operations.
#[derive(Debug, Error)]
pub enum SwitchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// No switch stored under the given key
    #[error("Switch not found: {0}")]
    SwitchNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SwitchError::from(RegistryError::NotFound("user".to_string()));
        assert_eq!(err.to_string(), "Condition set not found: user");

        let err = ConditionError::invalid("percent", "abc", "expected lo-hi");
        assert_eq!(
            err.to_string(),
            "Invalid condition 'abc' for field 'percent': expected lo-hi"
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let err: SwitchError = StoreError::Unavailable("timeout".to_string()).into();
        assert!(matches!(err, SwitchError::Store(StoreError::Unavailable(_))));
    }
}
