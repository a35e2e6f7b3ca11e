//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Environment variable that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::InvalidField`] for `field`.
    #[must_use]
    pub fn invalid(field: &'static str, value: &str, reason: &'static str) -> Self {
        Self::InvalidField {
            field,
            value: value.to_string(),
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn invalid_field_keeps_context_out_of_message() {
        let err = ConfigError::invalid("RARITY_HTTP_PORT", "abc", "must be a port number");
        assert_eq!(err.to_string(), "invalid configuration field");
        assert!(err.source().is_none());
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "RARITY_HTTP_PORT",
                reason: "must be a port number",
                ..
            }
        ));
    }
}
