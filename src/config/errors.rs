//! Configuration error types
//!
//! Error codes:
//! - SEARCH_CONFIG_UNREADABLE (FATAL)
//! - SEARCH_CONFIG_MALFORMED (FATAL)
//! - SEARCH_CONFIG_INVALID (FATAL)
//! - SEARCH_CONFIG_UNKNOWN_ENTITY (FATAL)
//!
//! A process with a bad configuration never starts.

use std::fmt;

/// Configuration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// File could not be read
    SearchConfigUnreadable,
    /// File is not valid JSON for the configuration shape
    SearchConfigMalformed,
    /// Values violate a constraint
    SearchConfigInvalid,
    /// `entities` names an entity that does not exist
    SearchConfigUnknownEntity,
}

impl ConfigErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigErrorCode::SearchConfigUnreadable => "SEARCH_CONFIG_UNREADABLE",
            ConfigErrorCode::SearchConfigMalformed => "SEARCH_CONFIG_MALFORMED",
            ConfigErrorCode::SearchConfigInvalid => "SEARCH_CONFIG_INVALID",
            ConfigErrorCode::SearchConfigUnknownEntity => "SEARCH_CONFIG_UNKNOWN_ENTITY",
        }
    }
}

impl fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// File could not be read
    pub fn unreadable(path: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorCode::SearchConfigUnreadable,
            format!("Failed to read config '{}': {}", path, reason),
        )
    }

    /// File could not be parsed
    pub fn malformed(path: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorCode::SearchConfigMalformed,
            format!("Invalid config JSON in '{}': {}", path, reason),
        )
    }

    /// A value violates a constraint
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::SearchConfigInvalid, message)
    }

    /// Unknown entity name
    pub fn unknown_entity(name: &str) -> Self {
        Self::new(
            ConfigErrorCode::SearchConfigUnknownEntity,
            format!("Unknown entity '{}' in 'entities'", name),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let err = ConfigError::invalid("broker.max_retries must be > 0");
        assert_eq!(
            err.to_string(),
            "[FATAL] SEARCH_CONFIG_INVALID: broker.max_retries must be > 0"
        );
    }

    #[test]
    fn test_unknown_entity() {
        let err = ConfigError::unknown_entity("work");
        assert_eq!(err.code(), ConfigErrorCode::SearchConfigUnknownEntity);
        assert!(err.message().contains("work"));
    }
}
