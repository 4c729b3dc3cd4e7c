//! CLI-specific error types
//!
//! Every CLI error is fatal: the process exits non-zero.

use std::fmt;
use std::io;

use crate::boot::BootError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Startup sequence failed
    BootFailed,
    /// Entity not enabled or not declared
    UnknownEntity,
    /// Table not in the catalog
    UnknownTable,
    /// I/O error (stdout)
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::BootFailed => "SEARCH_CLI_BOOT_FAILED",
            Self::UnknownEntity => "SEARCH_CLI_UNKNOWN_ENTITY",
            Self::UnknownTable => "SEARCH_CLI_UNKNOWN_TABLE",
            Self::IoError => "SEARCH_CLI_IO_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Boot failed
    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    /// Unknown entity
    pub fn unknown_entity(entity: &str, known: &[&str]) -> Self {
        Self::new(
            CliErrorCode::UnknownEntity,
            format!(
                "Unknown entity '{}'. Enabled entities: {}",
                entity,
                known.join(", ")
            ),
        )
    }

    /// Unknown table
    pub fn unknown_table(table: &str) -> Self {
        Self::new(
            CliErrorCode::UnknownTable,
            format!("Table '{}' is not in the catalog", table),
        )
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<BootError> for CliError {
    fn from(e: BootError) -> Self {
        Self::boot_failed(e.to_string())
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CliError::unknown_table("recording");
        assert_eq!(
            err.to_string(),
            "SEARCH_CLI_UNKNOWN_TABLE: Table 'recording' is not in the catalog"
        );
        assert_eq!(err.code(), &CliErrorCode::UnknownTable);
    }

    #[test]
    fn test_unknown_entity_lists_enabled() {
        let err = CliError::unknown_entity("work", &["area", "artist"]);
        assert_eq!(err.code_str(), "SEARCH_CLI_UNKNOWN_ENTITY");
        assert!(err.message().ends_with("area, artist"));
    }
}
