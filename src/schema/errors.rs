//! Catalog error types
//!
//! Error codes:
//! - SEARCH_SCHEMA_MALFORMED (FATAL)
//! - SEARCH_SCHEMA_DUPLICATE_TABLE (FATAL)
//! - SEARCH_SCHEMA_DUPLICATE_ATTRIBUTE (FATAL)
//! - SEARCH_SCHEMA_UNKNOWN_TARGET (FATAL)
//! - SEARCH_SCHEMA_UNKNOWN_COLUMN (FATAL)
//!
//! The catalog is built once at startup; every error here aborts boot.

use std::fmt;

/// Severity levels for catalog errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Process must not start
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Catalog error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Catalog file unreadable or not valid JSON
    SearchSchemaMalformed,
    /// Two tables share a name
    SearchSchemaDuplicateTable,
    /// Column and relationship names collide, or a name repeats
    SearchSchemaDuplicateAttribute,
    /// Relationship points at a table that is not declared
    SearchSchemaUnknownTarget,
    /// Primary key, foreign key or association key is not a declared column
    SearchSchemaUnknownColumn,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::SearchSchemaMalformed => "SEARCH_SCHEMA_MALFORMED",
            SchemaErrorCode::SearchSchemaDuplicateTable => "SEARCH_SCHEMA_DUPLICATE_TABLE",
            SchemaErrorCode::SearchSchemaDuplicateAttribute => {
                "SEARCH_SCHEMA_DUPLICATE_ATTRIBUTE"
            }
            SchemaErrorCode::SearchSchemaUnknownTarget => "SEARCH_SCHEMA_UNKNOWN_TARGET",
            SchemaErrorCode::SearchSchemaUnknownColumn => "SEARCH_SCHEMA_UNKNOWN_COLUMN",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Catalog error with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    table: Option<String>,
}

impl SchemaError {
    /// Catalog source could not be read or parsed
    pub fn malformed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::SearchSchemaMalformed,
            message: format!("Catalog '{}' is malformed: {}", source.into(), reason.into()),
            table: None,
        }
    }

    /// Table declared twice
    pub fn duplicate_table(table: impl Into<String>) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::SearchSchemaDuplicateTable,
            message: format!("Table '{}' is declared more than once", t),
            table: Some(t),
        }
    }

    /// Attribute name declared twice on one table
    pub fn duplicate_attribute(table: impl Into<String>, attribute: &str) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::SearchSchemaDuplicateAttribute,
            message: format!("Attribute '{}' is declared more than once on '{}'", attribute, t),
            table: Some(t),
        }
    }

    /// Relationship target missing from the catalog
    pub fn unknown_target(table: impl Into<String>, relationship: &str, target: &str) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::SearchSchemaUnknownTarget,
            message: format!(
                "Relationship '{}.{}' targets undeclared table '{}'",
                t, relationship, target
            ),
            table: Some(t),
        }
    }

    /// Key refers to a column that does not exist
    pub fn unknown_column(table: impl Into<String>, column: &str, role: &str) -> Self {
        let t = table.into();
        Self {
            code: SchemaErrorCode::SearchSchemaUnknownColumn,
            message: format!("{} '{}' is not a column of '{}'", role, column, t),
            table: Some(t),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending table if applicable
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for SchemaError {}

/// Result type for catalog operations
pub type SchemaResult<T> = Result<T, SchemaError>;
