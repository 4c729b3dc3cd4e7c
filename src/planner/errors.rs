//! Plan construction error types
//!
//! Error codes:
//! - SEARCH_PLAN_UNKNOWN_TABLE (FATAL)
//! - SEARCH_PLAN_UNKNOWN_ATTRIBUTE (FATAL)
//! - SEARCH_PLAN_NOT_A_RELATIONSHIP (FATAL)
//! - SEARCH_PLAN_INVALID_PATH (FATAL)
//! - SEARCH_PLAN_EMPTY_FIELD (FATAL)
//! - SEARCH_PLAN_DUPLICATE_FIELD (FATAL)
//! - SEARCH_PLAN_DUPLICATE_ENTITY (FATAL)
//!
//! Plans are compiled once at startup. A field that cannot be planned
//! aborts boot; it is never skipped.

use std::fmt;

/// Severity levels for planner errors
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

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Root or hop table missing from the catalog
    SearchPlanUnknownTable,
    /// Path segment names neither a column nor a relationship
    SearchPlanUnknownAttribute,
    /// Path tries to descend through a plain column
    SearchPlanNotARelationship,
    /// Path is not `segment(.segment)*`
    SearchPlanInvalidPath,
    /// Field declares no paths
    SearchPlanEmptyField,
    /// Two fields of one entity share a name
    SearchPlanDuplicateField,
    /// Two entities share a name
    SearchPlanDuplicateEntity,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::SearchPlanUnknownTable => "SEARCH_PLAN_UNKNOWN_TABLE",
            PlannerErrorCode::SearchPlanUnknownAttribute => "SEARCH_PLAN_UNKNOWN_ATTRIBUTE",
            PlannerErrorCode::SearchPlanNotARelationship => "SEARCH_PLAN_NOT_A_RELATIONSHIP",
            PlannerErrorCode::SearchPlanInvalidPath => "SEARCH_PLAN_INVALID_PATH",
            PlannerErrorCode::SearchPlanEmptyField => "SEARCH_PLAN_EMPTY_FIELD",
            PlannerErrorCode::SearchPlanDuplicateField => "SEARCH_PLAN_DUPLICATE_FIELD",
            PlannerErrorCode::SearchPlanDuplicateEntity => "SEARCH_PLAN_DUPLICATE_ENTITY",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Plan construction error with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    path: Option<String>,
}

impl PlannerError {
    /// Create an unknown table error
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::SearchPlanUnknownTable,
            message: format!("Table '{}' is not in the catalog", table.into()),
            path: None,
        }
    }

    /// Create an unknown attribute error
    pub fn unknown_attribute(table: &str, segment: &str, path: impl Into<String>) -> Self {
        let p = path.into();
        Self {
            code: PlannerErrorCode::SearchPlanUnknownAttribute,
            message: format!(
                "'{}' is neither a column nor a relationship of '{}' (path '{}')",
                segment, table, p
            ),
            path: Some(p),
        }
    }

    /// Create a not-a-relationship error
    pub fn not_a_relationship(table: &str, segment: &str, path: impl Into<String>) -> Self {
        let p = path.into();
        Self {
            code: PlannerErrorCode::SearchPlanNotARelationship,
            message: format!(
                "Column '{}.{}' cannot be descended into (path '{}')",
                table, segment, p
            ),
            path: Some(p),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        let p = path.into();
        Self {
            code: PlannerErrorCode::SearchPlanInvalidPath,
            message: format!("Invalid path '{}': {}", p, reason.into()),
            path: Some(p),
        }
    }

    /// Create an empty field error
    pub fn empty_field(field: &str) -> Self {
        Self {
            code: PlannerErrorCode::SearchPlanEmptyField,
            message: format!("Field '{}' declares no paths", field),
            path: None,
        }
    }

    /// Create a duplicate field error
    pub fn duplicate_field(entity: &str, field: &str) -> Self {
        Self {
            code: PlannerErrorCode::SearchPlanDuplicateField,
            message: format!("Field '{}' is declared twice on entity '{}'", field, entity),
            path: None,
        }
    }

    /// Create a duplicate entity error
    pub fn duplicate_entity(entity: &str) -> Self {
        Self {
            code: PlannerErrorCode::SearchPlanDuplicateEntity,
            message: format!("Entity '{}' is declared twice", entity),
            path: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
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

    /// Returns the offending path if applicable
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl fmt::Display for PlannerError {
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

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
