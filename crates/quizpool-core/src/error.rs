//! Error types for quizpool operations.
//!
//! Every fallible engine and store operation returns [`QuizResult`]. The
//! enum keeps a stable [`ErrorCode`] per variant so callers can branch on
//! the failure class (bad input, missing record, name clash, storage) without
//! matching on message text.
//!
//! Two outcomes are deliberately *not* errors: per-question problems found
//! while importing a course (reported as [`crate::course::ValidationIssue`])
//! and "no question available right now" (reported as `None` by the
//! scheduler).

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for quizpool operations.
pub type QuizResult<T> = Result<T, QuizError>;

/// Main error type for all quizpool operations.
#[derive(Error, Debug)]
pub enum QuizError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// A course, question or the configuration record does not exist.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        resource: Option<String>,
    },

    /// The operation collides with existing data (e.g. duplicate course name).
    #[error("Conflict: {message}")]
    Conflict { message: String, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValInvalidConfig,
    ValInvalidFormat,
    ValInvalidAnswer,

    // Not found (NF_xxx)
    NfCourse,
    NfQuestion,
    NfConfig,

    // Conflict (CONF_xxx)
    ConfDuplicateCourse,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValInvalidConfig => "VAL_002",
            ErrorCode::ValInvalidFormat => "VAL_003",
            ErrorCode::ValInvalidAnswer => "VAL_004",
            ErrorCode::NfCourse => "NF_001",
            ErrorCode::NfQuestion => "NF_002",
            ErrorCode::NfConfig => "NF_003",
            ErrorCode::ConfDuplicateCourse => "CONF_001",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl QuizError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with a specific code.
    pub fn validation_with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create an invalid-configuration error naming the offending field.
    pub fn invalid_config(field: &str, message: impl Into<String>) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.to_string());
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidConfig,
            details,
            suggestion: None,
        }
    }

    /// Create a not found error for a course.
    pub fn course_not_found(course_id: impl Into<String>) -> Self {
        let id = course_id.into();
        Self::NotFound {
            message: format!("Course with id '{}' not found", id),
            code: ErrorCode::NfCourse,
            resource: Some(id),
        }
    }

    /// Create a not found error for a question within a course.
    pub fn question_not_found(course_id: &str, question_id: u32) -> Self {
        Self::NotFound {
            message: format!("Question {} not found in course '{}'", question_id, course_id),
            code: ErrorCode::NfQuestion,
            resource: Some(format!("{}/{}", course_id, question_id)),
        }
    }

    /// Create a not found error for the configuration record.
    pub fn config_not_found() -> Self {
        Self::NotFound {
            message: "Engine configuration record is missing".to_string(),
            code: ErrorCode::NfConfig,
            resource: None,
        }
    }

    /// Create a conflict error for a duplicate course name.
    pub fn duplicate_course(name: &str) -> Self {
        Self::Conflict {
            message: format!("A course named '{}' already exists", name),
            code: ErrorCode::ConfDuplicateCourse,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create an error for a database that could not be opened or
    /// initialized.
    pub fn connection_failed(
        location: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Database {
            message: format!("Failed to open database '{}': {}", location.into(), err),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(err)),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Conflict { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Serialization(_) => ErrorCode::ValInvalidFormat,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error means the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::NotFound { code: ErrorCode::NfCourse, .. } => {
                Some("List courses to check the course id")
            }
            Self::NotFound { .. } => Some("Please check the id and ensure it exists"),
            Self::Conflict { .. } => Some("Choose a different course name or delete the existing course"),
            Self::Database { .. } => Some("Please check the database path and permissions"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for QuizError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = QuizError::validation("Invalid input");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_course_not_found_error() {
        let err = QuizError::course_not_found("abc");
        assert_eq!(err.code(), ErrorCode::NfCourse);
        assert!(err.is_not_found());
        assert!(err.suggestion().is_some());
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_duplicate_course_is_conflict() {
        let err = QuizError::duplicate_course("Rust");
        assert_eq!(err.code(), ErrorCode::ConfDuplicateCourse);
        assert!(err.to_string().contains("Rust"));
    }

    #[test]
    fn test_invalid_config_carries_field() {
        let err = QuizError::invalid_config("pool_penalty_threshold", "must be > 0");
        match err {
            QuizError::Validation { details, code, .. } => {
                assert_eq!(code, ErrorCode::ValInvalidConfig);
                assert_eq!(details.get("field").map(String::as_str), Some("pool_penalty_threshold"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_connection_failed_keeps_source() {
        let err = QuizError::connection_failed(
            "/nowhere/quiz.db",
            rusqlite::Error::InvalidPath("/nowhere/quiz.db".into()),
        );
        assert_eq!(err.code(), ErrorCode::DbConnectionFailed);
        assert_eq!(err.code().as_str(), "DB_001");
        assert!(err.to_string().contains("/nowhere/quiz.db"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValInvalidInput.as_str(), "VAL_001");
        assert_eq!(ErrorCode::NfCourse.as_str(), "NF_001");
        assert_eq!(ErrorCode::ConfDuplicateCourse.as_str(), "CONF_001");
    }
}
