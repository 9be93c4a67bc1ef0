//! # Error Types
//!
//! Error types for the School API using `thiserror`.

use std::fmt;

/// Custom result type for School API operations
pub type Result<T> = std::result::Result<T, SchoolApiError>;

/// Main error type for the School API
#[derive(thiserror::Error, Debug)]
pub enum SchoolApiError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database and storage errors (store unavailable, constraint violations)
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Authentication and authorization errors
    #[error("Authentication error: {message}")]
    Auth {
        message: String,
        error_type: AuthErrorType,
    },

    /// Token signing or decoding failures
    #[error("Token error: {context}")]
    Token {
        #[source]
        source: jsonwebtoken::errors::Error,
        context: String,
    },

    /// An operation was invoked out of order
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound {
        resource_type: String,
        id: String,
    },

    /// Internal server errors
    #[error("Internal server error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Authentication error subtypes
#[derive(Debug, Clone, PartialEq)]
pub enum AuthErrorType {
    InvalidToken,
    ExpiredToken,
    MissingToken,
    InsufficientPermissions,
    InvalidCredentials,
}

impl fmt::Display for AuthErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorType::InvalidToken => write!(f, "invalid_token"),
            AuthErrorType::ExpiredToken => write!(f, "expired_token"),
            AuthErrorType::MissingToken => write!(f, "missing_token"),
            AuthErrorType::InsufficientPermissions => write!(f, "insufficient_permissions"),
            AuthErrorType::InvalidCredentials => write!(f, "invalid_credentials"),
        }
    }
}

impl SchoolApiError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S, error_type: AuthErrorType) -> Self {
        Self::Auth { message: message.into(), error_type }
    }

    /// Create an invalid operation error
    pub fn invalid_operation<S: Into<String>>(message: S) -> Self {
        Self::InvalidOperation { message: message.into() }
    }

    /// Create an internal server error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            SchoolApiError::Config { .. } => 500,
            SchoolApiError::Database { .. } => 500,
            SchoolApiError::Io { .. } => 500,
            SchoolApiError::Serialization { .. } => 400,
            SchoolApiError::Validation { .. } => 400,
            SchoolApiError::Auth { error_type: AuthErrorType::InsufficientPermissions, .. } => 403,
            SchoolApiError::Auth { .. } => 401,
            SchoolApiError::Token { .. } => 500,
            SchoolApiError::InvalidOperation { .. } => 500,
            SchoolApiError::NotFound { .. } => 404,
            SchoolApiError::Internal { .. } => 500,
        }
    }

    /// Whether the error is a unique/primary key constraint violation reported by the store
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            SchoolApiError::Database { source, .. } => source
                .as_database_error()
                .map(|db_err| {
                    db_err.is_unique_violation()
                        || db_err.code().is_some_and(|code| {
                            code.as_ref() == "1555"
                                || code.as_ref() == "2067"
                                || code.as_ref().starts_with("SQLITE_CONSTRAINT")
                        })
                })
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for SchoolApiError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for SchoolApiError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for SchoolApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<jsonwebtoken::errors::Error> for SchoolApiError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        Self::Token { source: error, context: "JWT operation failed".to_string() }
    }
}

impl From<config::ConfigError> for SchoolApiError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for SchoolApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        let field = fields.first().map(|(field, _)| field.to_string());
        Self::Validation { message: format!("Validation failed: {}", message), field }
    }
}
