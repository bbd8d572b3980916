//! # Error handling for CodeSpark Core
//!
//! This module provides the unified error type used by every component of the
//! core: path handling, the file tree, editor buffers, the project registry and
//! the AI dispatcher.
//!
//! Errors fall into two families. Local errors ([`Error::InvalidPath`],
//! [`Error::PathConflict`], [`Error::NotFound`], [`Error::PreconditionViolation`],
//! [`Error::Validation`]) come from caller logic and are never retried. External
//! errors ([`Error::BackendUnavailable`], [`Error::AiBackend`]) carry the
//! collaborator's original cause and can be retried by re-issuing the call.

use thiserror::Error;

/// Result type used throughout CodeSpark Core.
///
/// # Example
///
/// ```rust
/// use codespark_core::{Result, Error};
///
/// fn example_function() -> Result<String> {
///     Ok("Success".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CodeSpark Core.
#[derive(Error, Debug)]
pub enum Error {
    /// A path failed canonicalization or a name is not a single segment
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A sibling with the same name already exists
    #[error("Path conflict: '{path}' already exists")]
    PathConflict { path: String },

    /// Not found errors
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The caller broke an operation precondition
    #[error("Precondition violated: {message}")]
    PreconditionViolation { message: String },

    /// Validation errors
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// The file store could not complete a command
    #[error("Backend unavailable during {operation}: {cause}")]
    BackendUnavailable { operation: String, cause: String },

    /// The AI backend failed to produce a response
    #[error("AI backend error during {intent}: {cause}")]
    AiBackend { intent: String, cause: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Event system errors
    #[error("Event error: {message}")]
    Event { message: String },

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization/deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with custom message
    #[error("Error: {message}")]
    Generic { message: String },
}

impl Error {
    /// Create a new invalid path error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use codespark_core::Error;
    ///
    /// let error = Error::invalid_path("/src/..", "'..' segments are not allowed");
    /// assert!(error.is_invalid_path());
    /// ```
    pub fn invalid_path<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new path conflict error.
    pub fn path_conflict<S: Into<String>>(path: S) -> Self {
        Self::PathConflict { path: path.into() }
    }

    /// Create a new not found error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use codespark_core::Error;
    ///
    /// let error = Error::not_found("File '/src/main.rs'");
    /// assert!(error.is_not_found());
    /// ```
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a new precondition violation.
    pub fn precondition<S: Into<String>>(message: S) -> Self {
        Self::PreconditionViolation {
            message: message.into(),
        }
    }

    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use codespark_core::Error;
    ///
    /// let error = Error::validation("name", "Project name cannot be blank");
    /// assert!(error.is_validation());
    /// ```
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap a file store failure.
    ///
    /// The full cause chain of `cause` is kept in the message.
    pub fn backend_unavailable<S: Into<String>>(operation: S, cause: anyhow::Error) -> Self {
        Self::BackendUnavailable {
            operation: operation.into(),
            cause: format!("{:#}", cause),
        }
    }

    /// Wrap an AI backend failure.
    pub fn ai_backend<S: Into<String>>(intent: S, cause: anyhow::Error) -> Self {
        Self::AiBackend {
            intent: intent.into(),
            cause: format!("{:#}", cause),
        }
    }

    /// Create a new configuration error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use codespark_core::Error;
    ///
    /// let error = Error::config("Invalid configuration file format");
    /// assert!(error.is_config());
    /// ```
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new event error.
    pub fn event<S: Into<String>>(message: S) -> Self {
        Self::Event {
            message: message.into(),
        }
    }

    /// Create a new generic error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if this error is an invalid path error.
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, Self::InvalidPath { .. })
    }

    /// Check if this error is a path conflict.
    pub fn is_path_conflict(&self) -> bool {
        matches!(self, Self::PathConflict { .. })
    }

    /// Check if this error is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a precondition violation.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::PreconditionViolation { .. })
    }

    /// Check if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error came from the file store.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }

    /// Check if this error came from the AI backend.
    pub fn is_ai_backend(&self) -> bool {
        matches!(self, Self::AiBackend { .. })
    }

    /// Check if this error is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Check if this error is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Whether re-issuing the same call may succeed.
    ///
    /// Only external collaborator failures are retryable; local errors will
    /// fail the same way every time.
    ///
    /// # Example
    ///
    /// ```rust
    /// use codespark_core::Error;
    ///
    /// let error = Error::backend_unavailable("write_content", anyhow::anyhow!("timeout"));
    /// assert!(error.is_retryable());
    /// assert!(!Error::path_conflict("/src").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. } | Self::AiBackend { .. })
    }

    /// Get the error category as a string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use codespark_core::Error;
    ///
    /// let error = Error::config("Invalid format");
    /// assert_eq!(error.category(), "Config");
    /// ```
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "InvalidPath",
            Self::PathConflict { .. } => "PathConflict",
            Self::NotFound { .. } => "NotFound",
            Self::PreconditionViolation { .. } => "PreconditionViolation",
            Self::Validation { .. } => "Validation",
            Self::BackendUnavailable { .. } => "BackendUnavailable",
            Self::AiBackend { .. } => "AIBackendError",
            Self::Config { .. } => "Config",
            Self::Event { .. } => "Event",
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
            Self::Toml(_) => "TOML",
            Self::Generic { .. } => "Generic",
        }
    }
}

/// Convenience macro for creating errors with context.
///
/// # Example
///
/// ```rust
/// use codespark_core::{error, Error};
///
/// let err = error!("Failed to load {}: {}", "config.toml", "Permission denied");
/// assert_eq!(err.category(), "Generic");
/// ```
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::Error::generic(format!($($arg)*))
    };
}

/// Convenience macro for creating configuration errors.
///
/// # Example
///
/// ```rust
/// use codespark_core::{config_error, Error};
///
/// let err = config_error!("Invalid value for {}: {}", "ai.context_files", "not a number");
/// assert!(err.is_config());
/// ```
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::Error::config(format!($($arg)*))
    };
}

/// Convenience macro for creating precondition violations.
#[macro_export]
macro_rules! precondition {
    ($($arg:tt)*) => {
        $crate::Error::precondition(format!($($arg)*))
    };
}

/// Convert from `anyhow::Error` to our custom error type.
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_local_errors_are_not_retryable() {
        let errors = [
            Error::invalid_path("/a/..", "dot segment"),
            Error::path_conflict("/a"),
            Error::not_found("/a"),
            Error::precondition("closing a dirty buffer"),
            Error::validation("name", "blank"),
        ];
        for error in errors {
            assert!(!error.is_retryable(), "{} should not be retryable", error);
        }
    }

    #[test]
    fn test_external_errors_keep_cause_chain() {
        let cause = anyhow::anyhow!("connection refused").context("PUT /files/7");
        let error = Error::backend_unavailable("write_content", cause);
        assert!(error.is_backend_unavailable());
        assert!(error.is_retryable());
        let text = error.to_string();
        assert!(text.contains("write_content"));
        assert!(text.contains("PUT /files/7"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_ai_backend_category() {
        let error = Error::ai_backend("chat", anyhow::anyhow!("rate limited"));
        assert!(error.is_ai_backend());
        assert_eq!(error.category(), "AIBackendError");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::from(io_error);
        assert!(error.is_io());
        assert_eq!(error.category(), "IO");
    }

    #[test]
    fn test_error_macros() {
        let error = error!("Test {}", "message");
        assert_eq!(error.category(), "Generic");

        let config_err = config_error!("Config {}", "error");
        assert!(config_err.is_config());

        let violation = precondition!("buffer '{}' is dirty", "/a.js");
        assert!(violation.is_precondition());
        assert!(violation.to_string().contains("/a.js"));
    }

    #[test]
    fn test_anyhow_conversion() {
        let anyhow_err = anyhow::anyhow!("Test error");
        let error = Error::from(anyhow_err);
        assert_eq!(error.category(), "Generic");
    }

    #[test]
    fn test_error_display() {
        let error = Error::path_conflict("/src/index.js");
        let display = format!("{}", error);
        assert!(display.contains("Path conflict"));
        assert!(display.contains("/src/index.js"));
    }
}
