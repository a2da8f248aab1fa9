//! Error types module
//!
//! All failures that cross a crate boundary are expressed as [`AppError`]. The
//! variants separate "asset absent" from "asset exists but is not yours" from
//! "malformed input", and wrap infrastructure failures (repository, storage,
//! image analysis, similarity hashing, job queue) in catch-all variants.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// by an outer transport layer.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Similarity hashing error: {0}")]
    Similarity(String),

    #[error("Job queue error: {0}")]
    Queue(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid display order: {0}")]
    InvalidDisplayOrder(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid thumbnail state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, true, LogLevel::Error),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, true, LogLevel::Error),
        AppError::ImageProcessing(_) => {
            (400, "IMAGE_PROCESSING_ERROR", false, false, LogLevel::Warn)
        }
        AppError::Similarity(_) => (500, "SIMILARITY_ERROR", true, true, LogLevel::Error),
        AppError::Queue(_) => (503, "QUEUE_ERROR", true, true, LogLevel::Warn),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, false, LogLevel::Debug),
        AppError::Unauthorized(_) => (403, "UNAUTHORIZED", false, false, LogLevel::Debug),
        AppError::InvalidFileType(_) => (415, "INVALID_FILE_TYPE", false, false, LogLevel::Debug),
        AppError::FileTooLarge { .. } => (413, "FILE_TOO_LARGE", false, false, LogLevel::Debug),
        AppError::InvalidDisplayOrder(_) => {
            (400, "INVALID_DISPLAY_ORDER", false, false, LogLevel::Debug)
        }
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, false, LogLevel::Debug),
        AppError::InvalidStateTransition { .. } => {
            (409, "INVALID_STATE_TRANSITION", false, false, LogLevel::Debug)
        }
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", true, true, LogLevel::Error)
        }
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::Similarity(_) => "Similarity",
            AppError::Queue(_) => "Queue",
            AppError::NotFound(_) => "NotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::InvalidFileType(_) => "InvalidFileType",
            AppError::FileTooLarge { .. } => "FileTooLarge",
            AppError::InvalidDisplayOrder(_) => "InvalidDisplayOrder",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::InvalidStateTransition { .. } => "InvalidStateTransition",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Similarity(_) => "Failed to compare images".to_string(),
            AppError::Queue(_) => "Background processing is unavailable".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::ImageProcessing(ref msg)
            | AppError::NotFound(ref msg)
            | AppError::Unauthorized(ref msg)
            | AppError::InvalidFileType(ref msg)
            | AppError::InvalidDisplayOrder(ref msg)
            | AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::FileTooLarge { size, max } => {
                format!("File is {} bytes; the limit is {} bytes", size, max)
            }
            AppError::InvalidStateTransition { from, to } => {
                format!("Thumbnails cannot move from {} to {}", from, to)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_not_found_unauthorized_and_input_are_distinct() {
        let not_found = AppError::NotFound("Asset not found".to_string());
        let not_owned = AppError::Unauthorized("Asset belongs to another tenant".to_string());
        let malformed = AppError::InvalidDisplayOrder("length mismatch".to_string());

        assert_eq!(not_found.http_status_code(), 404);
        assert_eq!(not_owned.http_status_code(), 403);
        assert_eq!(malformed.http_status_code(), 400);
        assert_ne!(not_found.error_code(), not_owned.error_code());
        assert_ne!(not_owned.error_code(), malformed.error_code());
        assert_eq!(not_found.client_message(), "Asset not found");
    }

    #[test]
    fn test_file_too_large_message() {
        let err = AppError::FileTooLarge {
            size: 11_000_000,
            max: 10_485_760,
        };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "FILE_TOO_LARGE");
        assert!(err.client_message().contains("11000000"));
        assert!(err.client_message().contains("10485760"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("disk unplugged").context("saving original"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error with source"));
        assert!(details.contains("Caused by"));
        assert_eq!(err.error_type(), "Internal");
    }
}
