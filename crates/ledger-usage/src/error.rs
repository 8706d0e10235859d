//! Error types for usage ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Usage ingestion errors.
///
/// Only whole-source failures surface as errors. A single bad line or row is
/// skipped where it is read and never becomes a `UsageError`.
#[derive(Error, Debug)]
pub enum UsageError {
    /// Database error (relational store)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON parsing error (whole-document formats)
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (file reading)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Expected file or directory is missing
    #[error("source not found: {}", path.display())]
    SourceUnavailable {
        /// Path that was expected to exist
        path: PathBuf,
    },

    /// A background parse task panicked or was cancelled
    #[error("parse task failed: {0}")]
    Task(String),
}

impl UsageError {
    /// Check if this error means the source simply is not installed.
    pub fn is_source_missing(&self) -> bool {
        match self {
            UsageError::SourceUnavailable { .. } => true,
            UsageError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Create a user-friendly message for this error.
    pub fn friendly_message(&self) -> String {
        match self {
            UsageError::Database(e) => {
                let msg = e.to_string().to_lowercase();
                if msg.contains("locked") || msg.contains("busy") {
                    "Database is locked by the application that owns it. Try again shortly."
                        .to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            UsageError::Io(e) => {
                let msg = e.to_string().to_lowercase();
                if msg.contains("permission") {
                    "Permission denied. Check file permissions.".to_string()
                } else if e.kind() == std::io::ErrorKind::NotFound {
                    "File or directory not found.".to_string()
                } else {
                    format!("File system error: {}", e)
                }
            }
            UsageError::SourceUnavailable { path } => {
                format!("No usage data at {}", path.display())
            }
            _ => format!("Error: {}", self),
        }
    }
}

impl From<tokio::task::JoinError> for UsageError {
    fn from(e: tokio::task::JoinError) -> Self {
        UsageError::Task(e.to_string())
    }
}

/// Result type for usage ingestion.
pub type Result<T> = std::result::Result<T, UsageError>;
