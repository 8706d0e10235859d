//! Error types shared by the tokenledger crates.
//!
//! [`LedgerError`] covers the plumbing around the usage engine: configuration,
//! filesystem access and logging setup. Source parsing has its own error type
//! in `ledger-usage`, since a broken source never takes the rest down with it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`LedgerError`].
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error type for configuration, I/O and setup failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file not found at an explicitly requested path
    #[error("Configuration not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file is invalid YAML
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Home directory could not be determined
    #[error("Could not determine home directory")]
    HomeDirUnknown,

    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in tokenledger)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LedgerError {
    /// Create a ConfigNotFound error with source
    pub fn config_not_found_with_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: Some(source),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. } | Self::ConfigInvalid { .. } | Self::ConfigValidation { .. }
        )
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound { .. } => {
                Some("Check the --config path or unset TOKENLEDGER_CONFIG to use defaults")
            }
            Self::ConfigInvalid { .. } => Some("Check YAML syntax in the configuration file"),
            Self::HomeDirUnknown => Some("Set HOME or pass --home to point at your home directory"),
            Self::DirectoryCreation { .. } => Some("Pass --log-dir with a writable directory"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_error() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = LedgerError::config_not_found_with_source(
            "/home/user/.config/tokenledger/config.yaml",
            source,
        );
        assert!(err.to_string().contains("Configuration not found"));
        assert!(err.is_config_error());
        assert!(err.guidance().is_some());
    }

    #[test]
    fn test_io_error_context() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = LedgerError::io("reading config", "/etc/tokenledger.yaml", source);
        assert_eq!(err.to_string(), "I/O error reading config: /etc/tokenledger.yaml");
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_error_guidance() {
        assert_eq!(
            LedgerError::HomeDirUnknown.guidance(),
            Some("Set HOME or pass --home to point at your home directory")
        );
        assert!(LedgerError::internal("bug").guidance().is_none());
    }
}
