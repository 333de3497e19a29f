//! Error types for helpsync.
//!
//! Library crates use [`HelpSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all helpsync operations.
#[derive(Debug, thiserror::Error)]
pub enum HelpSyncError {
    /// Configuration loading or validation error (includes missing credentials).
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the catalog or the files API.
    #[error("network error: {0}")]
    Network(String),

    /// JSON or HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Fingerprint store or job log error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty document, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// The indexing service rejected a file.
    #[error("upload error: {0}")]
    Upload(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HelpSyncError>;

impl HelpSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = HelpSyncError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = HelpSyncError::Upload("HTTP 401".into());
        assert_eq!(err.to_string(), "upload error: HTTP 401");
    }

    #[test]
    fn io_error_keeps_path() {
        let err = HelpSyncError::io(
            "/tmp/data/a.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/data/a.md"));
    }
}
