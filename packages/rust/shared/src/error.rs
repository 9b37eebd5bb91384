//! Error types for SEO Studio.
//!
//! Library crates use [`SeoStudioError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Prefix marking a generation result as a failure rather than content.
pub const ERROR_MARKER: &str = "Error:";

/// Top-level error type for all SEO Studio operations.
#[derive(Debug, thiserror::Error)]
pub enum SeoStudioError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during crawl or metadata fetch.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or response decoding error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Every model identifier in the preference list failed to construct.
    #[error("no model backend available (tried: {tried})")]
    NoBackendAvailable { tried: String },

    /// A single model call failed (network, quota, malformed response).
    #[error("generation failed: {0}")]
    Generation(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unknown row index, bad input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Export serialization error.
    #[error("export error: {0}")]
    Export(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SeoStudioError>;

impl SeoStudioError {
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

    /// Render this error as an inline `Error: ...` cell value.
    pub fn to_marker(&self) -> String {
        format!("{ERROR_MARKER} {self}")
    }
}

/// Whether a generated value is a degraded error message rather than content.
pub fn is_error_marker(text: &str) -> bool {
    text.starts_with(ERROR_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_starts_with_prefix() {
        let err = SeoStudioError::Generation("quota exceeded".into());
        let marker = err.to_marker();
        assert!(is_error_marker(&marker));
        assert!(marker.contains("quota exceeded"));
    }

    #[test]
    fn plain_text_is_not_marker() {
        assert!(!is_error_marker("Круиз по Волге"));
        assert!(!is_error_marker(" Error: leading space"));
    }

    #[test]
    fn no_backend_lists_tried_models() {
        let err = SeoStudioError::NoBackendAvailable {
            tried: "a, b".into(),
        };
        assert_eq!(err.to_string(), "no model backend available (tried: a, b)");
    }
}
