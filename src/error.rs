//! Centralized error handling for mdconv
//!
//! Recoverable problems found in a document (malformed HTML, broken links,
//! misplaced cut markers) are reported through the [`Logger`](crate::logger::Logger)
//! and never become an `Error`. This type covers what stops the current
//! document: I/O, configuration, and renderer/parser invariant violations.

use log::warn;
use std::fmt;
use std::io;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Custom Result Type Alias
// ─────────────────────────────────────────────────────────────────────────────

/// A specialized `Result` type for the converter.
pub type Result<T> = std::result::Result<T, Error>;

/// The centralized error type for the converter.
#[derive(Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // File I/O Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic I/O error wrapper
    Io(io::Error),

    /// Failed to write a converted document
    FileWrite { path: PathBuf, source: io::Error },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to read an options or remap file
    ConfigLoad {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Options file contents could not be parsed
    ConfigParse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Conversion Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Parser and renderer disagree about the tree shape
    Invariant(String),

    /// Generic application error with a message
    Application(String),
}

impl Error {
    /// Shorthand for an invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Error::Invariant(message.into())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigParse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Display trait implementation for user-friendly error messages
// ─────────────────────────────────────────────────────────────────────────────
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::FileWrite { path, source } => {
                write!(f, "Failed to write '{}': {}", path.display(), source)
            }
            Error::ConfigLoad { path, source } => {
                write!(f, "Failed to load '{}': {}", path.display(), source)
            }
            Error::ConfigParse { message, .. } => {
                write!(f, "Invalid options format: {}", message)
            }
            Error::Invariant(msg) => write!(f, "Internal converter error: {}", msg),
            Error::Application(msg) => write!(f, "{}", msg),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// std::error::Error trait implementation for error chaining
// ─────────────────────────────────────────────────────────────────────────────
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::FileWrite { source, .. } => Some(source),
            Error::ConfigLoad { source, .. } => Some(source.as_ref()),
            Error::ConfigParse { source, .. } => source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::Invariant(_) | Error::Application(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful Degradation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for Result to support graceful degradation.
pub trait ResultExt<T> {
    /// If the result is an error, log it at warning level and return the provided default.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("{}: {}. Using default.", context, err);
                default
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("= broken");
        let err = Error::from(parsed.unwrap_err());
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert!(err.to_string().starts_with("Invalid options format"));
    }

    #[test]
    fn test_invariant_display() {
        let err = Error::invariant("end tag listed as content");
        assert_eq!(
            err.to_string(),
            "Internal converter error: end tag listed as content"
        );
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as StdError;
        let err = Error::FileWrite {
            path: PathBuf::from("/out/doc.habr.md"),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        };
        assert!(err.source().is_some());
        assert!(Error::Application("x".to_string()).source().is_none());
    }

    #[test]
    fn test_unwrap_or_warn_default() {
        let ok: Result<i32> = Ok(7);
        assert_eq!(ok.unwrap_or_warn_default(0, "ctx"), 7);
        let err: Result<i32> = Err(Error::Application("bad".to_string()));
        assert_eq!(err.unwrap_or_warn_default(0, "ctx"), 0);
    }
}
