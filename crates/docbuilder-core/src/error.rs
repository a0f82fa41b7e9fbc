//! Shared classified error taxonomy.
//!
//! Every crate in the workspace returns this `Error` type (or a
//! `thiserror` enum that converts into it at a crate boundary) rather
//! than ad-hoc string errors, so CLI and HTTP callers can render a
//! consistent, classified response regardless of which component
//! failed.

use std::collections::BTreeMap;
use std::fmt;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// Bad input or configuration supplied by a user; safe to show verbatim.
    Validation,
    /// A mutating operation addressed an entity that doesn't exist.
    NotFound,
    /// Config sections are individually valid but mutually inconsistent.
    Configuration,
    /// An invariant was violated inside the core (store corruption, logic bug).
    Internal,
    /// A retryable remote-I/O failure (VCS fetch, HTTP).
    Network,
    /// Credential or signature verification failure.
    Auth,
    /// An operation exceeded its deadline.
    Timeout,
    /// Cooperative cancellation was observed.
    Canceled,
    /// Two docs files mapped to the same output path.
    PathCollision,
}

impl ErrorCategory {
    /// Whether this category is safe to retry automatically.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorCategory::Network)
    }

    /// Whether this category should abort the whole build rather than
    /// being accumulated as a per-repository failure.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorCategory::Configuration | ErrorCategory::PathCollision | ErrorCategory::Internal
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Canceled => "canceled",
            ErrorCategory::PathCollision => "path_collision",
        };
        f.write_str(s)
    }
}

/// Severity independent of category (a `Validation` error can still be
/// merely informational in a dry run, for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Fatal,
}

/// A classified, contextualized error shared across the workspace.
#[derive(Debug)]
pub struct Error {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub message: String,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    pub context: BTreeMap<String, String>,
}

impl Error {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        let severity = if category.is_fatal() {
            ErrorSeverity::Fatal
        } else {
            ErrorSeverity::Error
        };
        Self {
            category,
            severity,
            message: message.into(),
            cause: None,
            context: BTreeMap::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, message)
    }

    pub fn path_collision(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::PathCollision, message)
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Canceled, message)
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)?;
        if !self.context.is_empty() {
            write!(f, " (")?;
            for (i, (k, v)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{k}={v}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::internal(format!("io error: {e}")).with_cause(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::internal(format!("serialization error: {e}")).with_cause(e)
    }
}

/// Result type used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_and_context() {
        let err = Error::validation("bad port").with_context("port", "0");
        let s = err.to_string();
        assert!(s.contains("validation"));
        assert!(s.contains("bad port"));
        assert!(s.contains("port=0"));
    }

    #[test]
    fn fatal_categories_abort_the_build() {
        assert!(ErrorCategory::Configuration.is_fatal());
        assert!(ErrorCategory::PathCollision.is_fatal());
        assert!(ErrorCategory::Internal.is_fatal());
        assert!(!ErrorCategory::Network.is_fatal());
    }

    #[test]
    fn only_network_is_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
    }

    #[test]
    fn default_severity_tracks_fatality() {
        assert_eq!(Error::configuration("x").severity, ErrorSeverity::Fatal);
        assert_eq!(Error::validation("x").severity, ErrorSeverity::Error);
    }
}
