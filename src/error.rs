//! Error types for xmlmodel
//!
//! This module defines all error types used throughout the library.
//! Content-model mismatches are not errors: they are reported as
//! [`ValidationResult`](crate::models::ValidationResult) values.

use std::fmt;
use thiserror::Error;

use crate::scanner::reporter::Severity;

/// Result type alias using xmlmodel Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlmodel operations
#[derive(Error, Debug)]
pub enum Error {
    /// Document validation error
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Declaration parsing error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Fatal lexical error raised by the scanner
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Malformed syntax tree handed to the DFA builder
    #[error("grammar error: {0}")]
    Grammar(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Content validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Path to the element that failed validation
    pub path: Option<String>,
    /// Element declaration that caused the error
    pub declaration: Option<String>,
    /// Index of the offending child, if any
    pub child_index: Option<usize>,
    /// Original reason
    pub reason: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            declaration: None,
            child_index: None,
            reason: None,
        }
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the element declaration
    pub fn with_declaration(mut self, declaration: impl Into<String>) -> Self {
        self.declaration = Some(declaration.into());
        self
    }

    /// Set the index of the offending child
    pub fn with_child_index(mut self, index: usize) -> Self {
        self.child_index = Some(index);
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        if let Some(ref decl) = self.declaration {
            write!(f, "\n\nDeclaration:\n{}", decl)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Declaration parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Offset into the declaration text
    pub location: Option<String>,
    /// Declaration source that caused the error
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nSource:\n{}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// A scan aborted by a report delivered to the error reporter.
///
/// The reporter has already seen the message; this value only unwinds the
/// current scan operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    /// Message key, e.g. `InvalidCharRef`
    pub key: String,
    /// Message arguments
    pub args: Vec<String>,
    /// Severity the error was reported with
    pub severity: Severity,
    /// Line and column of the scanner cursor
    pub location: Option<(usize, usize)>,
}

impl ScanError {
    /// Create a new fatal scan error
    pub fn fatal(key: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            key: key.into(),
            args,
            severity: Severity::Fatal,
            location: None,
        }
    }

    /// Set the cursor location
    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.location = Some((line, column));
        self
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = crate::scanner::reporter::format_message(&self.key, &self.args);
        write!(f, "{}", message)?;

        if let Some((line, column)) = self.location {
            write!(f, " (line {}, column {})", line, column)?;
        }

        Ok(())
    }
}

impl std::error::Error for ScanError {}
