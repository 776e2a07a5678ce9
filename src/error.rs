//! Error handling for xrd-rs
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the application.

use thiserror::Error;

/// Main error type for xrd-rs operations
#[derive(Error, Debug)]
pub enum XrdError {
    /// A store, binding or settings object was set up inconsistently
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A raw value could not be coerced to a column's declared type
    #[error("Cannot convert {value:?} for column {column} to {expected}")]
    Conversion {
        column: usize,
        value: String,
        expected: String,
    },

    /// Markup text could not be translated
    #[error("Markup error: {0}")]
    Markup(String),

    /// Errors related to Rhai script loading or execution
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to project loading
    #[error("Project error: {0}")]
    Project(String),

    /// Errors related to the computation cache
    #[error("Cache error: {0}")]
    Cache(String),

    /// Errors related to the worker pool or a task running on it
    #[error("Worker pool error: {0}")]
    Pool(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<XrdError>,
    },
}

impl XrdError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        XrdError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        XrdError::Script(err.to_string())
    }

    /// Returns the innermost error, skipping any context wrappers
    pub fn root(&self) -> &XrdError {
        match self {
            XrdError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for XrdError {
    fn from(err: serde_json::Error) -> Self {
        XrdError::Serialization(err.to_string())
    }
}

/// Result type alias for xrd-rs operations
pub type Result<T> = std::result::Result<T, XrdError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| XrdError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| XrdError::from_rhai_error(e).with_context(f()))
    }
}
