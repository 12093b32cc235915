//! Error types for Utilibill.
//!
//! All fallible operations in the library return [`Result`], built on a single
//! [`UtilibillError`] enum:
//!
//! - Use `thiserror` for automatic `Error` trait implementation
//! - Preserve error chains with `#[source]` attributes
//! - Include context in error messages (file paths, config values, etc.)
//!
//! # Error Handling Philosophy
//!
//! **System errors always bubble up unchanged:**
//! - `UtilibillError::Io` (from `std::io::Error`) - file system and permission errors
//!
//! **Application errors are wrapped with context:**
//! - `Parsing` - text-extraction collaborator failures
//! - `Generation` - structured-generation call or payload failures
//! - `Reconciliation` - record merge failures
//! - `Cache` - cache bookkeeping failures (non-fatal, reads degrade to a miss)
//! - `Validation` - invalid configuration, paths, or parameters
use thiserror::Error;

/// Result type alias using `UtilibillError`.
pub type Result<T> = std::result::Result<T, UtilibillError>;

/// Main error type for all Utilibill operations.
#[derive(Debug, Error)]
pub enum UtilibillError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Generation error: {message}")]
    Generation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Reconciliation error: {message}")]
    Reconciliation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<serde_json::Error> for UtilibillError {
    fn from(err: serde_json::Error) -> Self {
        UtilibillError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<csv::Error> for UtilibillError {
    fn from(err: csv::Error) -> Self {
        UtilibillError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for UtilibillError {
    fn from(err: reqwest::Error) -> Self {
        UtilibillError::Generation {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl UtilibillError {
    /// Create a Parsing error
    pub fn parsing<S: Into<String>>(message: S) -> Self {
        Self::Parsing {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Parsing error with source
    pub fn parsing_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parsing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a Generation error
    pub fn generation<S: Into<String>>(message: S) -> Self {
        Self::Generation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Generation error with source
    pub fn generation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Generation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a Reconciliation error
    pub fn reconciliation<S: Into<String>>(message: S) -> Self {
        Self::Reconciliation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }
}
