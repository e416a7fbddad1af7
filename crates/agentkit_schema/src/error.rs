//! Error types for the schema gateway.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while loading schemas or enforcing them.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Invalid schema name: {0}")]
    InvalidName(String),

    #[error("Schema {name} could not be compiled: {message}")]
    InvalidSchema { name: String, message: String },

    #[error("Schema {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Validation failed:\n{}", .0.join("\n"))]
    ValidationFailed(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    /// The individual violation messages, if this is a validation failure.
    pub fn violations(&self) -> &[String] {
        match self {
            Self::ValidationFailed(errors) => errors,
            _ => &[],
        }
    }
}
