//! Error types for the mailbox module.

use thiserror::Error;

/// Result type alias for mailbox operations.
pub type MailboxResult<T> = Result<T, MailboxError>;

/// Errors that can occur while sending or receiving envelopes.
#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("Invalid message:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("Invalid agent name: {0:?}")]
    InvalidAgentName(String),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("Schema error: {0}")]
    Schema(#[from] agentkit_schema::SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MailboxError {
    /// The individual violation messages, if the envelope was rejected.
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Validation(errors) => errors,
            Self::Schema(e) => e.violations(),
            _ => &[],
        }
    }
}
