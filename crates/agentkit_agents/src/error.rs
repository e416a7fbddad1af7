//! Error types for agents module.

use thiserror::Error;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur during agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Invalid request {message_id}: {message}")]
    InvalidRequest { message_id: String, message: String },

    #[error("Core error: {0}")]
    Core(#[from] agentkit_core::CoreError),

    #[error("Schema error: {0}")]
    Schema(#[from] agentkit_schema::SchemaError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] agentkit_mailbox::MailboxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Create an invalid request error.
    pub fn invalid_request(message_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message_id: message_id.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a failed skill, workflow or agent lookup.
    pub fn is_lookup(&self) -> bool {
        match self {
            Self::UnknownAgent(_) => true,
            Self::Core(e) => e.is_lookup(),
            _ => false,
        }
    }

    /// Schema violations carried by this error, if any.
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Schema(e) => e.violations(),
            Self::Mailbox(e) => e.violations(),
            _ => &[],
        }
    }
}
