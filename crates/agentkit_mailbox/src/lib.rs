//! # agentkit_mailbox
//!
//! File-based message delivery between agents, plus the standard output
//! envelope every agent returns.
//!
//! Every envelope passes through a shared [`SchemaGateway`] before it is
//! written or handed back to a caller; a rejected envelope leaves no trace on
//! disk.
//!
//! [`SchemaGateway`]: agentkit_schema::SchemaGateway

pub mod envelope;
pub mod error;
pub mod mailbox;
pub mod output;

pub use envelope::{Message, MessageType};
pub use error::{MailboxError, MailboxResult};
pub use mailbox::{Mailbox, DEFAULT_MAILBOX_ROOT};
pub use output::{
    AgentInfo, AgentOutput, ExecutionInfo, ExecutionStatus, Finding, Findings, NextActions,
    OutputBuilder, Priority, Recommendation, Severity, OUTPUT_SCHEMA_VERSION,
};
