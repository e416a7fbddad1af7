//! CLI command definitions.
//!
//! Each subcommand maps to one agentkit operation: running an agent,
//! validating a document, or working with the shared mailbox.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::debug;

use agentkit_agents::{ModularAgent, ReferenceAgent};
use agentkit_core::AgentConfig;
use agentkit_mailbox::DEFAULT_MAILBOX_ROOT;
use agentkit_schema::SchemaGateway;

pub mod inbox;
pub mod run;
pub mod send;
pub mod serve;
pub mod skills;
pub mod validate;

/// agentkit - modular agents with schema-validated messaging
#[derive(Parser)]
#[command(name = "agentkit")]
#[command(version, about = "agentkit - modular agents with schema-validated messaging")]
#[command(long_about = r#"
agentkit runs modular agents built from skills and workflows, validates their
output against JSON schemas, and lets agents exchange messages through a
file-based mailbox.

COMMANDS:
  run       → Run a reference agent's workflow and print its output
  validate  → Validate a JSON document against a schema
  send      → Send a message from one agent to another
  inbox     → Receive (or peek at) an agent's messages
  serve     → Answer every pending request in an agent's inbox
  skills    → List an agent's skills and workflows

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or unknown name
  3 - Validation failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Root directory of the shared mailbox
    #[arg(long, global = true, env = "AGENTKIT_MAILBOX_ROOT", default_value = DEFAULT_MAILBOX_ROOT)]
    pub mailbox_root: PathBuf,

    /// Directory searched for schemas before the bundled ones
    #[arg(long, global = true, env = "AGENTKIT_SCHEMAS_DIR")]
    pub schemas_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            mailbox_root: self.mailbox_root.clone(),
            schemas_dir: self.schemas_dir.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a reference agent
    Run(run::RunArgs),

    /// Validate a JSON document against a schema
    Validate(validate::ValidateArgs),

    /// Send a message between agents
    Send(send::SendArgs),

    /// Receive an agent's messages
    Inbox(inbox::InboxArgs),

    /// Answer pending requests for an agent
    Serve(serve::ServeArgs),

    /// List an agent's skills and workflows
    Skills(skills::SkillsArgs),
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mailbox_root: PathBuf,
    pub schemas_dir: Option<PathBuf>,
}

impl Settings {
    /// One gateway per invocation, shared by everything the command builds.
    pub fn gateway(&self) -> Arc<SchemaGateway> {
        match &self.schemas_dir {
            Some(dir) => Arc::new(SchemaGateway::new(dir)),
            None => Arc::new(SchemaGateway::bundled()),
        }
    }
}

/// Errors raised by argument handling itself.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument {argument}: {message}")]
    InvalidArgument { argument: String, message: String },
}

impl CliError {
    pub fn invalid(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }
}

/// Parse a JSON object given on the command line.
pub fn json_object(argument: &str, raw: &str) -> Result<serde_json::Map<String, serde_json::Value>, CliError> {
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::invalid(argument, "expected a JSON object")),
        Err(e) => Err(CliError::invalid(argument, e.to_string())),
    }
}

/// Build a reference agent, optionally from a config file.
pub fn build_agent(
    name: &str,
    config: Option<&Path>,
    settings: &Settings,
) -> anyhow::Result<(ReferenceAgent, ModularAgent)> {
    let kind: ReferenceAgent = name.parse()?;
    let config = match config {
        Some(path) => Some(AgentConfig::load(path)?),
        None => None,
    };
    debug!("Building {} (config override: {})", kind, config.is_some());
    let agent = kind.build(config, settings.gateway());
    Ok((kind, agent))
}
