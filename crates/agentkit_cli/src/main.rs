//! agentkit CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or unknown name
//! - 3: Validation failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use agentkit_agents::AgentError;
use agentkit_core::CoreError;
use agentkit_mailbox::MailboxError;
use agentkit_schema::SchemaError;
use commands::{Cli, CliError, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("agentkit={},warn", level)));

    // Logs go to stderr; stdout carries JSON output.
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let settings = cli.settings();
    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, &settings),
        Commands::Validate(args) => commands::validate::execute(args, &settings),
        Commands::Send(args) => commands::send::execute(args, &settings),
        Commands::Inbox(args) => commands::inbox::execute(args, &settings),
        Commands::Serve(args) => commands::serve::execute(args, &settings),
        Commands::Skills(args) => commands::skills::execute(args, &settings),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn is_validation(e: &anyhow::Error) -> bool {
    if let Some(e) = e.downcast_ref::<SchemaError>() {
        return !e.violations().is_empty();
    }
    if let Some(e) = e.downcast_ref::<MailboxError>() {
        return !e.violations().is_empty();
    }
    if let Some(e) = e.downcast_ref::<AgentError>() {
        return !e.violations().is_empty();
    }
    false
}

fn is_invalid_args(e: &anyhow::Error) -> bool {
    if e.downcast_ref::<CliError>().is_some() {
        return true;
    }
    if let Some(e) = e.downcast_ref::<AgentError>() {
        return e.is_lookup();
    }
    if let Some(e) = e.downcast_ref::<CoreError>() {
        return e.is_lookup() || matches!(e, CoreError::Config { .. });
    }
    if let Some(e) = e.downcast_ref::<SchemaError>() {
        return matches!(e, SchemaError::NotFound(_) | SchemaError::InvalidName(_));
    }
    matches!(
        e.downcast_ref::<MailboxError>(),
        Some(MailboxError::InvalidAgentName(_) | MailboxError::UnknownMessageType(_))
    )
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if is_validation(e) {
        ExitCodes::VALIDATION_FAILURE
    } else if is_invalid_args(e) {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_error() {
        let validation = anyhow::Error::new(SchemaError::ValidationFailed(vec!["$: bad".into()]));
        assert_eq!(categorize_error(&validation), ExitCodes::VALIDATION_FAILURE);

        let rejected = anyhow::Error::new(MailboxError::Validation(vec!["to_agent: bad".into()]));
        assert_eq!(categorize_error(&rejected), ExitCodes::VALIDATION_FAILURE);

        let unknown = anyhow::Error::new(AgentError::UnknownAgent("x".into()));
        assert_eq!(categorize_error(&unknown), ExitCodes::INVALID_ARGS);

        let missing = anyhow::Error::new(AgentError::from(CoreError::WorkflowNotFound("w".into())));
        assert_eq!(categorize_error(&missing), ExitCodes::INVALID_ARGS);

        let io = anyhow::Error::new(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(categorize_error(&io), ExitCodes::GENERAL_ERROR);
    }
}
