//! Serve command - Answer pending requests in an agent's inbox.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use agentkit_mailbox::Mailbox;

use super::{build_agent, Settings};

#[derive(Args)]
pub struct ServeArgs {
    /// Agent to serve as
    agent: String,

    /// Agent config file (YAML or Markdown with front matter)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

pub fn execute(args: ServeArgs, settings: &Settings) -> Result<()> {
    let (_, agent) = build_agent(&args.agent, args.config.as_deref(), settings)?;
    let mailbox = Mailbox::open(&settings.mailbox_root, agent.name(), std::sync::Arc::clone(agent.gateway()))?;

    let unhandled = agent.serve_inbox(&mailbox)?;
    for message in &unhandled {
        println!(
            "{} {} from {}",
            message.message_type, message.message_id, message.from_agent
        );
    }
    eprintln!("📭 Inbox served, {} message(s) not handled", unhandled.len());
    Ok(())
}
