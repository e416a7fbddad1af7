//! Inbox command - Receive an agent's messages.

use anyhow::Result;
use clap::Args;

use agentkit_mailbox::Mailbox;

use super::Settings;

#[derive(Args)]
pub struct InboxArgs {
    /// Agent whose inbox to read
    agent: String,

    /// Leave messages in the inbox
    #[arg(long)]
    peek: bool,
}

pub fn execute(args: InboxArgs, settings: &Settings) -> Result<()> {
    let mailbox = Mailbox::open(&settings.mailbox_root, &args.agent, settings.gateway())?;
    let messages = mailbox.receive(!args.peek)?;

    println!("{}", serde_json::to_string_pretty(&messages)?);
    eprintln!(
        "📬 {} message(s) for {}{}",
        messages.len(),
        args.agent,
        if args.peek { " (left unread)" } else { "" }
    );
    Ok(())
}
