//! Send command - Send a message from one agent to another.

use anyhow::Result;
use clap::Args;

use agentkit_mailbox::{Mailbox, MessageType};

use super::{json_object, Settings};

#[derive(Args)]
pub struct SendArgs {
    /// Sending agent
    #[arg(long)]
    from: String,

    /// Receiving agent
    #[arg(long)]
    to: String,

    /// request, response, notification or error
    #[arg(long = "type", default_value = "request")]
    message_type: String,

    /// Payload as a JSON object
    #[arg(long, default_value = "{}")]
    payload: String,

    /// Id of the message this one answers
    #[arg(long)]
    correlation_id: Option<String>,
}

pub fn execute(args: SendArgs, settings: &Settings) -> Result<()> {
    let message_type: MessageType = args.message_type.parse()?;
    let payload = json_object("--payload", &args.payload)?;

    let mailbox = Mailbox::open(&settings.mailbox_root, &args.from, settings.gateway())?;
    let id = mailbox.send(&args.to, message_type, payload, args.correlation_id.as_deref())?;

    println!("{}", id);
    Ok(())
}
