//! Run command - Run a reference agent's workflow.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;
use tracing::info;

use agentkit_core::Context;
use agentkit_mailbox::ExecutionStatus;

use super::{build_agent, json_object, Settings};

#[derive(Args)]
pub struct RunArgs {
    /// Agent to run (security-scanner, seo-auditor, performance-auditor)
    agent: String,

    /// Workflow to run; defaults to the agent's main workflow
    #[arg(short, long)]
    workflow: Option<String>,

    /// Run every registered skill instead of a workflow
    #[arg(long, conflicts_with = "workflow")]
    all_skills: bool,

    /// Directory the agent works on
    #[arg(short, long, default_value = ".")]
    target: PathBuf,

    /// Extra context as a JSON object
    #[arg(long)]
    context: Option<String>,

    /// Agent config file (YAML or Markdown with front matter)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the output JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn execute(args: RunArgs, settings: &Settings) -> Result<()> {
    let (kind, agent) = build_agent(&args.agent, args.config.as_deref(), settings)?;

    let mut context = match &args.context {
        Some(raw) => json_object("--context", raw)?,
        None => Context::new(),
    };
    context.insert("target".to_string(), json!(args.target.display().to_string()));

    let workflow = if args.all_skills {
        None
    } else {
        Some(args.workflow.as_deref().unwrap_or(kind.default_workflow()))
    };

    let output = agent.run(workflow, context)?;
    let rendered = serde_json::to_string_pretty(&output)?;

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &rendered)?;
            info!("Output written to {:?}", path);
        }
        None => println!("{}", rendered),
    }

    eprintln!(
        "{} {}: {} issue(s), {} warning(s)",
        match output.execution.status {
            ExecutionStatus::Success => "✅",
            ExecutionStatus::Partial => "⚠️ ",
            ExecutionStatus::Failure => "❌",
        },
        agent.name(),
        output.findings.issues.len(),
        output.findings.warnings.len()
    );

    if output.execution.status == ExecutionStatus::Failure {
        anyhow::bail!(
            "Agent '{}' failed: {}",
            agent.name(),
            output
                .findings
                .issues
                .first()
                .map(|f| f.message.as_str())
                .unwrap_or("unknown error")
        );
    }
    Ok(())
}
