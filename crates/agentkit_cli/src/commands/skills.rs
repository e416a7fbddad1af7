//! Skills command - List an agent's skills and workflows.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::{build_agent, Settings};

#[derive(Args)]
pub struct SkillsArgs {
    /// Agent to inspect
    agent: String,

    /// Agent config file (YAML or Markdown with front matter)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

pub fn execute(args: SkillsArgs, settings: &Settings) -> Result<()> {
    let (_, agent) = build_agent(&args.agent, args.config.as_deref(), settings)?;
    let registry = agent.registry();

    let skills: Vec<_> = registry
        .skill_names()
        .into_iter()
        .filter_map(|name| registry.skill_info(name))
        .collect();
    let workflows: Vec<_> = registry
        .workflow_names()
        .into_iter()
        .filter_map(|name| registry.get_workflow(name))
        .collect();

    if args.json {
        let listing = serde_json::json!({
            "agent": agent.info(),
            "skills": skills,
            "workflows": workflows,
        });
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("🧩 {} v{} ({})", agent.name(), agent.config().version, agent.config().category);
    println!();
    println!("Skills:");
    for skill in &skills {
        let tools = if skill.required_tools.is_empty() {
            String::new()
        } else {
            format!(" [{}]", skill.required_tools.join(", "))
        };
        println!("  {:<28} {}{}", skill.name, skill.description, tools);
    }
    println!();
    println!("Workflows:");
    for workflow in &workflows {
        println!("  {:<28} {}", workflow.name, workflow.skills.join(" → "));
    }

    let skipped = &agent.load_summary().skipped;
    if !skipped.is_empty() {
        println!();
        println!("Skipped declarations:");
        for (source, reason) in skipped {
            println!("  ⚠️  {}: {}", source, reason);
        }
    }
    Ok(())
}
