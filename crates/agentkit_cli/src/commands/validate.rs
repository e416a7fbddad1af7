//! Validate command - Validate a JSON document against a schema.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::Value;
use tracing::info;

use agentkit_schema::{SchemaError, AGENT_OUTPUT_SCHEMA};

use super::Settings;

#[derive(Args)]
pub struct ValidateArgs {
    /// JSON document to validate
    file: PathBuf,

    /// Schema file name
    #[arg(short, long, default_value = AGENT_OUTPUT_SCHEMA)]
    schema: String,
}

pub fn execute(args: ValidateArgs, settings: &Settings) -> Result<()> {
    info!("Validating {:?} against {}", args.file, args.schema);

    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let instance: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;

    let report = settings.gateway().validate(&instance, &args.schema)?;
    if report.valid {
        println!("✅ {} is valid against {}", args.file.display(), args.schema);
        return Ok(());
    }

    println!("❌ {} is invalid against {}:", args.file.display(), args.schema);
    for error in &report.errors {
        println!("   - {}", error);
    }
    Err(SchemaError::ValidationFailed(report.errors).into())
}
