//! Security scanner reference agent.
//!
//! The scanner performs:
//! - Source file discovery under the context's `target`
//! - Hardcoded secret detection (keys, passwords, private keys)
//! - Insecure pattern detection (dynamic code execution, HTML injection)
//! - A summary with a 0-100 security score
//!
//! The rule sets are illustrative rather than exhaustive.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use agentkit_core::{AgentConfig, Context, Skill, SkillCatalog, Workflow};
use agentkit_mailbox::{Finding, Severity};
use agentkit_schema::{SchemaGateway, SECURITY_FINDINGS_SCHEMA};

use crate::agent::ModularAgent;
use crate::scan::{self, LineIssue, LineRule};

pub const AGENT_NAME: &str = "security-scanner";

/// Discover, scan for secrets and insecure patterns, summarize.
pub const FULL_AUDIT: &str = "full_security_audit";

/// Discover and scan for secrets only.
pub const SECRETS_ONLY: &str = "secrets_scan";

const DEFAULT_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "py", "rs", "go", "java", "rb", "php", "html", "env", "json",
    "yaml", "yml", "toml",
];

fn secret_rules() -> Result<Vec<LineRule>, regex::Error> {
    Ok(vec![
        LineRule::new(
            "aws_access_key",
            Severity::Critical,
            "AWS access key id in source",
            r"AKIA[0-9A-Z]{16}",
        )?,
        LineRule::new(
            "private_key",
            Severity::Critical,
            "Private key in source",
            r"-----BEGIN (RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----",
        )?,
        LineRule::new(
            "hardcoded_password",
            Severity::High,
            "Hardcoded password",
            r#"(?i)\b(password|passwd|pwd)\s*[:=]\s*["'][^"'$]{4,}["']"#,
        )?,
        LineRule::new(
            "api_key",
            Severity::High,
            "Hardcoded API key or secret",
            r#"(?i)\b(api[_-]?key|secret[_-]?key|access[_-]?token)\s*[:=]\s*["'][A-Za-z0-9_\-]{16,}["']"#,
        )?,
    ])
}

fn pattern_rules() -> Result<Vec<LineRule>, regex::Error> {
    Ok(vec![
        LineRule::new(
            "eval_usage",
            Severity::High,
            "eval() allows dynamic code execution (CWE-95)",
            r"\beval\s*\(",
        )?,
        LineRule::new(
            "function_constructor",
            Severity::High,
            "Function constructor allows dynamic code execution (CWE-95)",
            r"\bnew\s+Function\s*\(",
        )?,
        LineRule::new(
            "inner_html",
            Severity::Medium,
            "Direct innerHTML assignment (CWE-79)",
            r"\.innerHTML\s*=",
        )?,
        LineRule::new(
            "dangerously_set_inner_html",
            Severity::Medium,
            "dangerouslySetInnerHTML injection point (CWE-79)",
            r"dangerouslySetInnerHTML\s*=",
        )?,
        LineRule::new(
            "insecure_url",
            Severity::Low,
            "Plain HTTP URL",
            r#"http://[^\s"'<>]*[A-Za-z]"#,
        )?,
    ])
}

fn penalty(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 25,
        Severity::High => 10,
        Severity::Medium => 5,
        Severity::Low => 1,
        Severity::Info => 0,
    }
}

/// 100 minus a per-severity penalty for every issue, floored at 0.
pub fn security_score(issues: &[LineIssue]) -> u32 {
    let total: u32 = issues.iter().map(|i| penalty(i.severity)).sum();
    100u32.saturating_sub(total)
}

fn count(issues: &[LineIssue], severity: Severity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

fn discover_files(context: &mut Context) -> anyhow::Result<Value> {
    let root = scan::target(context);
    if !root.is_dir() {
        anyhow::bail!("target {:?} is not a directory", root);
    }
    let extensions = scan::extensions(context, DEFAULT_EXTENSIONS);
    let files = scan::discover(&root, &extensions, scan::max_files(context));
    info!("Discovered {} file(s) under {:?}", files.len(), root);

    let files: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
    Ok(json!({ "files_scanned": files.len(), "files": files }))
}

fn scan_secrets(context: &mut Context) -> anyhow::Result<Value> {
    let files = scan::paths(context, "files")?;
    let issues = scan::scan_lines(&files, &secret_rules()?);
    Ok(json!({ "secret_issues": issues }))
}

fn scan_insecure_patterns(context: &mut Context) -> anyhow::Result<Value> {
    let files = scan::paths(context, "files")?;
    let issues = scan::scan_lines(&files, &pattern_rules()?);
    Ok(json!({ "pattern_issues": issues }))
}

fn summarize_security(context: &mut Context) -> anyhow::Result<Value> {
    let mut issues = scan::issues(context, "secret_issues")?;
    issues.extend(scan::issues(context, "pattern_issues")?);
    issues.sort_by(|a, b| {
        (a.severity, &a.file, a.line).cmp(&(b.severity, &b.file, b.line))
    });

    let files_scanned = context
        .get("files_scanned")
        .and_then(Value::as_u64)
        .unwrap_or_default();

    Ok(json!({
        "security_issues": issues,
        "security_score": security_score(&issues),
        "files_scanned": files_scanned,
        "critical_count": count(&issues, Severity::Critical),
        "high_count": count(&issues, Severity::High),
        "medium_count": count(&issues, Severity::Medium),
        "low_count": count(&issues, Severity::Low),
    }))
}

/// The scanner's skills with their metadata.
pub fn core_skills() -> Vec<Skill> {
    vec![
        Skill::new("discover_files", discover_files)
            .with_description("Walk the target directory and list source files")
            .with_category("security")
            .require_tool("read"),
        Skill::new("scan_secrets", scan_secrets)
            .with_description("Detect hardcoded keys, passwords and private keys")
            .with_category("security")
            .require_tool("grep"),
        Skill::new("scan_insecure_patterns", scan_insecure_patterns)
            .with_description("Detect eval, HTML injection points and plain HTTP URLs")
            .with_category("security")
            .require_tool("grep"),
        Skill::new("summarize_security", summarize_security)
            .with_description("Merge findings and compute the security score")
            .with_category("security"),
    ]
}

/// Built-in workflows; declarations may add more.
pub fn workflows() -> Vec<Workflow> {
    vec![
        Workflow::new(FULL_AUDIT)
            .with_description("Complete security audit of a source tree")
            .skills([
                "discover_files",
                "scan_secrets",
                "scan_insecure_patterns",
                "summarize_security",
            ]),
        Workflow::new(SECRETS_ONLY)
            .with_description("Secret detection only")
            .skills(["discover_files", "scan_secrets", "summarize_security"]),
    ]
}

/// Make the scanner's skills available to skill declarations.
pub fn register(catalog: &mut SkillCatalog) {
    for skill in core_skills() {
        catalog.insert(skill.name.clone(), Arc::new(skill));
    }
}

/// Output findings for every issue in the summary.
pub fn extract_findings(context: &Context) -> Vec<Finding> {
    scan::issues(context, "security_issues")
        .unwrap_or_default()
        .iter()
        .map(Finding::from)
        .collect()
}

pub fn default_config() -> AgentConfig {
    let mut config = AgentConfig::new(
        AGENT_NAME,
        "Scans source trees for hardcoded secrets and insecure code patterns",
    )
    .with_category("security");
    config.tools = vec!["read".to_string(), "grep".to_string()];
    config
}

/// Build the scanner. Results are checked against the security findings schema.
pub fn build(config: AgentConfig, catalog: &SkillCatalog, gateway: Arc<SchemaGateway>) -> ModularAgent {
    ModularAgent::with_workflows(config, catalog, core_skills(), workflows(), gateway)
        .with_results_schema(SECURITY_FINDINGS_SCHEMA)
        .with_finding_extractor(extract_findings)
}
