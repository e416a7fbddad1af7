//! SEO auditor reference agent.
//!
//! Audits static HTML pages under the context's `target` for title, meta
//! description, canonical link and Open Graph tags.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use agentkit_core::{AgentConfig, Context, Skill, SkillCatalog, Workflow};
use agentkit_mailbox::{Finding, Severity};
use agentkit_schema::SchemaGateway;

use crate::agent::ModularAgent;
use crate::scan;

pub const AGENT_NAME: &str = "seo-auditor";

/// Discover pages, audit their meta tags, summarize.
pub const META_AUDIT: &str = "seo_meta_audit";

const DEFAULT_EXTENSIONS: &[&str] = &["html", "htm"];

const TITLE_LENGTH: (usize, usize) = (30, 60);
const DESCRIPTION_LENGTH: (usize, usize) = (120, 160);
const REQUIRED_OPEN_GRAPH: &[&str] = &["og:title", "og:description", "og:image", "og:url"];

/// One SEO problem on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageIssue {
    pub rule: String,
    pub severity: Severity,
    pub page: String,
    pub message: String,
    /// Points deducted from the page score
    pub penalty: u32,
}

impl From<&PageIssue> for Finding {
    fn from(issue: &PageIssue) -> Self {
        Finding::new(issue.severity, issue.message.clone())
            .at(issue.page.clone())
            .rule(issue.rule.clone())
    }
}

/// Meta tag audit of a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAudit {
    pub page: String,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical_url: Option<String>,
    pub open_graph: Vec<String>,
    pub issues: Vec<PageIssue>,
}

impl PageAudit {
    /// 100 minus the page's penalties, floored at 0.
    pub fn score(&self) -> u32 {
        let total: u32 = self.issues.iter().map(|i| i.penalty).sum();
        100u32.saturating_sub(total)
    }
}

struct MetaPatterns {
    title: Regex,
    meta: Regex,
    link: Regex,
    attribute: Regex,
}

impl MetaPatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            title: Regex::new(r"(?is)<title[^>]*>(.*?)</title>")?,
            meta: Regex::new(r"(?is)<meta\s[^>]*>")?,
            link: Regex::new(r"(?is)<link\s[^>]*>")?,
            attribute: Regex::new(r#"(?is)([a-z:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
        })
    }

    fn attributes(&self, tag: &str) -> Vec<(String, String)> {
        self.attribute
            .captures_iter(tag)
            .filter_map(|c| {
                let value = c.get(2).or_else(|| c.get(3))?;
                Some((c[1].to_ascii_lowercase(), value.as_str().trim().to_string()))
            })
            .collect()
    }

    fn attribute(&self, tag: &str, name: &str) -> Option<String> {
        self.attributes(tag)
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

fn check_length(
    issues: &mut Vec<PageIssue>,
    page: &str,
    what: &str,
    rule: &str,
    length: usize,
    (min, max): (usize, usize),
) {
    if length < min || length > max {
        issues.push(PageIssue {
            rule: rule.to_string(),
            severity: Severity::Low,
            page: page.to_string(),
            message: format!("{} is {} characters (recommended {}-{})", what, length, min, max),
            penalty: 5,
        });
    }
}

fn audit_page(patterns: &MetaPatterns, page: &str, html: &str) -> PageAudit {
    let mut issues = Vec::new();
    let mut missing = |rule: &str, severity: Severity, message: &str, penalty: u32| {
        issues.push(PageIssue {
            rule: rule.to_string(),
            severity,
            page: page.to_string(),
            message: message.to_string(),
            penalty,
        });
    };

    let title = patterns
        .title
        .captures(html)
        .map(|c| c[1].split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty());

    let mut meta_description = None;
    let mut open_graph = Vec::new();
    for tag in patterns.meta.find_iter(html).map(|m| m.as_str()) {
        if let Some(property) = patterns.attribute(tag, "property") {
            if property.starts_with("og:") && !open_graph.contains(&property) {
                open_graph.push(property);
            }
        } else if patterns.attribute(tag, "name").as_deref() == Some("description") {
            meta_description = patterns.attribute(tag, "content");
        }
    }

    let canonical_url = patterns
        .link
        .find_iter(html)
        .map(|m| m.as_str())
        .find(|tag| patterns.attribute(tag, "rel").as_deref() == Some("canonical"))
        .and_then(|tag| patterns.attribute(tag, "href"));

    if title.is_none() {
        missing("missing_title", Severity::High, "Missing <title> tag", 20);
    }
    if meta_description.as_deref().map_or(true, str::is_empty) {
        missing("missing_meta_description", Severity::Medium, "Missing meta description", 15);
    }
    if canonical_url.is_none() {
        missing("missing_canonical", Severity::Low, "Missing canonical link", 5);
    }
    if open_graph.is_empty() {
        missing("missing_open_graph", Severity::Medium, "No Open Graph tags", 10);
    } else {
        let absent: Vec<&str> = REQUIRED_OPEN_GRAPH
            .iter()
            .copied()
            .filter(|tag| !open_graph.iter().any(|og| og == tag))
            .collect();
        if !absent.is_empty() {
            missing(
                "incomplete_open_graph",
                Severity::Low,
                &format!("Missing Open Graph tags: {}", absent.join(", ")),
                5,
            );
        }
    }

    if let Some(title) = &title {
        check_length(&mut issues, page, "Title", "title_length", title.chars().count(), TITLE_LENGTH);
    }
    if let Some(description) = meta_description.as_deref().filter(|d| !d.is_empty()) {
        check_length(
            &mut issues,
            page,
            "Meta description",
            "description_length",
            description.chars().count(),
            DESCRIPTION_LENGTH,
        );
    }

    PageAudit {
        page: page.to_string(),
        title,
        meta_description,
        canonical_url,
        open_graph,
        issues,
    }
}

fn discover_pages(context: &mut Context) -> anyhow::Result<Value> {
    let root = scan::target(context);
    if !root.is_dir() {
        anyhow::bail!("target {:?} is not a directory", root);
    }
    let extensions = scan::extensions(context, DEFAULT_EXTENSIONS);
    let pages = scan::discover(&root, &extensions, scan::max_files(context));
    info!("Discovered {} page(s) under {:?}", pages.len(), root);

    let pages: Vec<String> = pages.iter().map(|p| p.display().to_string()).collect();
    Ok(json!({ "pages_scanned": pages.len(), "pages": pages }))
}

fn audit_meta_tags(context: &mut Context) -> anyhow::Result<Value> {
    let pages = scan::paths(context, "pages")?;
    let patterns = MetaPatterns::new()?;

    let mut audits = Vec::new();
    for path in &pages {
        let Ok(html) = fs::read_to_string(path) else {
            debug!("Skipping unreadable page {:?}", path);
            continue;
        };
        audits.push(audit_page(&patterns, &path.display().to_string(), &html));
    }
    Ok(json!({ "page_audits": audits }))
}

fn summarize_seo(context: &mut Context) -> anyhow::Result<Value> {
    let audits: Vec<PageAudit> = match context.get("page_audits") {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Vec::new(),
    };

    let seo_score = if audits.is_empty() {
        0
    } else {
        audits.iter().map(PageAudit::score).sum::<u32>() / audits.len() as u32
    };
    let issues: Vec<&PageIssue> = audits.iter().flat_map(|a| &a.issues).collect();

    Ok(json!({
        "seo_score": seo_score,
        "seo_issues": issues,
        "pages_audited": audits.len(),
    }))
}

pub fn core_skills() -> Vec<Skill> {
    vec![
        Skill::new("discover_pages", discover_pages)
            .with_description("Walk the target directory and list HTML pages")
            .with_category("seo")
            .require_tool("read"),
        Skill::new("audit_meta_tags", audit_meta_tags)
            .with_description("Check title, meta description, canonical link and Open Graph tags")
            .with_category("seo")
            .with_config("title_length", json!([TITLE_LENGTH.0, TITLE_LENGTH.1]))
            .with_config("description_length", json!([DESCRIPTION_LENGTH.0, DESCRIPTION_LENGTH.1])),
        Skill::new("summarize_seo", summarize_seo)
            .with_description("Average page scores and collect issues")
            .with_category("seo"),
    ]
}

pub fn workflows() -> Vec<Workflow> {
    vec![Workflow::new(META_AUDIT)
        .with_description("Meta tag audit of every page")
        .skills(["discover_pages", "audit_meta_tags", "summarize_seo"])]
}

pub fn register(catalog: &mut SkillCatalog) {
    for skill in core_skills() {
        catalog.insert(skill.name.clone(), Arc::new(skill));
    }
}

pub fn extract_findings(context: &Context) -> Vec<Finding> {
    page_issues(context, "seo_issues").iter().map(Finding::from).collect()
}

/// Page issues previously stored under `key`; anything unparsable counts as none.
pub(crate) fn page_issues(context: &Context, key: &str) -> Vec<PageIssue> {
    context
        .get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

pub fn default_config() -> AgentConfig {
    let mut config = AgentConfig::new(AGENT_NAME, "Audits static HTML pages for on-page SEO")
        .with_category("seo");
    config.tools = vec!["read".to_string()];
    config
}

pub fn build(config: AgentConfig, catalog: &SkillCatalog, gateway: Arc<SchemaGateway>) -> ModularAgent {
    ModularAgent::with_workflows(config, catalog, core_skills(), workflows(), gateway)
        .with_finding_extractor(extract_findings)
}

/// Audit a single HTML file outside any workflow.
pub fn audit_file(path: &Path) -> anyhow::Result<PageAudit> {
    let html = fs::read_to_string(path)?;
    Ok(audit_page(&MetaPatterns::new()?, &path.display().to_string(), &html))
}
