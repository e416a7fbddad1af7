//! Performance auditor reference agent.
//!
//! A static audit of the HTML pages under the context's `target`: page
//! weight, script and stylesheet counts, render-blocking scripts in `<head>`
//! and images without explicit dimensions (a layout shift risk).

use std::fs;
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
use crate::seo::{page_issues, PageIssue};

pub const AGENT_NAME: &str = "performance-auditor";

/// Collect pages, weigh their bundles, check images, summarize.
pub const BUNDLE_AUDIT: &str = "performance_bundle_audit";

const DEFAULT_EXTENSIONS: &[&str] = &["html", "htm"];

const DEFAULT_MAX_SCRIPTS: usize = 10;
const DEFAULT_MAX_STYLESHEETS: usize = 5;
const DEFAULT_MAX_HTML_BYTES: usize = 100_000;

/// Static performance profile of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageProfile {
    pub page: String,
    pub html_size_bytes: usize,
    pub script_tags: usize,
    pub stylesheet_tags: usize,
    pub render_blocking_scripts: usize,
    #[serde(default)]
    pub images: usize,
    #[serde(default)]
    pub unsized_images: usize,
    #[serde(default)]
    pub issues: Vec<PageIssue>,
}

impl PageProfile {
    /// 100 minus the page's penalties, floored at 0.
    pub fn score(&self) -> u32 {
        let total: u32 = self.issues.iter().map(|i| i.penalty).sum();
        100u32.saturating_sub(total)
    }

    fn flag(&mut self, rule: &str, severity: Severity, message: String, penalty: u32) {
        self.issues.push(PageIssue {
            rule: rule.to_string(),
            severity,
            page: self.page.clone(),
            message,
            penalty,
        });
    }
}

struct BundlePatterns {
    head: Regex,
    script: Regex,
    stylesheet: Regex,
    image: Regex,
    src: Regex,
    width: Regex,
    height: Regex,
    non_blocking: Regex,
}

impl BundlePatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            head: Regex::new(r"(?is)<head\b[^>]*>(.*?)</head>")?,
            script: Regex::new(r"(?is)<script\b[^>]*>")?,
            stylesheet: Regex::new(r#"(?is)<link\b[^>]*\brel\s*=\s*["']?stylesheet\b[^>]*>"#)?,
            image: Regex::new(r"(?is)<img\b[^>]*>")?,
            src: Regex::new(r"(?i)\bsrc\s*=")?,
            width: Regex::new(r"(?i)\bwidth\s*=")?,
            height: Regex::new(r"(?i)\bheight\s*=")?,
            non_blocking: Regex::new(r#"(?i)\b(async|defer)\b|\btype\s*=\s*["']?module\b"#)?,
        })
    }

    /// External scripts in `<head>` without `async`, `defer` or module type.
    fn render_blocking(&self, html: &str) -> usize {
        let Some(head) = self.head.captures(html).and_then(|c| c.get(1)) else {
            return 0;
        };
        self.script
            .find_iter(head.as_str())
            .map(|m| m.as_str())
            .filter(|tag| self.src.is_match(tag) && !self.non_blocking.is_match(tag))
            .count()
    }
}

struct Budgets {
    max_scripts: usize,
    max_stylesheets: usize,
    max_html_bytes: usize,
}

impl Budgets {
    fn from_context(context: &Context) -> Self {
        Self {
            max_scripts: scan::config_usize(context, "max_scripts", DEFAULT_MAX_SCRIPTS),
            max_stylesheets: scan::config_usize(context, "max_stylesheets", DEFAULT_MAX_STYLESHEETS),
            max_html_bytes: scan::config_usize(context, "max_html_bytes", DEFAULT_MAX_HTML_BYTES),
        }
    }
}

fn profile_page(patterns: &BundlePatterns, budgets: &Budgets, page: &str, html: &str) -> PageProfile {
    let mut profile = PageProfile {
        page: page.to_string(),
        html_size_bytes: html.len(),
        script_tags: patterns.script.find_iter(html).count(),
        stylesheet_tags: patterns.stylesheet.find_iter(html).count(),
        render_blocking_scripts: patterns.render_blocking(html),
        ..PageProfile::default()
    };

    if profile.html_size_bytes > budgets.max_html_bytes {
        let message = format!(
            "HTML is {} bytes (budget {})",
            profile.html_size_bytes, budgets.max_html_bytes
        );
        profile.flag("large_html", Severity::Medium, message, 10);
    }
    if profile.script_tags > budgets.max_scripts {
        let message = format!(
            "High number of script tags ({}). Consider bundling.",
            profile.script_tags
        );
        profile.flag("too_many_scripts", Severity::Medium, message, 10);
    }
    if profile.stylesheet_tags > budgets.max_stylesheets {
        let message = format!(
            "Multiple CSS files ({}). Consider combining.",
            profile.stylesheet_tags
        );
        profile.flag("too_many_stylesheets", Severity::Low, message, 5);
    }
    if profile.render_blocking_scripts > 0 {
        let message = format!(
            "{} render-blocking script(s) in <head>; add async or defer",
            profile.render_blocking_scripts
        );
        profile.flag("render_blocking_script", Severity::Medium, message, 10);
    }
    profile
}

fn check_page_images(patterns: &BundlePatterns, profile: &mut PageProfile, html: &str) {
    let tags: Vec<&str> = patterns.image.find_iter(html).map(|m| m.as_str()).collect();
    profile.images = tags.len();
    profile.unsized_images = tags
        .iter()
        .filter(|tag| !(patterns.width.is_match(tag) && patterns.height.is_match(tag)))
        .count();

    if profile.unsized_images > 0 {
        let message = format!(
            "{} image(s) without width and height; layout may shift while loading",
            profile.unsized_images
        );
        profile.flag("unsized_images", Severity::Low, message, 5);
    }
}

fn collect_pages(context: &mut Context) -> anyhow::Result<Value> {
    let root = scan::target(context);
    if !root.is_dir() {
        anyhow::bail!("target {:?} is not a directory", root);
    }
    let extensions = scan::extensions(context, DEFAULT_EXTENSIONS);
    let pages = scan::discover(&root, &extensions, scan::max_files(context));
    info!("Collected {} page(s) under {:?}", pages.len(), root);

    let pages: Vec<String> = pages.iter().map(|p| p.display().to_string()).collect();
    Ok(json!({ "pages_analyzed": pages.len(), "pages": pages }))
}

fn analyze_bundles(context: &mut Context) -> anyhow::Result<Value> {
    let pages = scan::paths(context, "pages")?;
    let patterns = BundlePatterns::new()?;
    let budgets = Budgets::from_context(context);

    let mut profiles = Vec::new();
    for path in &pages {
        let Ok(html) = fs::read_to_string(path) else {
            debug!("Skipping unreadable page {:?}", path);
            continue;
        };
        profiles.push(profile_page(&patterns, &budgets, &path.display().to_string(), &html));
    }
    Ok(json!({ "page_profiles": profiles }))
}

fn check_images(context: &mut Context) -> anyhow::Result<Value> {
    let mut profiles: Vec<PageProfile> = match context.get("page_profiles") {
        Some(value) => serde_json::from_value(value.clone())?,
        None => anyhow::bail!("context has no 'page_profiles'; run analyze_bundles first"),
    };
    let patterns = BundlePatterns::new()?;

    for profile in &mut profiles {
        match fs::read_to_string(&profile.page) {
            Ok(html) => check_page_images(&patterns, profile, &html),
            Err(e) => debug!("Skipping images of {}: {}", profile.page, e),
        }
    }
    Ok(json!({ "page_profiles": profiles }))
}

fn summarize_performance(context: &mut Context) -> anyhow::Result<Value> {
    let profiles: Vec<PageProfile> = match context.get("page_profiles") {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Vec::new(),
    };

    let performance_score = if profiles.is_empty() {
        0
    } else {
        profiles.iter().map(PageProfile::score).sum::<u32>() / profiles.len() as u32
    };
    let issues: Vec<&PageIssue> = profiles.iter().flat_map(|p| &p.issues).collect();

    let mut recommendations: Vec<&str> = Vec::new();
    for issue in &issues {
        let advice = match issue.rule.as_str() {
            "large_html" => "Trim inline markup, scripts and styles from heavy pages",
            "too_many_scripts" => "Bundle scripts to cut request count",
            "too_many_stylesheets" => "Combine stylesheets",
            "render_blocking_script" => "Load head scripts with async or defer",
            "unsized_images" => "Add width/height to images to avoid layout shift",
            _ => continue,
        };
        if !recommendations.contains(&advice) {
            recommendations.push(advice);
        }
    }

    Ok(json!({
        "performance_score": performance_score,
        "performance_issues": issues,
        "total_html_bytes": profiles.iter().map(|p| p.html_size_bytes).sum::<usize>(),
        "script_tags": profiles.iter().map(|p| p.script_tags).sum::<usize>(),
        "stylesheet_tags": profiles.iter().map(|p| p.stylesheet_tags).sum::<usize>(),
        "recommendations": recommendations,
    }))
}

pub fn core_skills() -> Vec<Skill> {
    vec![
        Skill::new("collect_pages", collect_pages)
            .with_description("Walk the target directory and list HTML pages")
            .with_category("performance")
            .require_tool("read"),
        Skill::new("analyze_bundles", analyze_bundles)
            .with_description("Weigh each page and count script and stylesheet tags")
            .with_category("performance")
            .with_config("max_scripts", json!(DEFAULT_MAX_SCRIPTS))
            .with_config("max_stylesheets", json!(DEFAULT_MAX_STYLESHEETS))
            .with_config("max_html_bytes", json!(DEFAULT_MAX_HTML_BYTES)),
        Skill::new("check_images", check_images)
            .with_description("Flag images without explicit dimensions")
            .with_category("performance"),
        Skill::new("summarize_performance", summarize_performance)
            .with_description("Average page scores and collect recommendations")
            .with_category("performance"),
    ]
}

pub fn workflows() -> Vec<Workflow> {
    vec![Workflow::new(BUNDLE_AUDIT)
        .with_description("Static bundle and image audit of every page")
        .skills([
            "collect_pages",
            "analyze_bundles",
            "check_images",
            "summarize_performance",
        ])]
}

pub fn register(catalog: &mut SkillCatalog) {
    for skill in core_skills() {
        catalog.insert(skill.name.clone(), Arc::new(skill));
    }
}

pub fn extract_findings(context: &Context) -> Vec<Finding> {
    page_issues(context, "performance_issues")
        .iter()
        .map(Finding::from)
        .collect()
}

pub fn default_config() -> AgentConfig {
    let mut config = AgentConfig::new(
        AGENT_NAME,
        "Audits static HTML pages for page weight and loading bottlenecks",
    )
    .with_category("performance");
    config.tools = vec!["read".to_string()];
    config
}

pub fn build(config: AgentConfig, catalog: &SkillCatalog, gateway: Arc<SchemaGateway>) -> ModularAgent {
    ModularAgent::with_workflows(config, catalog, core_skills(), workflows(), gateway)
        .with_finding_extractor(extract_findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budgets() -> Budgets {
        Budgets {
            max_scripts: 2,
            max_stylesheets: 1,
            max_html_bytes: 10_000,
        }
    }

    #[test]
    fn test_lean_page_has_no_issues() {
        let html = r#"<html><head>
  <link rel="stylesheet" href="app.css">
  <script src="app.js" defer></script>
  <script type="module" src="main.js"></script>
</head><body><img src="a.png" width="10" height="10"></body></html>"#;
        let patterns = BundlePatterns::new().unwrap();
        let mut profile = profile_page(&patterns, &budgets(), "index.html", html);
        check_page_images(&patterns, &mut profile, html);

        assert_eq!(profile.script_tags, 2);
        assert_eq!(profile.stylesheet_tags, 1);
        assert_eq!(profile.render_blocking_scripts, 0);
        assert_eq!(profile.images, 1);
        assert!(profile.issues.is_empty());
        assert_eq!(profile.score(), 100);
    }

    #[test]
    fn test_heavy_page() {
        let html = r#"<html><head>
  <link rel="stylesheet" href="a.css"><link rel='stylesheet' href="b.css">
  <script src="a.js"></script><script src="b.js" async></script>
  <script>inline()</script>
</head><body><img src="hero.png"><img src="x.png" width="5"></body></html>"#;
        let patterns = BundlePatterns::new().unwrap();
        let mut profile = profile_page(&patterns, &budgets(), "heavy.html", html);
        check_page_images(&patterns, &mut profile, html);

        let rules: Vec<&str> = profile.issues.iter().map(|i| i.rule.as_str()).collect();
        assert_eq!(
            rules,
            vec![
                "too_many_scripts",
                "too_many_stylesheets",
                "render_blocking_script",
                "unsized_images"
            ]
        );
        assert_eq!(profile.render_blocking_scripts, 1);
        assert_eq!(profile.unsized_images, 2);
        assert_eq!(profile.score(), 70);
    }

    #[test]
    fn test_summary_deduplicates_recommendations() {
        let issue = |page: &str| PageIssue {
            rule: "unsized_images".to_string(),
            severity: Severity::Low,
            page: page.to_string(),
            message: "m".to_string(),
            penalty: 5,
        };
        let profiles = vec![
            PageProfile {
                page: "a.html".to_string(),
                html_size_bytes: 100,
                issues: vec![issue("a.html")],
                ..PageProfile::default()
            },
            PageProfile {
                page: "b.html".to_string(),
                html_size_bytes: 50,
                ..PageProfile::default()
            },
        ];
        let mut context = Context::new();
        context.insert("page_profiles".to_string(), json!(profiles));

        let summary = summarize_performance(&mut context).unwrap();
        assert_eq!(summary["performance_score"], json!(97));
        assert_eq!(summary["total_html_bytes"], json!(150));
        assert_eq!(summary["recommendations"].as_array().unwrap().len(), 1);
        assert_eq!(extract_findings(&summary.as_object().unwrap().clone()).len(), 1);
    }

    #[test]
    fn test_images_need_profiles() {
        assert!(check_images(&mut Context::new()).is_err());
    }
}
