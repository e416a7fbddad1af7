//! File discovery and line scanning shared by the reference agents.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use agentkit_core::{Context, WORKFLOW_CONFIG_KEY};
use agentkit_mailbox::{Finding, Severity};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &[
    "target",
    "node_modules",
    "__pycache__",
    "dist",
    "build",
    "vendor",
];

const DEFAULT_MAX_FILES: usize = 1000;

/// One problem found on one line of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineIssue {
    pub rule: String,
    pub severity: Severity,
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl From<&LineIssue> for Finding {
    fn from(issue: &LineIssue) -> Self {
        Finding::new(issue.severity, issue.message.clone())
            .at(format!("{}:{}", issue.file, issue.line))
            .rule(issue.rule.clone())
    }
}

/// A named regular expression with the severity of a match.
pub struct LineRule {
    pub name: &'static str,
    pub severity: Severity,
    pub message: &'static str,
    regex: Regex,
}

impl LineRule {
    pub fn new(
        name: &'static str,
        severity: Severity,
        message: &'static str,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            severity,
            message,
            regex: Regex::new(pattern)?,
        })
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

/// Apply every rule to every line of `files`.
///
/// Unreadable or non-UTF-8 files are skipped.
pub fn scan_lines(files: &[PathBuf], rules: &[LineRule]) -> Vec<LineIssue> {
    let mut issues = Vec::new();
    for path in files {
        let Ok(content) = fs::read_to_string(path) else {
            debug!("Skipping unreadable file {:?}", path);
            continue;
        };
        for (i, line) in content.lines().enumerate() {
            for rule in rules.iter().filter(|r| r.is_match(line)) {
                issues.push(LineIssue {
                    rule: rule.name.to_string(),
                    severity: rule.severity,
                    file: path.display().to_string(),
                    line: i + 1,
                    message: rule.message.to_string(),
                });
            }
        }
    }
    issues
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || SKIPPED_DIRS.contains(&name))
}

/// Files under `root` whose extension is in `extensions`, sorted, at most
/// `max_files`.
pub fn discover(root: &Path, extensions: &[String], max_files: usize) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
        })
        .collect();
    files.sort();
    files.truncate(max_files);
    files
}

/// The scan root: the context's `target`, defaulting to the working directory.
pub fn target(context: &Context) -> PathBuf {
    context
        .get("target")
        .and_then(Value::as_str)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// An unsigned `workflow_config` entry, or `default`.
pub fn config_usize(context: &Context, key: &str, default: usize) -> usize {
    context
        .get(WORKFLOW_CONFIG_KEY)
        .and_then(|c| c.get(key))
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

/// `workflow_config.max_files`, or the default limit.
pub fn max_files(context: &Context) -> usize {
    config_usize(context, "max_files", DEFAULT_MAX_FILES)
}

/// `workflow_config.extensions`, or `defaults`.
pub fn extensions(context: &Context, defaults: &[&str]) -> Vec<String> {
    context
        .get(WORKFLOW_CONFIG_KEY)
        .and_then(|c| c.get("extensions"))
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim_start_matches('.').to_string())
                .collect()
        })
        .unwrap_or_else(|| defaults.iter().map(|s| s.to_string()).collect())
}

/// A list of paths previously stored in the context under `key`.
pub fn paths(context: &Context, key: &str) -> anyhow::Result<Vec<PathBuf>> {
    let value = context
        .get(key)
        .ok_or_else(|| anyhow::anyhow!("context has no '{}' list; run discovery first", key))?;
    let list: Vec<String> = serde_json::from_value(value.clone())?;
    Ok(list.into_iter().map(PathBuf::from).collect())
}

/// Issues previously stored in the context under `key`; absent means none.
pub fn issues(context: &Context, key: &str) -> anyhow::Result<Vec<LineIssue>> {
    match context.get(key) {
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Ok(Vec::new()),
    }
}
