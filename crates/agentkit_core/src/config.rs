//! Agent configuration loaded from YAML or Markdown front matter.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_category() -> String {
    "general".to_string()
}

fn default_skills_dir() -> PathBuf {
    PathBuf::from("./skills")
}

fn default_workflows_dir() -> PathBuf {
    PathBuf::from("./workflows")
}

/// Static description of an agent.
///
/// Either a plain YAML document or a Markdown file whose YAML front matter
/// holds these fields and whose body becomes the system prompt:
///
/// ```markdown
/// ---
/// name: security-scanner
/// description: Scans source trees for secrets
/// tools: [read, grep]
/// enabled_workflows: [full_security_audit]
/// ---
///
/// You are the security scanner.
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default = "default_skills_dir")]
    pub skills_dir: PathBuf,
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: PathBuf,
    /// Empty means every skill is allowed.
    #[serde(default)]
    pub enabled_skills: Vec<String>,
    /// Empty means every workflow is allowed.
    #[serde(default)]
    pub enabled_workflows: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// On-disk representation used by [`AgentConfig::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Markdown,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: default_version(),
            category: default_category(),
            tools: Vec::new(),
            skills_dir: default_skills_dir(),
            workflows_dir: default_workflows_dir(),
            enabled_skills: Vec::new(),
            enabled_workflows: Vec::new(),
            system_prompt: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_skills_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skills_dir = dir.into();
        self
    }

    pub fn with_workflows_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workflows_dir = dir.into();
        self
    }

    /// Load from a `.yaml`/`.yml` file or a `.md` file with front matter.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        info!("Loading agent config from {:?}", path);

        if !path.exists() {
            return Err(CoreError::config(path, "config file not found"));
        }
        let content = fs::read_to_string(path)?;

        let is_markdown = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md"));

        let parsed = if is_markdown {
            Self::from_markdown(&content)
        } else {
            Self::from_yaml(&content)
        };
        parsed.map_err(|e| match e {
            CoreError::Config { message, .. } => CoreError::config(path, message),
            CoreError::Yaml(e) => CoreError::config(path, e.to_string()),
            other => other,
        })
    }

    /// Parse a plain YAML document.
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a Markdown document that starts with `---` fenced front matter.
    pub fn from_markdown(content: &str) -> CoreResult<Self> {
        let rest = content
            .strip_prefix("---")
            .ok_or_else(|| CoreError::config("<markdown>", "must start with YAML front matter (---)"))?;

        let (front_matter, body) = rest
            .split_once("\n---")
            .ok_or_else(|| CoreError::config("<markdown>", "front matter is not closed"))?;

        let mut config: Self = serde_yaml::from_str(front_matter)?;
        let body = body.trim();
        if !body.is_empty() {
            config.system_prompt = Some(body.to_string());
        }
        debug!("Parsed front matter for agent {}", config.name);
        Ok(config)
    }

    /// Write the configuration back out.
    ///
    /// Markdown exports keep the system prompt out of the front matter and put
    /// it in the body instead; without a prompt the body is empty. Either way
    /// the file loads back to an equal config.
    pub fn export(&self, path: impl AsRef<Path>, format: ConfigFormat) -> CoreResult<()> {
        let path = path.as_ref();
        let content = match format {
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
            ConfigFormat::Markdown => {
                let front_matter = serde_yaml::to_string(&Self {
                    system_prompt: None,
                    ..self.clone()
                })?;
                match &self.system_prompt {
                    Some(prompt) => format!("---\n{}---\n\n{}\n", front_matter, prompt),
                    None => format!("---\n{}---\n", front_matter),
                }
            }
        };

        fs::write(path, content)?;
        info!("Config exported to {:?}", path);
        Ok(())
    }

    /// Whether a skill passes the `enabled_skills` allow-list.
    pub fn allows_skill(&self, name: &str) -> bool {
        self.enabled_skills.is_empty() || self.enabled_skills.iter().any(|s| s == name)
    }

    /// Whether a workflow passes the `enabled_workflows` allow-list.
    pub fn allows_workflow(&self, name: &str) -> bool {
        self.enabled_workflows.is_empty() || self.enabled_workflows.iter().any(|w| w == name)
    }
}
