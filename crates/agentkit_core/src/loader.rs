//! Discovery of skill and workflow declarations on disk.
//!
//! Skill declarations never load code. Each declared skill names an
//! `implementation` that must already exist in a compiled-in
//! [`SkillCatalog`]; the declaration only contributes metadata.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::{CoreError, CoreResult};
use crate::registry::SkillRegistry;
use crate::skill::{Context, Execute, Skill};
use crate::workflow::Workflow;

/// A static table of skill executables, keyed by implementation name.
#[derive(Default, Clone)]
pub struct SkillCatalog {
    entries: BTreeMap<String, Arc<dyn Execute>>,
}

impl SkillCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an implementation.
    pub fn insert(&mut self, implementation: impl Into<String>, executable: Arc<dyn Execute>) {
        self.entries.insert(implementation.into(), executable);
    }

    /// Add a closure-backed implementation.
    pub fn insert_fn<F>(&mut self, implementation: impl Into<String>, function: F)
    where
        F: Fn(&mut Context) -> anyhow::Result<serde_json::Value> + Send + Sync + 'static,
    {
        let implementation = implementation.into();
        let executable = Skill::new(implementation.clone(), function);
        self.insert(implementation, Arc::new(executable));
    }

    pub fn get(&self, implementation: &str) -> Option<Arc<dyn Execute>> {
        self.entries.get(implementation).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for SkillCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillCatalog")
            .field("entries", &self.names())
            .finish()
    }
}

fn default_true() -> bool {
    true
}

fn default_category() -> String {
    "general".to_string()
}

/// One skill as declared in a skills-directory YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Catalog entry providing the executable; defaults to `name`.
    #[serde(default)]
    pub implementation: Option<String>,
    #[serde(default)]
    pub required_tools: Vec<String>,
    #[serde(default)]
    pub config: Context,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl SkillDeclaration {
    /// Resolve against a catalog into a registrable skill.
    pub fn resolve(&self, catalog: &SkillCatalog) -> CoreResult<Skill> {
        let implementation = self.implementation.as_deref().unwrap_or(&self.name);
        let executable = catalog
            .get(implementation)
            .ok_or_else(|| CoreError::UnknownImplementation {
                skill: self.name.clone(),
                implementation: implementation.to_string(),
            })?;

        let mut skill = Skill::from_executable(&self.name, executable)
            .with_description(&self.description)
            .with_category(&self.category)
            .enabled(self.enabled);
        skill.required_tools = self.required_tools.clone();
        skill.config = self.config.clone();
        Ok(skill)
    }
}

/// A skills file holds either a single declaration or a `skills:` list.
#[derive(Deserialize)]
#[serde(untagged)]
enum SkillFile {
    Many { skills: Vec<SkillDeclaration> },
    One(SkillDeclaration),
}

/// Outcome of loading declarations into a registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub skills_registered: Vec<String>,
    pub workflows_registered: Vec<String>,
    /// `(source, reason)` for every declaration that was not registered
    pub skipped: Vec<(String, String)>,
}

/// Finds declaration files in an agent's configured directories.
pub struct DeclarationLoader<'a> {
    config: &'a AgentConfig,
    catalog: &'a SkillCatalog,
}

impl<'a> DeclarationLoader<'a> {
    pub fn new(config: &'a AgentConfig, catalog: &'a SkillCatalog) -> Self {
        Self { config, catalog }
    }

    /// Register declared skills, then declared workflows.
    ///
    /// Bad or rejected declarations are recorded in the summary and logged;
    /// they never abort loading.
    pub fn load_into(&self, registry: &mut SkillRegistry) -> LoadSummary {
        let mut summary = LoadSummary::default();
        self.load_skills(registry, &mut summary);
        self.load_workflows(registry, &mut summary);
        info!(
            "Loaded {} declared skill(s) and {} workflow(s), skipped {}",
            summary.skills_registered.len(),
            summary.workflows_registered.len(),
            summary.skipped.len()
        );
        summary
    }

    fn load_skills(&self, registry: &mut SkillRegistry, summary: &mut LoadSummary) {
        for path in yaml_files(&self.config.skills_dir) {
            let source = path.display().to_string();
            let declarations = match read_yaml::<SkillFile>(&path) {
                Ok(SkillFile::Many { skills }) => skills,
                Ok(SkillFile::One(declaration)) => vec![declaration],
                Err(e) => {
                    warn!("Failed to load skills from {:?}: {}", path, e);
                    summary.skipped.push((source, e.to_string()));
                    continue;
                }
            };

            for declaration in declarations {
                if !self.config.allows_skill(&declaration.name) {
                    debug!("Skill '{}' not in allow-list", declaration.name);
                    continue;
                }
                match declaration.resolve(self.catalog) {
                    Ok(skill) if skill.enabled => {
                        summary.skills_registered.push(skill.name.clone());
                        registry.register_skill(skill);
                    }
                    Ok(skill) => debug!("Declared skill '{}' is disabled", skill.name),
                    Err(e) => {
                        warn!("Skipping declared skill from {:?}: {}", path, e);
                        summary.skipped.push((source.clone(), e.to_string()));
                    }
                }
            }
        }
    }

    fn load_workflows(&self, registry: &mut SkillRegistry, summary: &mut LoadSummary) {
        for path in yaml_files(&self.config.workflows_dir) {
            let source = path.display().to_string();
            let workflow = match read_yaml::<Workflow>(&path) {
                Ok(workflow) => workflow,
                Err(e) => {
                    warn!("Failed to load workflow from {:?}: {}", path, e);
                    summary.skipped.push((source, e.to_string()));
                    continue;
                }
            };

            if !self.config.allows_workflow(&workflow.name) {
                debug!("Workflow '{}' not in allow-list", workflow.name);
                continue;
            }

            let name = workflow.name.clone();
            match registry.register_workflow(workflow) {
                Ok(()) => summary.workflows_registered.push(name),
                Err(e) => summary.skipped.push((source, e.to_string())),
            }
        }
    }
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> CoreResult<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// `*.yaml` and `*.yml` files directly inside `dir`, sorted by path.
fn yaml_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!("Declaration directory not found: {:?}", dir);
        return Vec::new();
    }

    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files: Vec<PathBuf> = ["yaml", "yml"]
        .iter()
        .filter_map(|ext| glob::glob(&format!("{}/*.{}", escaped, ext)).ok())
        .flat_map(|paths| paths.filter_map(Result::ok))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('_'))
        })
        .collect();
    files.sort();
    files
}
