//! Skill registry holding an agent's skills and workflows.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::skill::{Skill, SkillInfo};
use crate::workflow::Workflow;

/// Registry lifecycle. There is no way back to `Empty` once something is
/// registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Empty,
    Ready,
}

/// A registry of skills and of workflows composed from them.
///
/// Invariant: every workflow stored here references only skills that were
/// registered before it. Skills cannot be removed, so the invariant holds for
/// the registry's whole lifetime.
#[derive(Default)]
pub struct SkillRegistry {
    skills: HashMap<String, Skill>,
    workflows: HashMap<String, Workflow>,
}

impl SkillRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skill under its name.
    ///
    /// Disabled skills are skipped. An existing skill with the same name is
    /// replaced.
    pub fn register_skill(&mut self, skill: Skill) {
        if !skill.enabled {
            debug!("Skipping disabled skill: {}", skill.name);
            return;
        }
        debug!("Registering skill: {} ({})", skill.name, skill.category);
        if self.skills.insert(skill.name.clone(), skill).is_some() {
            debug!("Previous registration replaced");
        }
    }

    /// Register a workflow.
    ///
    /// Rejected as a whole, leaving the registry untouched, if any of its steps
    /// names an unregistered skill.
    pub fn register_workflow(&mut self, workflow: Workflow) -> CoreResult<()> {
        let mut missing: Vec<String> = workflow
            .skills
            .iter()
            .filter(|name| !self.skills.contains_key(name.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            let mut seen = HashSet::new();
            missing.retain(|name| seen.insert(name.clone()));
            warn!(
                "Workflow '{}' requires missing skills: {:?}",
                workflow.name, missing
            );
            return Err(CoreError::MissingSkills {
                workflow: workflow.name,
                missing,
            });
        }

        debug!("Registering workflow: {}", workflow.name);
        self.workflows.insert(workflow.name.clone(), workflow);
        Ok(())
    }

    pub fn get_skill(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }

    /// Get a skill by name, returning an error if not found.
    pub fn get_skill_required(&self, name: &str) -> CoreResult<&Skill> {
        self.get_skill(name)
            .ok_or_else(|| CoreError::SkillNotFound(name.to_string()))
    }

    pub fn get_workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.get(name)
    }

    /// Get a workflow by name, returning an error if not found.
    pub fn get_workflow_required(&self, name: &str) -> CoreResult<&Workflow> {
        self.get_workflow(name)
            .ok_or_else(|| CoreError::WorkflowNotFound(name.to_string()))
    }

    pub fn contains_skill(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    pub fn contains_workflow(&self, name: &str) -> bool {
        self.workflows.contains_key(name)
    }

    /// Registered skill names, sorted.
    pub fn skill_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.skills.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered workflow names, sorted.
    pub fn workflow_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn skill_info(&self, name: &str) -> Option<SkillInfo> {
        self.get_skill(name).map(Skill::info)
    }

    /// Total number of skills and workflows.
    pub fn len(&self) -> usize {
        self.skills.len() + self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.workflows.is_empty()
    }

    pub fn state(&self) -> RegistryState {
        if self.is_empty() {
            RegistryState::Empty
        } else {
            RegistryState::Ready
        }
    }
}

impl std::fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillRegistry")
            .field("skills", &self.skill_names())
            .field("workflows", &self.workflow_names())
            .finish()
    }
}
