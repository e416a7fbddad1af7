//! Skills: named, independently callable units of work.
//!
//! A skill pairs descriptive metadata with an executable implementing
//! [`Execute`]. Executables receive the shared workflow context by mutable
//! reference and return a JSON value. When the value is an object its entries
//! are merged into the context by the executor; anything else is stored under
//! the skill's name.
//!
//! # Example
//!
//! ```rust
//! use agentkit_core::{Skill, SkillRegistry};
//! use serde_json::json;
//!
//! let mut registry = SkillRegistry::new();
//! registry.register_skill(
//!     Skill::new("lighthouse_audit", |_ctx| Ok(json!({ "lighthouse_score": 95 })))
//!         .with_description("Run Google Lighthouse audit")
//!         .with_category("performance")
//!         .require_tool("lighthouse"),
//! );
//! assert!(registry.contains_skill("lighthouse_audit"));
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The mutable key/value map threaded through every step of a workflow.
pub type Context = Map<String, Value>;

/// The capability every skill executable provides.
#[cfg_attr(test, mockall::automock)]
pub trait Execute: Send + Sync {
    fn execute(&self, context: &mut Context) -> anyhow::Result<Value>;
}

/// Adapter turning a closure into an [`Execute`] implementation.
struct FnExecutable<F>(F);

impl<F> Execute for FnExecutable<F>
where
    F: Fn(&mut Context) -> anyhow::Result<Value> + Send + Sync,
{
    fn execute(&self, context: &mut Context) -> anyhow::Result<Value> {
        (self.0)(context)
    }
}

/// A registered skill.
#[derive(Clone)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub category: String,
    pub required_tools: Vec<String>,
    pub config: Context,
    pub enabled: bool,
    executable: Arc<dyn Execute>,
}

impl Skill {
    /// Create an enabled skill from a closure.
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&mut Context) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::from_executable(name, Arc::new(FnExecutable(function)))
    }

    /// Create an enabled skill from an existing executable.
    pub fn from_executable(name: impl Into<String>, executable: Arc<dyn Execute>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: "general".to_string(),
            required_tools: Vec::new(),
            config: Context::new(),
            enabled: true,
            executable,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn require_tool(mut self, tool: impl Into<String>) -> Self {
        self.required_tools.push(tool.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Invoke the executable directly. Errors are returned untagged.
    pub fn invoke(&self, context: &mut Context) -> anyhow::Result<Value> {
        self.executable.execute(context)
    }

    pub fn info(&self) -> SkillInfo {
        SkillInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            required_tools: self.required_tools.clone(),
            config: self.config.clone(),
            enabled: self.enabled,
        }
    }
}

/// A skill can back another skill, which is how catalog entries are reused.
impl Execute for Skill {
    fn execute(&self, context: &mut Context) -> anyhow::Result<Value> {
        self.invoke(context)
    }
}

impl fmt::Debug for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skill")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("required_tools", &self.required_tools)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Serializable description of a skill, without its executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub name: String,
    pub description: String,
    pub category: String,
    pub required_tools: Vec<String>,
    pub config: Context,
    pub enabled: bool,
}
