//! Error types for the core module.

use std::path::PathBuf;

use thiserror::Error;

use crate::skill::Context;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Workflow '{workflow}' requires missing skills: {}", .missing.join(", "))]
    MissingSkills { workflow: String, missing: Vec<String> },

    #[error("Skill execution failed: {skill} - {message}")]
    SkillExecution { skill: String, message: String },

    #[error("Workflow '{workflow}' halted at step {} ('{skill}'): {message}", .step + 1)]
    WorkflowHalted {
        workflow: String,
        /// Zero-based index of the failing step
        step: usize,
        skill: String,
        message: String,
        /// The context as the steps up to and including the failing one left it
        context: Context,
    },

    #[error("Configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Unknown skill implementation '{implementation}' for skill '{skill}'")]
    UnknownImplementation { skill: String, implementation: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CoreError {
    /// Create a configuration error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The context as it stood when a workflow halted.
    ///
    /// Nothing is rolled back, so this is whatever the steps before the failing
    /// one (and the failing one itself) left behind.
    pub fn partial_context(&self) -> Option<&Context> {
        match self {
            Self::WorkflowHalted { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether this error is a failed name lookup.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::SkillNotFound(_) | Self::WorkflowNotFound(_))
    }
}
