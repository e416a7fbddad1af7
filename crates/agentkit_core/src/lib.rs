//! # agentkit_core
//!
//! Skill registry and workflow engine shared by every agentkit agent.
//!
//! # Architecture
//!
//! - **Skills**: Named units of work implementing [`Execute`]
//! - **Workflows**: Ordered lists of skill names sharing one mutable context
//! - **Registry**: Holds skills and workflows; rejects workflows that name unknown skills
//! - **Executor**: Runs a skill or a workflow, strictly in order, failing fast
//! - **Config / Loader**: Agent configuration files and on-disk declarations
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use agentkit_core::{Context, Skill, SkillRegistry, Workflow, WorkflowExecutor};
//! use serde_json::json;
//!
//! let mut registry = SkillRegistry::new();
//! registry.register_skill(Skill::new("skill_a", |_| Ok(json!({ "x": 1 }))));
//! registry.register_skill(Skill::new("skill_b", |_| Ok(json!({ "y": 2 }))));
//! registry
//!     .register_workflow(Workflow::new("w").skills(["skill_a", "skill_b"]))
//!     .unwrap();
//!
//! let executor = WorkflowExecutor::new(Arc::new(registry));
//! let run = executor.execute_workflow("w", Context::new()).unwrap();
//! assert_eq!(run.context["x"], json!(1));
//! assert_eq!(run.context["y"], json!(2));
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod loader;
pub mod registry;
pub mod skill;
pub mod workflow;

// Re-export main types for convenience
pub use config::{AgentConfig, ConfigFormat};
pub use error::{CoreError, CoreResult};
pub use executor::WorkflowExecutor;
pub use loader::{DeclarationLoader, LoadSummary, SkillCatalog, SkillDeclaration};
pub use registry::{RegistryState, SkillRegistry};
pub use skill::{Context, Execute, Skill, SkillInfo};
pub use workflow::{RunState, Workflow, WorkflowRun, WORKFLOW_CONFIG_KEY};
