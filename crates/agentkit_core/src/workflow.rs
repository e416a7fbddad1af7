//! Workflow definitions and run records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::skill::Context;

/// Context key under which a workflow's configuration map is injected before
/// the first step runs.
pub const WORKFLOW_CONFIG_KEY: &str = "workflow_config";

/// A named, ordered pipeline of skills.
///
/// Workflows are plain data and deserialize directly from YAML declarations:
///
/// ```yaml
/// name: full_security_audit
/// description: Scan every file and summarize
/// skills: [discover_files, scan_secrets, summarize_security]
/// config:
///   max_files: 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Skill names in execution order
    pub skills: Vec<String>,
    #[serde(default)]
    pub config: Context,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            skills: Vec::new(),
            config: Context::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a step.
    pub fn skill(mut self, name: impl Into<String>) -> Self {
        self.skills.push(name.into());
        self
    }

    /// Append several steps.
    pub fn skills(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skills.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// State of a single workflow run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Record of one `execute_workflow` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub workflow_name: String,
    pub state: RunState,
    /// Ordered skill names
    pub steps: Vec<String>,
    /// Index of the step currently (or last) executed
    pub current_step: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration, set once the run has finished
    pub duration_ms: Option<u64>,
    /// The shared context, as left by the last step that ran
    pub context: Context,
}

impl WorkflowRun {
    pub fn new(workflow: &Workflow, context: Context) -> Self {
        Self {
            workflow_name: workflow.name.clone(),
            state: RunState::Pending,
            steps: workflow.skills.clone(),
            current_step: 0,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            context,
        }
    }

    pub(crate) fn start(&mut self) {
        self.state = RunState::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn finish(&mut self, state: RunState) {
        let now = Utc::now();
        self.state = state;
        self.completed_at = Some(now);
        self.duration_ms = self
            .started_at
            .and_then(|start| u64::try_from((now - start).num_milliseconds()).ok());
    }

    /// Name of the skill that failed, if the run failed.
    pub fn failed_step(&self) -> Option<&str> {
        if self.state == RunState::Failed {
            self.steps.get(self.current_step).map(String::as_str)
        } else {
            None
        }
    }
}
