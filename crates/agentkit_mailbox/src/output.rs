//! The standard agent output envelope and its builder.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use agentkit_schema::{SchemaGateway, SchemaResult, AGENT_OUTPUT_SCHEMA};

/// Version of the output envelope format.
pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

/// Identity of the agent that produced an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub version: String,
    /// One of `security`, `seo`, `content`, `performance`, `testing`, `data`, `general`
    pub category: String,
}

impl AgentInfo {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Success,
    Partial,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub timestamp: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

/// A single issue, warning or informational note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Finding {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
            rule: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Findings {
    #[serde(default)]
    pub issues: Vec<Finding>,
    #[serde(default)]
    pub warnings: Vec<Finding>,
    #[serde(default)]
    pub info: Vec<Finding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextActions {
    #[serde(default)]
    pub suggested_agents: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

/// The standard result envelope returned by every agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub schema_version: String,
    pub agent: AgentInfo,
    pub execution: ExecutionInfo,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub results: Map<String, Value>,
    #[serde(default)]
    pub findings: Findings,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub next_actions: NextActions,
}

impl AgentOutput {
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Check this output against the agent output schema.
    pub fn validate(&self, gateway: &SchemaGateway) -> SchemaResult<()> {
        gateway.validate_and_raise(&self.to_value()?, AGENT_OUTPUT_SCHEMA)
    }
}

/// Assembles an [`AgentOutput`] from raw results.
#[derive(Debug, Clone)]
pub struct OutputBuilder {
    output: AgentOutput,
}

impl OutputBuilder {
    pub fn new(agent: AgentInfo) -> Self {
        Self {
            output: AgentOutput {
                schema_version: OUTPUT_SCHEMA_VERSION.to_string(),
                agent,
                execution: ExecutionInfo {
                    timestamp: Utc::now().to_rfc3339(),
                    status: ExecutionStatus::Success,
                    duration_ms: None,
                    workflow_name: None,
                },
                context: Map::new(),
                results: Map::new(),
                findings: Findings::default(),
                recommendations: Vec::new(),
                next_actions: NextActions::default(),
            },
        }
    }

    pub fn context(mut self, context: Map<String, Value>) -> Self {
        self.output.context = context;
        self
    }

    pub fn results(mut self, results: Map<String, Value>) -> Self {
        self.output.results = results;
        self
    }

    /// Set a single results entry.
    pub fn result(mut self, key: impl Into<String>, value: Value) -> Self {
        self.output.results.insert(key.into(), value);
        self
    }

    pub fn status(mut self, status: ExecutionStatus) -> Self {
        self.output.execution.status = status;
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.output.execution.duration_ms = Some(duration_ms);
        self
    }

    pub fn workflow_name(mut self, name: impl Into<String>) -> Self {
        self.output.execution.workflow_name = Some(name.into());
        self
    }

    pub fn issue(mut self, finding: Finding) -> Self {
        self.output.findings.issues.push(finding);
        self
    }

    pub fn warning(mut self, finding: Finding) -> Self {
        self.output.findings.warnings.push(finding);
        self
    }

    pub fn info(mut self, finding: Finding) -> Self {
        self.output.findings.info.push(finding);
        self
    }

    pub fn recommendation(mut self, recommendation: Recommendation) -> Self {
        self.output.recommendations.push(recommendation);
        self
    }

    pub fn suggest_agent(mut self, agent: impl Into<String>) -> Self {
        self.output.next_actions.suggested_agents.push(agent.into());
        self
    }

    pub fn require_skill(mut self, skill: impl Into<String>) -> Self {
        self.output.next_actions.required_skills.push(skill.into());
        self
    }

    /// Finish without validation.
    pub fn build(self) -> AgentOutput {
        self.output
    }

    /// Finish, passing the envelope through the gateway first.
    pub fn build_validated(self, gateway: &SchemaGateway) -> SchemaResult<AgentOutput> {
        self.output.validate(gateway)?;
        debug!("Output for agent {} validated", self.output.agent.name);
        Ok(self.output)
    }
}
