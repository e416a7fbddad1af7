//! The compiled-in skill catalog and the named reference agents.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use agentkit_core::{AgentConfig, SkillCatalog};
use agentkit_schema::SchemaGateway;

use crate::agent::ModularAgent;
use crate::error::AgentError;
use crate::{performance, security, seo};

/// Every implementation a skill declaration may name.
pub fn builtin_catalog() -> SkillCatalog {
    let mut catalog = SkillCatalog::new();
    security::register(&mut catalog);
    seo::register(&mut catalog);
    performance::register(&mut catalog);
    catalog
}

/// Agents shipped with agentkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceAgent {
    SecurityScanner,
    SeoAuditor,
    PerformanceAuditor,
}

impl ReferenceAgent {
    pub const ALL: [ReferenceAgent; 3] = [
        Self::SecurityScanner,
        Self::SeoAuditor,
        Self::PerformanceAuditor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SecurityScanner => security::AGENT_NAME,
            Self::SeoAuditor => seo::AGENT_NAME,
            Self::PerformanceAuditor => performance::AGENT_NAME,
        }
    }

    /// Workflow run when none is requested.
    pub fn default_workflow(&self) -> &'static str {
        match self {
            Self::SecurityScanner => security::FULL_AUDIT,
            Self::SeoAuditor => seo::META_AUDIT,
            Self::PerformanceAuditor => performance::BUNDLE_AUDIT,
        }
    }

    pub fn default_config(&self) -> AgentConfig {
        match self {
            Self::SecurityScanner => security::default_config(),
            Self::SeoAuditor => seo::default_config(),
            Self::PerformanceAuditor => performance::default_config(),
        }
    }

    /// Build the agent from `config`, or from its defaults.
    pub fn build(&self, config: Option<AgentConfig>, gateway: Arc<SchemaGateway>) -> ModularAgent {
        let config = config.unwrap_or_else(|| self.default_config());
        let catalog = builtin_catalog();
        match self {
            Self::SecurityScanner => security::build(config, &catalog, gateway),
            Self::SeoAuditor => seo::build(config, &catalog, gateway),
            Self::PerformanceAuditor => performance::build(config, &catalog, gateway),
        }
    }
}

impl fmt::Display for ReferenceAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReferenceAgent {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "security-scanner" | "security" => Ok(Self::SecurityScanner),
            "seo-auditor" | "seo" => Ok(Self::SeoAuditor),
            "performance-auditor" | "performance" | "perf" => Ok(Self::PerformanceAuditor),
            _ => Err(AgentError::UnknownAgent(s.to_string())),
        }
    }
}
