//! # agentkit_agents
//!
//! Modular agents built from the agentkit skill registry.
//!
//! ## Architecture
//!
//! A [`ModularAgent`] composes, in order:
//! - **Core skills** compiled into the agent
//! - **Built-in workflows** over those skills
//! - **Declared skills and workflows** found in the agent's configured
//!   directories, resolved against the static [`builtin_catalog`]
//!
//! and then freezes its registry. Running a workflow yields a validated
//! [`AgentOutput`](agentkit_mailbox::AgentOutput); serving an inbox answers
//! requests through the shared mailbox.
//!
//! ## Reference Agents
//!
//! | Agent | Category | Default workflow |
//! |-------|----------|------------------|
//! | `security-scanner` | security | `full_security_audit` |
//! | `seo-auditor` | seo | `seo_meta_audit` |
//! | `performance-auditor` | performance | `performance_bundle_audit` |

pub mod agent;
pub mod catalog;
pub mod error;
pub mod performance;
pub mod scan;
pub mod security;
pub mod seo;

pub use agent::{FindingExtractor, ModularAgent};
pub use catalog::{builtin_catalog, ReferenceAgent};
pub use error::{AgentError, AgentResult};
pub use scan::{LineIssue, LineRule};
pub use performance::PageProfile;
pub use seo::{PageAudit, PageIssue};
