//! Composition root tying registry, executor, gateway and mailbox together.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use agentkit_core::{
    AgentConfig, Context, CoreError, DeclarationLoader, LoadSummary, Skill, SkillCatalog,
    SkillRegistry, Workflow, WorkflowExecutor, WORKFLOW_CONFIG_KEY,
};
use agentkit_mailbox::{
    AgentInfo, AgentOutput, ExecutionStatus, Finding, Mailbox, Message, MessageType,
    OutputBuilder, Severity,
};
use agentkit_schema::SchemaGateway;

use crate::error::{AgentError, AgentResult};

/// Label used when a run covers every registered skill.
const ALL_SKILLS: &str = "all_skills";

/// Turns a finished context into output findings.
pub type FindingExtractor = fn(&Context) -> Vec<Finding>;

/// An agent assembled from core skills, declared skills and workflows.
///
/// The registry is frozen once the agent is built; nothing is registered
/// afterwards.
pub struct ModularAgent {
    config: AgentConfig,
    executor: WorkflowExecutor,
    gateway: Arc<SchemaGateway>,
    load_summary: LoadSummary,
    results_schema: Option<String>,
    extract_findings: Option<FindingExtractor>,
}

impl ModularAgent {
    /// Register `core_skills`, then the declarations found through `config`.
    pub fn new(
        config: AgentConfig,
        catalog: &SkillCatalog,
        core_skills: Vec<Skill>,
        gateway: Arc<SchemaGateway>,
    ) -> Self {
        Self::with_workflows(config, catalog, core_skills, Vec::new(), gateway)
    }

    /// Like [`ModularAgent::new`], with built-in workflows registered after
    /// the core skills and before any declaration.
    ///
    /// A declared workflow of the same name replaces a built-in one.
    pub fn with_workflows(
        config: AgentConfig,
        catalog: &SkillCatalog,
        core_skills: Vec<Skill>,
        core_workflows: Vec<Workflow>,
        gateway: Arc<SchemaGateway>,
    ) -> Self {
        let mut registry = SkillRegistry::new();
        for skill in core_skills {
            registry.register_skill(skill);
        }
        for workflow in core_workflows {
            // Rejections are already logged by the registry.
            if let Err(e) = registry.register_workflow(workflow) {
                debug!("Built-in workflow not registered: {}", e);
            }
        }

        let load_summary = DeclarationLoader::new(&config, catalog).load_into(&mut registry);

        info!(
            "Agent '{}' ready with {} skill(s) and {} workflow(s)",
            config.name,
            registry.skill_names().len(),
            registry.workflow_names().len()
        );

        Self {
            config,
            executor: WorkflowExecutor::new(Arc::new(registry)),
            gateway,
            load_summary,
            results_schema: None,
            extract_findings: None,
        }
    }

    /// Check successful results against a named schema as well.
    pub fn with_results_schema(mut self, schema_name: impl Into<String>) -> Self {
        self.results_schema = Some(schema_name.into());
        self
    }

    pub fn with_finding_extractor(mut self, extractor: FindingExtractor) -> Self {
        self.extract_findings = Some(extractor);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &SkillRegistry {
        self.executor.registry()
    }

    pub fn executor(&self) -> &WorkflowExecutor {
        &self.executor
    }

    pub fn gateway(&self) -> &Arc<SchemaGateway> {
        &self.gateway
    }

    /// What happened while loading declarations.
    pub fn load_summary(&self) -> &LoadSummary {
        &self.load_summary
    }

    pub fn info(&self) -> AgentInfo {
        AgentInfo::new(&self.config.name, &self.config.version, &self.config.category)
    }

    /// Run `workflow`, or every registered skill in name order, and build a
    /// validated output.
    ///
    /// A halted run is not an error: it yields an output with status
    /// `failure`, an issue naming the failing step and the partial context as
    /// results. Lookup failures and schema rejections of the output are errors.
    pub fn run(&self, workflow: Option<&str>, context: Context) -> AgentResult<AgentOutput> {
        let started = Instant::now();
        let label = workflow.unwrap_or(ALL_SKILLS);
        info!("Agent '{}' running {}", self.config.name, label);

        let mut builder = OutputBuilder::new(self.info()).context(context.clone());
        if let Some(name) = workflow {
            builder = builder.workflow_name(name);
        }

        let outcome = match workflow {
            Some(name) => self
                .executor
                .execute_workflow(name, context)
                .map(|run| run.context),
            None => self.run_all_skills(context),
        };

        builder = match outcome {
            Ok(mut results) => {
                results.remove(WORKFLOW_CONFIG_KEY);
                self.completed(builder, results)?
            }
            Err(CoreError::WorkflowHalted {
                workflow,
                skill,
                message,
                context,
                ..
            }) => {
                warn!("Agent '{}' halted at '{}'", self.config.name, skill);
                let mut results = context;
                results.remove(WORKFLOW_CONFIG_KEY);
                builder
                    .status(ExecutionStatus::Failure)
                    .issue(
                        Finding::new(
                            Severity::High,
                            format!("Step '{}' failed: {}", skill, message),
                        )
                        .at(workflow)
                        .rule("workflow_halted"),
                    )
                    .results(results)
            }
            Err(e) => return Err(e.into()),
        };

        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let output = builder.duration_ms(elapsed).build_validated(&self.gateway)?;
        info!(
            "Agent '{}' finished {} with status {:?} in {}ms",
            self.config.name, label, output.execution.status, elapsed
        );
        Ok(output)
    }

    /// Every skill in name order with one shared context.
    ///
    /// A failing skill halts the run the same way a workflow step does.
    fn run_all_skills(&self, mut context: Context) -> Result<Context, CoreError> {
        let names: Vec<String> = self
            .registry()
            .skill_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        for (step, name) in names.iter().enumerate() {
            match self.executor.execute_skill(name, &mut context) {
                Ok(Value::Object(entries)) => context.extend(entries),
                Ok(other) => {
                    context.insert(name.clone(), other);
                }
                Err(e) => {
                    let message = match e {
                        CoreError::SkillExecution { message, .. } => message,
                        other => other.to_string(),
                    };
                    return Err(CoreError::WorkflowHalted {
                        workflow: ALL_SKILLS.to_string(),
                        step,
                        skill: name.clone(),
                        message,
                        context,
                    });
                }
            }
        }
        Ok(context)
    }

    fn completed(&self, mut builder: OutputBuilder, results: Context) -> AgentResult<OutputBuilder> {
        if let Some(extract) = self.extract_findings {
            for finding in extract(&results) {
                builder = match finding.severity {
                    Severity::Critical | Severity::High => builder.issue(finding),
                    Severity::Medium | Severity::Low => builder.warning(finding),
                    Severity::Info => builder.info(finding),
                };
            }
        }

        if let Some(schema) = &self.results_schema {
            let report = self
                .gateway
                .validate(&Value::Object(results.clone()), schema)?;
            if !report.valid {
                warn!(
                    "Results of '{}' do not match {}: {:?}",
                    self.config.name, schema, report.errors
                );
                builder = builder.status(ExecutionStatus::Partial);
                for error in report.errors {
                    builder = builder.warning(Finding::new(Severity::Medium, error).rule(schema.as_str()));
                }
            }
        }

        Ok(builder.results(results))
    }

    /// Drain the mailbox and answer every request naming a `workflow`.
    ///
    /// The request's `context` object (if any) is the run's input. The output
    /// is mailed back as a correlated `response`; a run that cannot start
    /// (unknown workflow, rejected output) is answered with an `error`
    /// message instead. Every other message is marked read and returned to
    /// the caller.
    ///
    /// A request is marked read only once its reply is sent. If the reply
    /// cannot be written, the request stays in the inbox for the next call.
    pub fn serve_inbox(&self, mailbox: &Mailbox) -> AgentResult<Vec<Message>> {
        let mut unhandled = Vec::new();

        for message in mailbox.receive(false)? {
            let workflow = match message.message_type {
                MessageType::Request => message
                    .payload
                    .get("workflow")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            };
            let Some(workflow) = workflow else {
                match mailbox.mark_read(&message) {
                    Ok(()) => unhandled.push(message),
                    Err(e) => warn!("Could not mark {} as read: {}", message.message_id, e),
                }
                continue;
            };

            if let Err(e) = self.answer(mailbox, &message, &workflow) {
                warn!(
                    "Could not answer request {}, leaving it in the inbox: {}",
                    message.message_id, e
                );
                continue;
            }
            if let Err(e) = mailbox.mark_read(&message) {
                warn!("Answered {} but could not mark it read: {}", message.message_id, e);
            }
        }

        Ok(unhandled)
    }

    /// Run the requested workflow and mail the output or an error reply.
    fn answer(&self, mailbox: &Mailbox, message: &Message, workflow: &str) -> AgentResult<()> {
        let context = match message.payload.get("context") {
            None | Some(Value::Null) => Context::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                let e = AgentError::invalid_request(&message.message_id, "context must be an object");
                return self.reply_error(mailbox, message, &e);
            }
        };

        debug!("Request {} asks for workflow '{}'", message.message_id, workflow);
        match self.run(Some(workflow), context) {
            Ok(output) => {
                mailbox.send_output(&message.from_agent, &output, Some(message.message_id.as_str()))?;
                Ok(())
            }
            Err(e) => self.reply_error(mailbox, message, &e),
        }
    }

    fn reply_error(&self, mailbox: &Mailbox, request: &Message, error: &AgentError) -> AgentResult<()> {
        warn!("Request {} failed: {}", request.message_id, error);
        let mut payload = Map::new();
        payload.insert("error".to_string(), Value::String(error.to_string()));
        mailbox.send(
            &request.from_agent,
            MessageType::Error,
            payload,
            Some(request.message_id.as_str()),
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for ModularAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModularAgent")
            .field("name", &self.config.name)
            .field("registry", self.registry())
            .field("results_schema", &self.results_schema)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use tempfile::tempdir;

    fn config(root: &std::path::Path) -> AgentConfig {
        AgentConfig::new("tester", "Test agent")
            .with_category("testing")
            .with_skills_dir(root.join("skills"))
            .with_workflows_dir(root.join("workflows"))
    }

    fn agent(root: &std::path::Path) -> ModularAgent {
        ModularAgent::with_workflows(
            config(root),
            &SkillCatalog::new(),
            vec![
                Skill::new("a_count", |_| Ok(json!({ "count": 3 }))),
                Skill::new("b_double", |ctx| {
                    let count = ctx["count"].as_i64().unwrap_or_default();
                    Ok(json!({ "doubled": count * 2 }))
                }),
                Skill::new("fail", |ctx| {
                    ctx.insert("reached".to_string(), json!(true));
                    Err(anyhow!("disk on fire"))
                }),
            ],
            vec![
                Workflow::new("double").skills(["a_count", "b_double"]),
                Workflow::new("doomed").skills(["a_count", "fail", "b_double"]),
            ],
            Arc::new(SchemaGateway::bundled()),
        )
    }

    #[test]
    fn test_run_workflow_builds_valid_output() {
        let temp = tempdir().unwrap();
        let output = agent(temp.path()).run(Some("double"), Context::new()).unwrap();

        assert_eq!(output.execution.status, ExecutionStatus::Success);
        assert_eq!(output.execution.workflow_name.as_deref(), Some("double"));
        assert!(output.execution.duration_ms.is_some());
        assert_eq!(output.results["doubled"], json!(6));
        assert!(!output.results.contains_key(WORKFLOW_CONFIG_KEY));
        assert_eq!(output.agent.category, "testing");
    }

    #[test]
    fn test_halted_workflow_reports_failure() {
        let temp = tempdir().unwrap();
        let output = agent(temp.path()).run(Some("doomed"), Context::new()).unwrap();

        assert_eq!(output.execution.status, ExecutionStatus::Failure);
        assert_eq!(output.findings.issues.len(), 1);
        assert!(output.findings.issues[0].message.contains("'fail'"));
        assert!(output.findings.issues[0].message.contains("disk on fire"));
        assert_eq!(output.results["count"], json!(3));
        assert_eq!(output.results["reached"], json!(true));
        assert!(!output.results.contains_key("doubled"));
    }

    #[test]
    fn test_unknown_workflow_is_an_error() {
        let temp = tempdir().unwrap();
        let err = agent(temp.path()).run(Some("nope"), Context::new()).unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn test_run_without_workflow_runs_skills_in_name_order() {
        let temp = tempdir().unwrap();
        let agent = ModularAgent::new(
            config(temp.path()),
            &SkillCatalog::new(),
            vec![
                Skill::new("b_double", |ctx| {
                    let count = ctx["count"].as_i64().unwrap_or_default();
                    Ok(json!({ "doubled": count * 2 }))
                }),
                Skill::new("a_count", |_| Ok(json!({ "count": 4 }))),
            ],
            Arc::new(SchemaGateway::bundled()),
        );

        let output = agent.run(None, Context::new()).unwrap();
        assert_eq!(output.results["doubled"], json!(8));
        assert!(output.execution.workflow_name.is_none());
    }

    #[test]
    fn test_results_schema_mismatch_is_partial() {
        let temp = tempdir().unwrap();
        let output = agent(temp.path())
            .with_results_schema(agentkit_schema::SECURITY_FINDINGS_SCHEMA)
            .run(Some("double"), Context::new())
            .unwrap();

        assert_eq!(output.execution.status, ExecutionStatus::Partial);
        assert!(!output.findings.warnings.is_empty());
    }

    #[test]
    fn test_serve_inbox_keeps_requests_whose_reply_fails() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("mail");
        let gateway = Arc::new(SchemaGateway::bundled());
        let agent = agent(temp.path());

        let served = Mailbox::open(&root, agent.name(), Arc::clone(&gateway)).unwrap();
        let broken = Mailbox::open(&root, "broken", Arc::clone(&gateway)).unwrap();
        let healthy = Mailbox::open(&root, "healthy", Arc::clone(&gateway)).unwrap();

        let request = |from: &Mailbox| {
            let mut payload = Map::new();
            payload.insert("workflow".to_string(), json!("double"));
            from.send(agent.name(), MessageType::Request, payload, None).unwrap()
        };
        let broken_id = request(&broken);
        let healthy_id = request(&healthy);
        broken
            .send(agent.name(), MessageType::Notification, Map::new(), None)
            .unwrap();

        // Replies to "broken" cannot be delivered while its inbox is a file.
        std::fs::remove_dir_all(broken.inbox_dir()).unwrap();
        std::fs::write(broken.inbox_dir(), "").unwrap();

        let unhandled = agent.serve_inbox(&served).unwrap();
        assert_eq!(unhandled.len(), 1);
        assert_eq!(unhandled[0].message_type, MessageType::Notification);

        let replies = healthy.receive(true).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].correlation_id.as_deref(), Some(healthy_id.as_str()));

        let pending = served.receive(false).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message_id, broken_id);

        std::fs::remove_file(broken.inbox_dir()).unwrap();
        assert!(agent.serve_inbox(&served).unwrap().is_empty());
        assert_eq!(served.pending_count().unwrap(), 0);

        let replies = broken.receive(true).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].message_type, MessageType::Response);
        assert_eq!(replies[0].correlation_id.as_deref(), Some(broken_id.as_str()));
    }
}
