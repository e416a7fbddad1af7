//! Sequential skill and workflow execution.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use crate::error::{CoreError, CoreResult};
use crate::registry::SkillRegistry;
use crate::skill::Context;
use crate::workflow::{RunState, WorkflowRun, WORKFLOW_CONFIG_KEY};

/// Runs skills and workflows from a registry.
///
/// Execution is strictly sequential. There is no timeout, retry or
/// cancellation at this layer; a skill that blocks, blocks the whole run.
pub struct WorkflowExecutor {
    registry: Arc<SkillRegistry>,
}

impl WorkflowExecutor {
    /// Create a new executor with the given registry.
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    /// Execute one skill and return its result unchanged.
    ///
    /// Any error raised by the executable is tagged with the skill name.
    pub fn execute_skill(&self, name: &str, context: &mut Context) -> CoreResult<Value> {
        let skill = self.registry.get_skill_required(name)?;
        info!("Running skill: {}", name);

        match skill.invoke(context) {
            Ok(result) => {
                info!("Skill '{}' completed successfully", name);
                Ok(result)
            }
            Err(e) => {
                error!("Skill '{}' failed: {:#}", name, e);
                Err(CoreError::SkillExecution {
                    skill: name.to_string(),
                    message: format!("{:#}", e),
                })
            }
        }
    }

    /// Execute a workflow, threading one context through every step.
    ///
    /// The workflow's configuration is injected under
    /// [`WORKFLOW_CONFIG_KEY`] first. Object results are merged into the
    /// context (later keys win), other results are stored under the skill
    /// name. The run halts at the first failing step with
    /// [`CoreError::WorkflowHalted`], which carries the context as it stood.
    pub fn execute_workflow(&self, name: &str, context: Context) -> CoreResult<WorkflowRun> {
        let workflow = self.registry.get_workflow_required(name)?;

        let mut run = WorkflowRun::new(workflow, context);
        run.context.insert(
            WORKFLOW_CONFIG_KEY.to_string(),
            Value::Object(workflow.config.clone()),
        );
        run.start();

        info!(
            "Executing workflow: {} ({})",
            workflow.name,
            workflow.skills.join(", ")
        );

        for (i, skill_name) in workflow.skills.iter().enumerate() {
            run.current_step = i;
            info!("Step [{}/{}]: {}", i + 1, workflow.skills.len(), skill_name);

            match self.execute_skill(skill_name, &mut run.context) {
                Ok(Value::Object(entries)) => run.context.extend(entries),
                Ok(other) => {
                    run.context.insert(skill_name.clone(), other);
                }
                Err(e) => {
                    let message = match &e {
                        CoreError::SkillExecution { message, .. } => message.clone(),
                        other => other.to_string(),
                    };
                    error!("Workflow '{}' halted at '{}'", workflow.name, skill_name);
                    run.finish(RunState::Failed);
                    debug!(
                        "Run of '{}' failed after {:?}ms",
                        run.workflow_name, run.duration_ms
                    );
                    return Err(CoreError::WorkflowHalted {
                        workflow: workflow.name.clone(),
                        step: i,
                        skill: skill_name.clone(),
                        message,
                        context: run.context,
                    });
                }
            }
        }

        run.finish(RunState::Completed);
        info!("Workflow '{}' completed", workflow.name);
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::{MockExecute, Skill};
    use crate::workflow::Workflow;
    use anyhow::anyhow;
    use serde_json::json;

    fn executor(skills: Vec<Skill>, workflows: Vec<Workflow>) -> WorkflowExecutor {
        let mut registry = SkillRegistry::new();
        for skill in skills {
            registry.register_skill(skill);
        }
        for workflow in workflows {
            registry.register_workflow(workflow).unwrap();
        }
        WorkflowExecutor::new(Arc::new(registry))
    }

    #[test]
    fn test_results_merge_into_context() {
        let exec = executor(
            vec![
                Skill::new("skill_a", |_| Ok(json!({ "x": 1 }))),
                Skill::new("skill_b", |_| Ok(json!({ "y": 2 }))),
            ],
            vec![Workflow::new("w").skills(["skill_a", "skill_b"])],
        );

        let run = exec.execute_workflow("w", Context::new()).unwrap();
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.context["x"], json!(1));
        assert_eq!(run.context["y"], json!(2));
    }

    #[test]
    fn test_later_steps_see_and_overwrite_earlier_keys() {
        let exec = executor(
            vec![
                Skill::new("first", |_| Ok(json!({ "value": 1, "kept": true }))),
                Skill::new("second", |ctx| {
                    let seen = ctx["value"].as_i64().unwrap_or_default();
                    Ok(json!({ "value": seen + 10 }))
                }),
            ],
            vec![Workflow::new("w").skills(["first", "second"])],
        );

        let run = exec.execute_workflow("w", Context::new()).unwrap();
        assert_eq!(run.context["value"], json!(11));
        assert_eq!(run.context["kept"], json!(true));
    }

    #[test]
    fn test_non_object_result_stored_under_skill_name() {
        let exec = executor(
            vec![Skill::new("count_files", |_| Ok(json!(42)))],
            vec![Workflow::new("w").skill("count_files")],
        );

        let run = exec.execute_workflow("w", Context::new()).unwrap();
        assert_eq!(run.context["count_files"], json!(42));
    }

    #[test]
    fn test_workflow_config_is_injected() {
        let exec = executor(
            vec![Skill::new("read_config", |ctx| {
                Ok(json!({ "depth_seen": ctx[WORKFLOW_CONFIG_KEY]["depth"].clone() }))
            })],
            vec![Workflow::new("w")
                .skill("read_config")
                .with_config("depth", json!(3))],
        );

        let mut input = Context::new();
        input.insert("url".to_string(), json!("https://example.com"));

        let run = exec.execute_workflow("w", input).unwrap();
        assert_eq!(run.context["depth_seen"], json!(3));
        assert_eq!(run.context["url"], json!("https://example.com"));
    }

    #[test]
    fn test_failure_halts_and_exposes_partial_context() {
        let mut never = MockExecute::new();
        never.expect_execute().times(0);

        let exec = executor(
            vec![
                Skill::new("ok", |_| Ok(json!({ "before": true }))),
                Skill::new("boom", |ctx| {
                    ctx.insert("touched".to_string(), json!(true));
                    Err(anyhow!("disk on fire"))
                }),
                Skill::from_executable("never", Arc::new(never)),
            ],
            vec![Workflow::new("w").skills(["ok", "boom", "never"])],
        );

        let err = exec.execute_workflow("w", Context::new()).unwrap_err();
        let context = err.partial_context().unwrap();
        assert_eq!(context["before"], json!(true));
        assert_eq!(context["touched"], json!(true));

        match err {
            CoreError::WorkflowHalted {
                workflow,
                step,
                skill,
                message,
                context,
            } => {
                assert_eq!(workflow, "w");
                assert_eq!(step, 1);
                assert_eq!(skill, "boom");
                assert!(message.contains("disk on fire"));
                assert!(!context.contains_key("never"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_skill_error_is_tagged() {
        let exec = executor(
            vec![Skill::new("boom", |_| Err(anyhow!("bad input")))],
            Vec::new(),
        );

        let err = exec.execute_skill("boom", &mut Context::new()).unwrap_err();
        match err {
            CoreError::SkillExecution { skill, message } => {
                assert_eq!(skill, "boom");
                assert_eq!(message, "bad input");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_names() {
        let exec = executor(Vec::new(), Vec::new());
        assert!(matches!(
            exec.execute_skill("nope", &mut Context::new()),
            Err(CoreError::SkillNotFound(_))
        ));
        assert!(matches!(
            exec.execute_workflow("nope", Context::new()),
            Err(CoreError::WorkflowNotFound(_))
        ));
    }

    #[test]
    fn test_execute_skill_passes_context_and_result_through() {
        let mut mock = MockExecute::new();
        mock.expect_execute()
            .withf(|ctx| ctx.get("path") == Some(&json!("src/")))
            .times(1)
            .returning(|_| Ok(json!(["a.rs", "b.rs"])));

        let exec = executor(vec![Skill::from_executable("list", Arc::new(mock))], Vec::new());

        let mut ctx = Context::new();
        ctx.insert("path".to_string(), json!("src/"));
        let result = exec.execute_skill("list", &mut ctx).unwrap();
        assert_eq!(result, json!(["a.rs", "b.rs"]));
    }
}
