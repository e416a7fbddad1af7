//! Integration tests for registration, declarations and execution.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tempfile::tempdir;

use agentkit_core::{
    AgentConfig, Context, CoreError, DeclarationLoader, RunState, Skill, SkillCatalog,
    SkillRegistry, Workflow, WorkflowExecutor,
};

/// Re-registering a skill name means only the latest executable runs.
#[test]
fn test_last_registration_wins() {
    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));

    let mut registry = SkillRegistry::new();
    let counter = Arc::clone(&first_calls);
    registry.register_skill(Skill::new("scan", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!("first"))
    }));
    let counter = Arc::clone(&second_calls);
    registry.register_skill(Skill::new("scan", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(json!("second"))
    }));

    let executor = WorkflowExecutor::new(Arc::new(registry));
    let result = executor.execute_skill("scan", &mut Context::new()).unwrap();

    assert_eq!(result, json!("second"));
    assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
}

/// A workflow naming an unregistered skill never becomes runnable.
#[test]
fn test_rejected_workflow_cannot_be_executed() {
    let mut registry = SkillRegistry::new();
    registry.register_skill(Skill::new("a", |_| Ok(json!({}))));
    assert!(registry
        .register_workflow(Workflow::new("broken").skills(["a", "ghost"]))
        .is_err());

    let executor = WorkflowExecutor::new(Arc::new(registry));
    let err = executor.execute_workflow("broken", Context::new()).unwrap_err();
    assert!(matches!(err, CoreError::WorkflowNotFound(name) if name == "broken"));
}

/// Declared skills and workflows are discovered and registered.
#[test]
fn test_declarations_are_loaded() {
    let temp = tempdir().unwrap();
    let skills_dir = temp.path().join("skills");
    let workflows_dir = temp.path().join("workflows");
    fs::create_dir_all(&skills_dir).unwrap();
    fs::create_dir_all(&workflows_dir).unwrap();

    fs::write(
        skills_dir.join("performance.yaml"),
        r#"
skills:
  - name: lighthouse_audit
    description: Run Google Lighthouse performance audit
    category: performance
    required_tools: [lighthouse, bash]
    config:
      timeout: 120
      device: mobile
  - name: legacy_audit
    implementation: lighthouse_audit
    enabled: false
  - name: mystery
    implementation: not_in_catalog
"#,
    )
    .unwrap();
    fs::write(
        skills_dir.join("headers.yml"),
        "name: check_security_headers\nimplementation: headers\ncategory: security\n",
    )
    .unwrap();
    fs::write(skills_dir.join("broken.yaml"), "skills: [[[").unwrap();

    fs::write(
        workflows_dir.join("audit.yaml"),
        "name: audit\ndescription: Full audit\nskills: [lighthouse_audit, check_security_headers]\nconfig:\n  strict: true\n",
    )
    .unwrap();
    fs::write(
        workflows_dir.join("needs_legacy.yaml"),
        "name: needs_legacy\nskills: [legacy_audit]\n",
    )
    .unwrap();

    let mut catalog = SkillCatalog::new();
    catalog.insert_fn("lighthouse_audit", |_| Ok(json!({ "lighthouse_score": 95 })));
    catalog.insert_fn("headers", |ctx| {
        let strict = ctx["workflow_config"]["strict"].as_bool().unwrap_or(false);
        Ok(json!({ "security_score": if strict { 70 } else { 85 } }))
    });

    let config = AgentConfig::new("perf", "Performance monitor")
        .with_skills_dir(&skills_dir)
        .with_workflows_dir(&workflows_dir);

    let mut registry = SkillRegistry::new();
    let summary = DeclarationLoader::new(&config, &catalog).load_into(&mut registry);

    assert_eq!(
        summary.skills_registered,
        vec!["check_security_headers", "lighthouse_audit"]
    );
    assert_eq!(summary.workflows_registered, vec!["audit"]);
    // broken.yaml, the unknown implementation and the workflow needing a disabled skill
    assert_eq!(summary.skipped.len(), 3);

    let info = registry.skill_info("lighthouse_audit").unwrap();
    assert_eq!(info.required_tools, vec!["lighthouse", "bash"]);
    assert_eq!(info.config["device"], json!("mobile"));
    assert!(!registry.contains_skill("legacy_audit"));

    let executor = WorkflowExecutor::new(Arc::new(registry));
    let run = executor.execute_workflow("audit", Context::new()).unwrap();
    assert_eq!(run.state, RunState::Completed);
    assert_eq!(run.context["lighthouse_score"], json!(95));
    assert_eq!(run.context["security_score"], json!(70));
}

/// Allow-lists filter declarations before registration.
#[test]
fn test_allow_lists() {
    let temp = tempdir().unwrap();
    let workflows_dir = temp.path().join("workflows");
    fs::create_dir_all(&workflows_dir).unwrap();
    fs::write(workflows_dir.join("one.yaml"), "name: one\nskills: []\n").unwrap();
    fs::write(workflows_dir.join("two.yaml"), "name: two\nskills: []\n").unwrap();

    let mut config = AgentConfig::new("a", "b")
        .with_skills_dir(temp.path().join("missing"))
        .with_workflows_dir(&workflows_dir);
    config.enabled_workflows = vec!["two".to_string()];

    let mut registry = SkillRegistry::new();
    let summary = DeclarationLoader::new(&config, &SkillCatalog::new()).load_into(&mut registry);

    assert_eq!(summary.workflows_registered, vec!["two"]);
    assert_eq!(registry.workflow_names(), vec!["two"]);
}
