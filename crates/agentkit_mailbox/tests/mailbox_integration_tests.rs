//! Integration tests for message delivery between agents.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tempfile::tempdir;

use agentkit_mailbox::{
    AgentInfo, Mailbox, MailboxError, Message, MessageType, OutputBuilder, OUTPUT_SCHEMA_VERSION,
};
use agentkit_schema::{SchemaGateway, AGENT_OUTPUT_SCHEMA, INTER_AGENT_MESSAGE_SCHEMA};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn pair(root: &std::path::Path, a: &str, b: &str) -> (Mailbox, Mailbox, Arc<SchemaGateway>) {
    let gateway = Arc::new(SchemaGateway::bundled());
    let first = Mailbox::open(root, a, Arc::clone(&gateway)).unwrap();
    let second = Mailbox::open(root, b, Arc::clone(&gateway)).unwrap();
    (first, second, gateway)
}

/// What was sent is exactly what is received.
#[test]
fn test_send_then_receive() {
    let temp = tempdir().unwrap();
    let (a, b, _) = pair(temp.path(), "agent_a", "agent_b");

    let id = a
        .send(
            "agent_b",
            MessageType::Notification,
            object(json!({ "action": "scan", "target": "src/" })),
            Some("original-message-123"),
        )
        .unwrap();

    let messages = b.receive(true).unwrap();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.message_id, id);
    assert_eq!(message.from_agent, "agent_a");
    assert_eq!(message.to_agent, "agent_b");
    assert_eq!(message.payload, object(json!({ "action": "scan", "target": "src/" })));
    assert_eq!(message.correlation_id.as_deref(), Some("original-message-123"));
}

/// Every envelope written to disk passes the message schema.
#[test]
fn test_persisted_envelopes_are_valid() {
    let temp = tempdir().unwrap();
    let (a, b, gateway) = pair(temp.path(), "agent_a", "agent_b");

    a.send("agent_b", MessageType::Request, object(json!({ "n": 1 })), None)
        .unwrap();
    let request = b.receive(false).unwrap().remove(0);
    b.send_response(&request, object(json!({ "ok": true }))).unwrap();

    for message in a.sent().unwrap().into_iter().chain(b.sent().unwrap()) {
        let report = gateway
            .validate(&serde_json::to_value(&message).unwrap(), INTER_AGENT_MESSAGE_SCHEMA)
            .unwrap();
        assert!(report.valid, "{:?}", report.errors);
    }
}

/// Marking read drains the inbox.
#[test]
fn test_receive_mark_read_drains() {
    let temp = tempdir().unwrap();
    let (a, b, _) = pair(temp.path(), "agent_a", "agent_b");

    for i in 0..3 {
        a.send("agent_b", MessageType::Notification, object(json!({ "i": i })), None)
            .unwrap();
    }

    assert_eq!(b.receive(true).unwrap().len(), 3);
    assert!(b.receive(true).unwrap().is_empty());
    assert_eq!(b.archived().unwrap().len(), 3);
    assert_eq!(b.pending_count().unwrap(), 0);
}

/// Peeking leaves the inbox untouched.
#[test]
fn test_receive_without_mark_read_is_idempotent() {
    let temp = tempdir().unwrap();
    let (a, b, _) = pair(temp.path(), "agent_a", "agent_b");

    a.send("agent_b", MessageType::Request, Map::new(), None).unwrap();
    a.send("agent_b", MessageType::Request, Map::new(), None).unwrap();

    let ids = |messages: Vec<Message>| {
        let mut ids: Vec<String> = messages.into_iter().map(|m| m.message_id).collect();
        ids.sort();
        ids
    };

    let first = ids(b.receive(false).unwrap());
    let second = ids(b.receive(false).unwrap());
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert!(b.archived().unwrap().is_empty());
}

/// Responses go back to the sender, correlated with the request id.
#[test]
fn test_send_response_correlates() {
    let temp = tempdir().unwrap();
    let (a, b, _) = pair(temp.path(), "agent_a", "agent_b");

    let request_id = a
        .send("agent_b", MessageType::Request, object(json!({ "q": 1 })), None)
        .unwrap();
    let request = b.receive(true).unwrap().remove(0);

    let response_id = b
        .send_response(&request, object(json!({ "a": 2 })))
        .unwrap();
    assert_ne!(response_id, request_id);

    let replies = a.receive(true).unwrap();
    assert_eq!(replies.len(), 1);
    let reply = &replies[0];
    assert_eq!(reply.message_type, MessageType::Response);
    assert_eq!(reply.correlation_id.as_deref(), Some(request_id.as_str()));
    assert_eq!(reply.to_agent, "agent_a");
    assert_eq!(reply.from_agent, "agent_b");
    assert!(reply.answers(&request));
}

/// The scanner/worker request-response exchange.
#[test]
fn test_scanner_worker_scenario() {
    let temp = tempdir().unwrap();
    let (scanner, worker, _) = pair(temp.path(), "scanner", "worker");

    let request_id = scanner
        .send("worker", MessageType::Request, object(json!({ "path": "src/" })), None)
        .unwrap();

    let inbox = worker.receive(true).unwrap();
    assert_eq!(inbox.len(), 1);
    worker
        .send_response(&inbox[0], object(json!({ "status": "ok" })))
        .unwrap();

    let replies = scanner.receive(true).unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].correlation_id.as_deref(), Some(request_id.as_str()));
    assert_eq!(replies[0].payload["status"], json!("ok"));
}

/// Recipients that never opened a mailbox still receive mail.
#[test]
fn test_recipient_directories_created_on_demand() {
    let temp = tempdir().unwrap();
    let gateway = Arc::new(SchemaGateway::bundled());
    let a = Mailbox::open(temp.path(), "agent_a", Arc::clone(&gateway)).unwrap();

    a.send("newcomer", MessageType::Notification, Map::new(), None)
        .unwrap();

    let newcomer = Mailbox::open(temp.path(), "newcomer", gateway).unwrap();
    assert_eq!(newcomer.receive(true).unwrap().len(), 1);
}

/// Outputs are validated before they are mailed.
#[test]
fn test_send_output() {
    let temp = tempdir().unwrap();
    let (a, b, gateway) = pair(temp.path(), "security", "reporter");

    let output = OutputBuilder::new(AgentInfo::new("Security Agent", "1.0.0", "security"))
        .result("data", json!({ "security_issues": [] }))
        .build();
    a.send_output("reporter", &output, None).unwrap();

    let message = b.receive(true).unwrap().remove(0);
    assert_eq!(message.message_type, MessageType::Notification);
    assert_eq!(message.payload["schema_version"], json!(OUTPUT_SCHEMA_VERSION));
    assert!(gateway
        .validate(&Value::Object(message.payload), AGENT_OUTPUT_SCHEMA)
        .unwrap()
        .valid);

    let bad = OutputBuilder::new(AgentInfo::new("Security Agent", "1.0.0", "astrology")).build();
    let err = a.send_output("reporter", &bad, None).unwrap_err();
    assert!(matches!(err, MailboxError::Schema(_)));
    assert_eq!(a.sent().unwrap().len(), 1);
}
