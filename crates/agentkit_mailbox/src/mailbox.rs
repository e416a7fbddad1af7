//! File-based mailbox shared by all agents under one root directory.
//!
//! Layout: `{root}/{agent}/{inbox|outbox|read}/{message_id}.json`.
//!
//! Delivery is best effort. There is no locking: two consumers draining the
//! same inbox may both observe an envelope before either moves it, and a
//! crash between the outbox and inbox writes can leave an outbox-only copy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use agentkit_schema::{SchemaGateway, INTER_AGENT_MESSAGE_SCHEMA};

use crate::envelope::{Message, MessageType};
use crate::error::{MailboxError, MailboxResult};
use crate::output::AgentOutput;

const INBOX: &str = "inbox";
const OUTBOX: &str = "outbox";
const READ: &str = "read";

/// Default mailbox root, relative to the working directory.
pub const DEFAULT_MAILBOX_ROOT: &str = ".agent-messages";

/// Reject names that could not be used as a single path component.
fn check_agent_name(name: &str) -> MailboxResult<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(MailboxError::InvalidAgentName(name.to_string()))
    }
}

/// Write `bytes` to `{dir}/{file_name}` through a temporary sibling and a rename.
fn write_then_rename(dir: &Path, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let target = dir.join(file_name);
    let staging = dir.join(format!("{}.tmp", file_name));
    fs::write(&staging, bytes)?;
    fs::rename(&staging, &target)?;
    Ok(target)
}

fn is_envelope_file(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// One agent's view of the shared mailbox tree.
pub struct Mailbox {
    root: PathBuf,
    agent: String,
    gateway: Arc<SchemaGateway>,
}

impl Mailbox {
    /// Open the mailbox for `agent`, creating its directories if needed.
    pub fn open(
        root: impl Into<PathBuf>,
        agent: impl Into<String>,
        gateway: Arc<SchemaGateway>,
    ) -> MailboxResult<Self> {
        let agent = agent.into();
        check_agent_name(&agent)?;

        let mailbox = Self {
            root: root.into(),
            agent,
            gateway,
        };
        for dir in [mailbox.inbox_dir(), mailbox.outbox_dir(), mailbox.read_dir()] {
            fs::create_dir_all(&dir)?;
        }
        debug!("Opened mailbox for {} at {:?}", mailbox.agent, mailbox.root);
        Ok(mailbox)
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn inbox_dir(&self) -> PathBuf {
        self.root.join(&self.agent).join(INBOX)
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.root.join(&self.agent).join(OUTBOX)
    }

    pub fn read_dir(&self) -> PathBuf {
        self.root.join(&self.agent).join(READ)
    }

    /// Send a message from this agent and return its id.
    pub fn send(
        &self,
        to_agent: &str,
        message_type: MessageType,
        payload: Map<String, Value>,
        correlation_id: Option<&str>,
    ) -> MailboxResult<String> {
        let mut message = Message::new(&self.agent, to_agent, message_type, payload);
        message.correlation_id = correlation_id.map(str::to_string);
        self.deliver(&message)?;
        Ok(message.message_id)
    }

    /// Answer `original`, addressed back to its sender and correlated by id.
    ///
    /// The response is sent as `original.to_agent`. There is no waiting; the
    /// requester finds the reply on its next `receive`.
    pub fn send_response(&self, original: &Message, payload: Map<String, Value>) -> MailboxResult<String> {
        if original.to_agent != self.agent {
            debug!(
                "Responding as {} from the mailbox of {}",
                original.to_agent, self.agent
            );
        }
        let message = Message::new(
            &original.to_agent,
            &original.from_agent,
            MessageType::Response,
            payload,
        )
        .with_correlation_id(&original.message_id);
        self.deliver(&message)?;
        Ok(message.message_id)
    }

    /// Mail an agent output as the payload of a message.
    ///
    /// The output is validated against the output schema before anything is
    /// written; the message itself is then validated as usual.
    pub fn send_output(
        &self,
        to_agent: &str,
        output: &AgentOutput,
        correlation_id: Option<&str>,
    ) -> MailboxResult<String> {
        output.validate(&self.gateway)?;
        let payload: Map<String, Value> = serde_json::from_value(output.to_value()?)?;
        let message_type = if correlation_id.is_some() {
            MessageType::Response
        } else {
            MessageType::Notification
        };
        self.send(to_agent, message_type, payload, correlation_id)
    }

    /// Validate, then persist to the sender's outbox and the recipient's inbox.
    ///
    /// Nothing is written unless validation passes.
    fn deliver(&self, message: &Message) -> MailboxResult<()> {
        let instance = serde_json::to_value(message)?;
        let report = self.gateway.validate(&instance, INTER_AGENT_MESSAGE_SCHEMA)?;
        if !report.valid {
            warn!(
                "Rejected message from {} to {}: {:?}",
                message.from_agent, message.to_agent, report.errors
            );
            return Err(MailboxError::Validation(report.errors));
        }
        check_agent_name(&message.from_agent)?;
        check_agent_name(&message.to_agent)?;

        let bytes = serde_json::to_vec_pretty(&instance)?;
        let file_name = message.file_name();

        let outbox = self.root.join(&message.from_agent).join(OUTBOX);
        write_then_rename(&outbox, &file_name, &bytes)?;

        let recipient = self.root.join(&message.to_agent);
        for dir in [OUTBOX, READ] {
            fs::create_dir_all(recipient.join(dir))?;
        }
        write_then_rename(&recipient.join(INBOX), &file_name, &bytes)?;

        info!(
            "Sent {} {} from {} to {}",
            message.message_type, message.message_id, message.from_agent, message.to_agent
        );
        Ok(())
    }

    /// Return every envelope in the inbox, moving each to `read` if `mark_read`.
    ///
    /// Order follows directory enumeration. Unparsable files are logged and
    /// left where they are. With `mark_read`, an envelope that cannot be moved
    /// stays in the inbox and is not returned.
    pub fn receive(&self, mark_read: bool) -> MailboxResult<Vec<Message>> {
        let inbox = self.inbox_dir();
        let mut messages = Vec::new();
        if mark_read {
            fs::create_dir_all(self.read_dir())?;
        }

        for path in Self::envelope_files(&inbox)? {
            let Some(message) = Self::read_envelope(&path)? else {
                continue;
            };

            if mark_read {
                if let Err(e) = self.move_to_read(&path, &message) {
                    warn!(
                        "Could not mark {} as read, leaving it in the inbox: {}",
                        message.message_id, e
                    );
                    continue;
                }
            }
            messages.push(message);
        }

        if !messages.is_empty() {
            info!("{} received {} message(s)", self.agent, messages.len());
        }
        Ok(messages)
    }

    /// Move a message previously peeked with `receive(false)` to `read`.
    pub fn mark_read(&self, message: &Message) -> MailboxResult<()> {
        fs::create_dir_all(self.read_dir())?;
        let path = self.inbox_dir().join(message.file_name());
        self.move_to_read(&path, message)?;
        Ok(())
    }

    /// A vanished source means another reader already claimed it.
    fn move_to_read(&self, path: &Path, message: &Message) -> io::Result<()> {
        let Some(name) = path.file_name() else {
            return Ok(());
        };
        match fs::rename(path, self.read_dir().join(name)) {
            Ok(()) => {
                debug!("Marked {} as read", message.message_id);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} was claimed by another reader", message.message_id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Envelopes this agent has sent.
    pub fn sent(&self) -> MailboxResult<Vec<Message>> {
        self.list(&self.outbox_dir())
    }

    /// Envelopes already received and marked read.
    pub fn archived(&self) -> MailboxResult<Vec<Message>> {
        self.list(&self.read_dir())
    }

    /// Number of envelope files waiting in the inbox.
    pub fn pending_count(&self) -> MailboxResult<usize> {
        Ok(Self::envelope_files(&self.inbox_dir())?.len())
    }

    fn list(&self, dir: &Path) -> MailboxResult<Vec<Message>> {
        let mut messages = Vec::new();
        for path in Self::envelope_files(dir)? {
            if let Some(message) = Self::read_envelope(&path)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    fn envelope_files(dir: &Path) -> MailboxResult<Vec<PathBuf>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if is_envelope_file(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// `Ok(None)` for a file that vanished or does not parse.
    fn read_envelope(path: &Path) -> MailboxResult<Option<Message>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(message) => Ok(Some(message)),
            Err(e) => {
                warn!("Error reading message {:?}: {}", path, e);
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("root", &self.root)
            .field("agent", &self.agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn test_open_creates_directories() {
        let temp = tempdir().unwrap();
        let mailbox = Mailbox::open(temp.path(), "test_agent", Arc::new(SchemaGateway::bundled())).unwrap();

        assert!(temp.path().join("test_agent").join("inbox").is_dir());
        assert!(mailbox.outbox_dir().is_dir());
        assert!(mailbox.read_dir().is_dir());
    }

    #[test]
    fn test_open_rejects_path_like_names() {
        let temp = tempdir().unwrap();
        let gateway = Arc::new(SchemaGateway::bundled());
        for name in ["", "..", "a/b", "../up"] {
            let err = Mailbox::open(temp.path(), name, Arc::clone(&gateway)).unwrap_err();
            assert!(matches!(err, MailboxError::InvalidAgentName(_)));
        }
    }

    #[test]
    fn test_send_writes_outbox_and_inbox() {
        let temp = tempdir().unwrap();
        let sender = Mailbox::open(temp.path(), "agent1", Arc::new(SchemaGateway::bundled())).unwrap();

        let id = sender
            .send("agent2", MessageType::Request, payload(json!({ "test": "data" })), None)
            .unwrap();

        let outbox_file = sender.outbox_dir().join(format!("{}.json", id));
        let inbox_file = temp.path().join("agent2").join("inbox").join(format!("{}.json", id));
        assert!(outbox_file.is_file());
        assert!(inbox_file.is_file());
        assert_eq!(
            fs::read_to_string(&outbox_file).unwrap(),
            fs::read_to_string(&inbox_file).unwrap()
        );
        // Recipient directories are created on demand.
        assert!(temp.path().join("agent2").join("read").is_dir());

        let stored: Value = serde_json::from_str(&fs::read_to_string(&outbox_file).unwrap()).unwrap();
        assert_eq!(stored["from_agent"], json!("agent1"));
        assert_eq!(stored["message_type"], json!("request"));
    }

    #[test]
    fn test_rejected_message_writes_nothing() {
        let temp = tempdir().unwrap();
        let sender = Mailbox::open(temp.path(), "agent1", Arc::new(SchemaGateway::bundled())).unwrap();

        let err = sender
            .send("../outside", MessageType::Request, Map::new(), None)
            .unwrap_err();
        assert!(!err.violations().is_empty());
        assert_eq!(fs::read_dir(sender.outbox_dir()).unwrap().count(), 0);
        assert!(!temp.path().join("outside").exists());
    }

    #[test]
    fn test_receive_skips_staging_and_corrupt_files() {
        let temp = tempdir().unwrap();
        let gateway = Arc::new(SchemaGateway::bundled());
        let sender = Mailbox::open(temp.path(), "a", Arc::clone(&gateway)).unwrap();
        let receiver = Mailbox::open(temp.path(), "b", gateway).unwrap();

        sender.send("b", MessageType::Notification, Map::new(), None).unwrap();
        fs::write(receiver.inbox_dir().join("half.json.tmp"), "{").unwrap();
        fs::write(receiver.inbox_dir().join("garbage.json"), "not json").unwrap();

        let messages = receiver.receive(true).unwrap();
        assert_eq!(messages.len(), 1);
        // The corrupt envelope stays in the inbox for inspection.
        assert!(receiver.inbox_dir().join("garbage.json").exists());
        assert_eq!(receiver.pending_count().unwrap(), 1);
    }

    #[test]
    fn test_receive_keeps_unmovable_envelopes_in_inbox() {
        let temp = tempdir().unwrap();
        let gateway = Arc::new(SchemaGateway::bundled());
        let sender = Mailbox::open(temp.path(), "a", Arc::clone(&gateway)).unwrap();
        let receiver = Mailbox::open(temp.path(), "b", gateway).unwrap();

        let ids: Vec<String> = (0..4)
            .map(|i| {
                sender
                    .send("b", MessageType::Notification, payload(json!({ "n": i })), None)
                    .unwrap()
            })
            .collect();

        // A non-empty directory in the way makes one rename fail.
        let blocker = receiver.read_dir().join(format!("{}.json", ids[3]));
        fs::create_dir_all(blocker.join("occupied")).unwrap();

        let messages = receiver.receive(true).unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.message_id != ids[3]));
        assert_eq!(receiver.archived().unwrap().len(), 3);
        assert_eq!(receiver.pending_count().unwrap(), 1);

        fs::remove_dir_all(&blocker).unwrap();
        let retried = receiver.receive(true).unwrap();
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].message_id, ids[3]);
        assert_eq!(receiver.pending_count().unwrap(), 0);
    }

    #[test]
    fn test_mark_read_after_peek() {
        let temp = tempdir().unwrap();
        let gateway = Arc::new(SchemaGateway::bundled());
        let sender = Mailbox::open(temp.path(), "a", Arc::clone(&gateway)).unwrap();
        let receiver = Mailbox::open(temp.path(), "b", gateway).unwrap();
        sender.send("b", MessageType::Request, Map::new(), None).unwrap();

        let peeked = receiver.receive(false).unwrap();
        assert_eq!(receiver.pending_count().unwrap(), 1);
        receiver.mark_read(&peeked[0]).unwrap();
        assert_eq!(receiver.pending_count().unwrap(), 0);
        assert_eq!(receiver.archived().unwrap()[0].message_id, peeked[0].message_id);

        // Already claimed: nothing left to move.
        receiver.mark_read(&peeked[0]).unwrap();
    }
}
