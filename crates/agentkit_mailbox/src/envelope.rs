//! The inter-agent message envelope.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::MailboxError;

/// Kind of message carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Request,
    Response,
    Notification,
    Error,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Notification => "notification",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = MailboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "request" => Ok(Self::Request),
            "response" => Ok(Self::Response),
            "notification" => Ok(Self::Notification),
            "error" => Ok(Self::Error),
            other => Err(MailboxError::UnknownMessageType(other.to_string())),
        }
    }
}

/// One message, persisted as one JSON document per file.
///
/// Envelopes are never modified after they are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    /// ISO-8601 creation time
    pub timestamp: String,
    pub from_agent: String,
    pub to_agent: String,
    pub message_type: MessageType,
    pub payload: Map<String, Value>,
    /// The request's id, when this message answers one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Message {
    /// Build a new envelope with a fresh random id and the current time.
    pub fn new(
        from_agent: impl Into<String>,
        to_agent: impl Into<String>,
        message_type: MessageType,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            from_agent: from_agent.into(),
            to_agent: to_agent.into(),
            message_type,
            payload,
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// File name under which this envelope is stored.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.message_id)
    }

    /// Whether this message answers `request`.
    pub fn answers(&self, request: &Message) -> bool {
        self.correlation_id.as_deref() == Some(request.message_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_parsing() {
        assert_eq!("request".parse::<MessageType>().unwrap(), MessageType::Request);
        assert_eq!("ERROR".parse::<MessageType>().unwrap(), MessageType::Error);
        assert!("broadcast".parse::<MessageType>().is_err());
        assert_eq!(MessageType::Notification.to_string(), "notification");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Message::new("a", "b", MessageType::Request, Map::new());
        let b = Message::new("a", "b", MessageType::Request, Map::new());
        assert_ne!(a.message_id, b.message_id);
        assert!(Uuid::parse_str(&a.message_id).is_ok());
    }

    #[test]
    fn test_wire_format() {
        let mut payload = Map::new();
        payload.insert("path".to_string(), json!("src/"));
        let message = Message::new("scanner", "worker", MessageType::Request, payload);

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["message_type"], json!("request"));
        assert_eq!(value["payload"]["path"], json!("src/"));
        assert!(value.get("correlation_id").is_none());

        let reply = Message::new("worker", "scanner", MessageType::Response, Map::new())
            .with_correlation_id(&message.message_id);
        assert!(reply.answers(&message));
    }
}
