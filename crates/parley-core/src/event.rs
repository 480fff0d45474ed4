//! Session event log types.
//!
//! Events are the server-ordered, append-only records of a session. On the
//! wire an event carries a loosely typed `kind` + `data` pair; here the pair is
//! decoded into [`EventPayload`] so message and status payloads are matched
//! exhaustively instead of being cast.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delimiter between the root and the suffix of a correlation id.
pub const CORRELATION_DELIMITER: &str = "::";

/// Who produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Customer,
    CustomerUi,
    HumanAgent,
    HumanAgentOnBehalfOfAiAgent,
    AiAgent,
    System,
    #[serde(other)]
    Unknown,
}

impl EventSource {
    /// Whether the event was written on behalf of the end user.
    pub fn is_customer(&self) -> bool {
        matches!(self, Self::Customer | Self::CustomerUi)
    }
}

/// Processing status reported by a `status` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Acknowledged,
    Cancelled,
    Processing,
    Typing,
    Ready,
    Error,
    #[serde(other)]
    Unknown,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acknowledged => "acknowledged",
            Self::Cancelled => "cancelled",
            Self::Processing => "processing",
            Self::Typing => "typing",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display information about the participant who wrote a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub display_name: String,
}

/// Payload of a `message` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<Participant>,
}

/// Nested detail of a status event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusDetail {
    /// Human-readable processing stage, e.g. "Searching".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

/// Payload of a `status` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusData {
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StatusDetail>,
}

impl StatusData {
    pub fn new(status: EventStatus) -> Self {
        Self {
            status,
            acknowledged_offset: None,
            exception: None,
            data: None,
        }
    }

    pub fn stage(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.stage.as_deref())
    }
}

/// Kind-discriminated event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Message(MessageData),
    Status(StatusData),
    /// Any other kind (`tool`, `custom`, ...). Carried through untouched.
    Other {
        kind: String,
        data: serde_json::Value,
    },
}

impl EventPayload {
    pub fn kind(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::Status(_) => "status",
            Self::Other { kind, .. } => kind,
        }
    }
}

/// A single record of a session's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent", into = "RawEvent")]
pub struct Event {
    pub id: String,
    pub source: EventSource,
    /// Server-assigned position, unique and strictly increasing per session.
    pub offset: u64,
    pub correlation_id: String,
    pub creation_utc: DateTime<Utc>,
    pub deleted: bool,
    pub payload: EventPayload,
}

impl Event {
    pub fn kind(&self) -> &str {
        self.payload.kind()
    }

    pub fn is_message(&self) -> bool {
        matches!(self.payload, EventPayload::Message(_))
    }

    pub fn as_message(&self) -> Option<&MessageData> {
        match &self.payload {
            EventPayload::Message(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<&StatusData> {
        match &self.payload {
            EventPayload::Status(data) => Some(data),
            _ => None,
        }
    }

    /// The part of the correlation id before `::`, or `None` when empty.
    pub fn correlation_root(&self) -> Option<&str> {
        correlation_root(&self.correlation_id)
    }
}

/// Extracts the root segment of a correlation id.
///
/// An empty root means "no correlation"; such events never share status.
pub fn correlation_root(correlation_id: &str) -> Option<&str> {
    let root = correlation_id
        .split(CORRELATION_DELIMITER)
        .next()
        .unwrap_or_default();
    (!root.is_empty()).then_some(root)
}

/// Wire representation of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEvent {
    id: String,
    source: EventSource,
    kind: String,
    offset: u64,
    #[serde(default)]
    correlation_id: String,
    creation_utc: DateTime<Utc>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    data: serde_json::Value,
}

impl TryFrom<RawEvent> for Event {
    type Error = serde_json::Error;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let payload = match raw.kind.as_str() {
            "message" => EventPayload::Message(serde_json::from_value(raw.data)?),
            "status" => EventPayload::Status(serde_json::from_value(raw.data)?),
            _ => EventPayload::Other {
                kind: raw.kind,
                data: raw.data,
            },
        };

        Ok(Self {
            id: raw.id,
            source: raw.source,
            offset: raw.offset,
            correlation_id: raw.correlation_id,
            creation_utc: raw.creation_utc,
            deleted: raw.deleted,
            payload,
        })
    }
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        let (kind, data) = match event.payload {
            EventPayload::Message(data) => (
                "message".to_string(),
                serde_json::to_value(data).unwrap_or_default(),
            ),
            EventPayload::Status(data) => (
                "status".to_string(),
                serde_json::to_value(data).unwrap_or_default(),
            ),
            EventPayload::Other { kind, data } => (kind, data),
        };

        Self {
            id: event.id,
            source: event.source,
            kind,
            offset: event.offset,
            correlation_id: event.correlation_id,
            creation_utc: event.creation_utc,
            deleted: event.deleted,
            data,
        }
    }
}

/// Parameters for appending an event to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCreationParams {
    pub kind: String,
    pub source: EventSource,
    pub message: String,
}

impl EventCreationParams {
    /// A message written by the end user.
    pub fn customer_message(message: impl Into<String>) -> Self {
        Self {
            kind: "message".to_string(),
            source: EventSource::Customer,
            message: message.into(),
        }
    }

    /// A message written by a human on behalf of the AI agent.
    pub fn agent_message(message: impl Into<String>) -> Self {
        Self {
            kind: "message".to_string(),
            source: EventSource::HumanAgentOnBehalfOfAiAgent,
            message: message.into(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Event builders shared by the core tests.

    use super::*;

    fn event(offset: u64, correlation_id: &str, source: EventSource, payload: EventPayload) -> Event {
        Event {
            id: format!("evt-{offset}"),
            source,
            offset,
            correlation_id: correlation_id.to_string(),
            creation_utc: DateTime::<Utc>::UNIX_EPOCH,
            deleted: false,
            payload,
        }
    }

    pub fn message(offset: u64, correlation_id: &str, source: EventSource, text: &str) -> Event {
        event(
            offset,
            correlation_id,
            source,
            EventPayload::Message(MessageData {
                message: text.to_string(),
                participant: None,
            }),
        )
    }

    pub fn customer(offset: u64, correlation_id: &str, text: &str) -> Event {
        message(offset, correlation_id, EventSource::Customer, text)
    }

    pub fn agent(offset: u64, correlation_id: &str, text: &str) -> Event {
        message(offset, correlation_id, EventSource::AiAgent, text)
    }

    pub fn status(offset: u64, correlation_id: &str, status: EventStatus) -> Event {
        event(
            offset,
            correlation_id,
            EventSource::AiAgent,
            EventPayload::Status(StatusData::new(status)),
        )
    }

    pub fn status_error(offset: u64, correlation_id: &str, exception: &str) -> Event {
        let mut data = StatusData::new(EventStatus::Error);
        data.exception = Some(exception.to_string());
        event(offset, correlation_id, EventSource::AiAgent, EventPayload::Status(data))
    }

    pub fn status_stage(offset: u64, correlation_id: &str, status: EventStatus, stage: &str) -> Event {
        let mut data = StatusData::new(status);
        data.data = Some(StatusDetail {
            stage: Some(stage.to_string()),
        });
        event(offset, correlation_id, EventSource::AiAgent, EventPayload::Status(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_message_event() {
        let raw = json!({
            "id": "e1",
            "source": "customer",
            "kind": "message",
            "offset": 0,
            "correlation_id": "a::1",
            "creation_utc": "2025-01-01T00:00:00Z",
            "data": {"message": "hi", "participant": {"display_name": "Jo"}}
        });

        let event: Event = serde_json::from_value(raw).unwrap();
        assert!(event.is_message());
        assert_eq!(event.source, EventSource::Customer);
        let data = event.as_message().unwrap();
        assert_eq!(data.message, "hi");
        assert_eq!(data.participant.as_ref().unwrap().display_name, "Jo");
        assert_eq!(event.correlation_root(), Some("a"));
    }

    #[test]
    fn test_decode_status_event_with_stage() {
        let raw = json!({
            "id": "e2",
            "source": "ai_agent",
            "kind": "status",
            "offset": 3,
            "correlation_id": "a::2",
            "creation_utc": "2025-01-01T00:00:01Z",
            "data": {"status": "processing", "data": {"stage": "Searching"}}
        });

        let event: Event = serde_json::from_value(raw).unwrap();
        let status = event.as_status().unwrap();
        assert_eq!(status.status, EventStatus::Processing);
        assert_eq!(status.stage(), Some("Searching"));
    }

    #[test]
    fn test_unknown_kind_and_status_are_tolerated() {
        let tool = json!({
            "id": "e3",
            "source": "system",
            "kind": "tool",
            "offset": 4,
            "correlation_id": "b::1",
            "creation_utc": "2025-01-01T00:00:02Z",
            "data": {"tool_calls": []}
        });
        let event: Event = serde_json::from_value(tool).unwrap();
        assert_eq!(event.kind(), "tool");
        assert!(!event.is_message());

        let odd_status = json!({
            "id": "e4",
            "source": "brand_new_source",
            "kind": "status",
            "offset": 5,
            "correlation_id": "b::2",
            "creation_utc": "2025-01-01T00:00:03Z",
            "data": {"status": "pondering"}
        });
        let event: Event = serde_json::from_value(odd_status).unwrap();
        assert_eq!(event.source, EventSource::Unknown);
        assert_eq!(event.as_status().unwrap().status, EventStatus::Unknown);
    }

    #[test]
    fn test_encode_keeps_wire_shape() {
        let event = fixtures::customer(7, "c::1", "hello");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "message");
        assert_eq!(value["offset"], 7);
        assert_eq!(value["data"]["message"], "hello");
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_correlation_root() {
        assert_eq!(correlation_root("abc::def::ghi"), Some("abc"));
        assert_eq!(correlation_root("abc"), Some("abc"));
        assert_eq!(correlation_root(""), None);
        assert_eq!(correlation_root("::orphan"), None);
    }

    #[test]
    fn test_creation_params_serialize() {
        let params = EventCreationParams::customer_message("hi");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value, json!({"kind": "message", "source": "customer", "message": "hi"}));
    }
}
