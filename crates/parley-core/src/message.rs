//! Client-side message views.
//!
//! This module contains the status-annotated view over message events that
//! the presentation layer renders, and the optimistic placeholder shown while
//! a just-submitted message travels to the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{Event, EventSource, EventStatus, MessageData, Participant, StatusData};

/// A `message` event together with its derived delivery status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub source: EventSource,
    pub offset: u64,
    pub correlation_id: String,
    pub creation_utc: DateTime<Utc>,
    pub data: MessageData,
    /// Derived status; `None` means no verdict yet.
    pub status: Option<EventStatus>,
    /// Exception text, present only when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageView {
    /// Builds a view from a message event. Returns `None` for other kinds.
    pub fn from_event(event: &Event) -> Option<Self> {
        let data = event.as_message()?;
        Some(Self {
            id: event.id.clone(),
            source: event.source,
            offset: event.offset,
            correlation_id: event.correlation_id.clone(),
            creation_utc: event.creation_utc,
            data: data.clone(),
            status: None,
            error: None,
        })
    }

    /// Synthetic agent greeting shown before the conversation has any messages.
    pub fn opening(message: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            source: EventSource::HumanAgentOnBehalfOfAiAgent,
            offset: 0,
            correlation_id: String::new(),
            creation_utc: Utc::now(),
            data: MessageData {
                message: message.into(),
                participant: None,
            },
            status: Some(EventStatus::Ready),
            error: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.data.message
    }

    pub fn participant(&self) -> Option<&Participant> {
        self.data.participant.as_ref()
    }

    pub fn is_customer(&self) -> bool {
        self.source.is_customer()
    }

    /// Returns a copy whose status reflects `status_data`.
    ///
    /// The exception text is copied only for `error` statuses and cleared
    /// otherwise.
    pub fn with_status(&self, status: Option<EventStatus>, status_data: Option<&StatusData>) -> Self {
        let mut next = self.clone();
        next.status = status;
        next.error = match status {
            Some(EventStatus::Error) => status_data.and_then(|s| s.exception.clone()),
            _ => None,
        };
        next
    }
}

/// Optimistic placeholder for a customer message that the server has not
/// echoed back yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMessage {
    /// Local identifier, never sent to the server.
    pub local_id: String,
    pub source: EventSource,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

impl PendingMessage {
    /// An empty placeholder.
    pub fn empty() -> Self {
        Self {
            local_id: Uuid::new_v4().to_string(),
            source: EventSource::Customer,
            created_at: Utc::now(),
            message: String::new(),
        }
    }

    /// A placeholder holding freshly submitted text.
    pub fn submitted(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::empty()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

impl Default for PendingMessage {
    fn default() -> Self {
        Self::empty()
    }
}
