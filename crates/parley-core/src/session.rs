//! Session and agent entities owned by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation on the backend. Referenced, never owned, by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_utc: Option<DateTime<Utc>>,
}

/// The agent answering in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Agent {
    /// An agent known only by a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: None,
        }
    }
}

/// Parameters for creating a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCreationParams {
    pub agent_id: String,
    /// Sent as a query flag, not in the body.
    #[serde(skip)]
    pub allow_greeting: bool,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

impl SessionCreationParams {
    pub fn new(agent_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            allow_greeting: false,
            title: title.into(),
            customer_id: None,
        }
    }

    pub fn with_customer_id(mut self, customer_id: Option<String>) -> Self {
        self.customer_id = customer_id;
        self
    }
}

/// Default title for sessions created on first submission.
pub fn default_session_title(now: DateTime<Utc>) -> String {
    format!("New Session - {}", now.to_rfc3339())
}
