//! Interfaces to the messaging backend.
//!
//! `parley-core` performs no I/O. The HTTP implementation lives in
//! `parley-interaction`; tests supply in-memory implementations.

use async_trait::async_trait;

use crate::error::Result;
use crate::event::{Event, EventCreationParams};
use crate::session::{Agent, Session, SessionCreationParams};

/// Default long-poll wait, in seconds.
pub const DEFAULT_WAIT_FOR_DATA_SECS: u64 = 60;

/// Options for a single `list_events` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEventsOptions {
    /// How long the server may hold the request waiting for new events.
    pub wait_for_data_secs: u64,
    /// Only events at or after this offset are returned.
    pub min_offset: u64,
}

impl ListEventsOptions {
    pub fn from_offset(min_offset: u64) -> Self {
        Self {
            wait_for_data_secs: DEFAULT_WAIT_FOR_DATA_SECS,
            min_offset,
        }
    }

    pub fn with_wait(mut self, wait_for_data_secs: u64) -> Self {
        self.wait_for_data_secs = wait_for_data_secs;
        self
    }
}

/// Session-oriented event log client.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Long-polls the session's event log.
    ///
    /// Returns as soon as at least one event at `min_offset` or later exists,
    /// or an empty list once the wait elapses. Events come back in ascending
    /// offset order.
    async fn list_events(&self, session_id: &str, options: ListEventsOptions) -> Result<Vec<Event>>;

    /// Appends an event to the session.
    async fn create_event(&self, session_id: &str, params: &EventCreationParams) -> Result<Event>;

    async fn create_session(&self, params: &SessionCreationParams) -> Result<Session>;

    async fn retrieve_session(&self, session_id: &str) -> Result<Session>;

    /// Looks up agent details.
    async fn retrieve_agent(&self, agent_id: &str) -> Result<Agent>;
}

/// Creates a session on first submission when the chat started without one.
///
/// Implementations create the session, submit `message` against it and
/// return the new session id so later polls target it.
#[async_trait]
pub trait SessionCreator: Send + Sync {
    async fn create_session(&self, message: EventCreationParams) -> Result<String>;
}
