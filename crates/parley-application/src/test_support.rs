//! In-memory transport and event builders for the application tests.

use async_trait::async_trait;
use parley_core::error::{ParleyError, Result};
use parley_core::event::{Event, EventCreationParams};
use parley_core::session::{Agent, Session, SessionCreationParams};
use parley_core::transport::{EventTransport, ListEventsOptions};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn event(offset: u64, correlation_id: &str, source: &str, kind: &str, data: serde_json::Value) -> Event {
    serde_json::from_value(json!({
        "id": format!("evt-{offset}"),
        "source": source,
        "kind": kind,
        "offset": offset,
        "correlation_id": correlation_id,
        "creation_utc": "2025-01-01T00:00:00Z",
        "data": data
    }))
    .expect("valid event json")
}

pub fn customer_event(offset: u64, correlation_id: &str, text: &str) -> Event {
    event(offset, correlation_id, "customer", "message", json!({"message": text}))
}

pub fn agent_event(offset: u64, correlation_id: &str, text: &str) -> Event {
    event(offset, correlation_id, "ai_agent", "message", json!({"message": text}))
}

pub fn status_event(offset: u64, correlation_id: &str, status: &str) -> Event {
    event(offset, correlation_id, "ai_agent", "status", json!({"status": status}))
}

pub fn stage_event(offset: u64, correlation_id: &str, stage: &str) -> Event {
    event(
        offset,
        correlation_id,
        "ai_agent",
        "status",
        json!({"status": "processing", "data": {"stage": stage}}),
    )
}

/// Scripted transport.
///
/// `list_events` pops scripted responses in order, each after its scripted
/// delay; once the script runs dry it behaves like a long poll with no new
/// data and blocks for an hour.
#[derive(Default)]
pub struct MockTransport {
    batches: Mutex<VecDeque<(Duration, Result<Vec<Event>>)>>,
    list_calls: Mutex<Vec<(String, ListEventsOptions)>>,
    created_events: Mutex<Vec<(String, EventCreationParams)>>,
    created_sessions: Mutex<Vec<SessionCreationParams>>,
    next_session_id: Mutex<Option<String>>,
    create_session_delay: Mutex<Duration>,
    fail_create_event: Mutex<Option<ParleyError>>,
    session: Mutex<Option<Session>>,
    agent: Mutex<Option<Agent>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, batch: Vec<Event>) {
        self.batches.lock().unwrap().push_back((Duration::ZERO, Ok(batch)));
    }

    pub fn push_error(&self, error: ParleyError) {
        self.batches.lock().unwrap().push_back((Duration::ZERO, Err(error)));
    }

    /// Answers the next poll with `batch` only after `delay`.
    pub fn push_delayed_batch(&self, delay: Duration, batch: Vec<Event>) {
        self.batches.lock().unwrap().push_back((delay, Ok(batch)));
    }

    pub fn set_create_session_delay(&self, delay: Duration) {
        *self.create_session_delay.lock().unwrap() = delay;
    }

    pub fn set_next_session_id(&self, id: &str) {
        *self.next_session_id.lock().unwrap() = Some(id.to_string());
    }

    pub fn fail_create_event(&self, error: ParleyError) {
        *self.fail_create_event.lock().unwrap() = Some(error);
    }

    pub fn set_session(&self, session: Session) {
        *self.session.lock().unwrap() = Some(session);
    }

    pub fn set_agent(&self, agent: Agent) {
        *self.agent.lock().unwrap() = Some(agent);
    }

    pub fn list_calls(&self) -> Vec<(String, ListEventsOptions)> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn created_events(&self) -> Vec<(String, EventCreationParams)> {
        self.created_events.lock().unwrap().clone()
    }

    pub fn created_sessions(&self) -> Vec<SessionCreationParams> {
        self.created_sessions.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventTransport for MockTransport {
    async fn list_events(&self, session_id: &str, options: ListEventsOptions) -> Result<Vec<Event>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        self.list_calls
            .lock()
            .unwrap()
            .push((session_id.to_string(), options));

        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn create_event(&self, session_id: &str, params: &EventCreationParams) -> Result<Event> {
        if let Some(error) = self.fail_create_event.lock().unwrap().clone() {
            return Err(error);
        }
        let mut created = self.created_events.lock().unwrap();
        created.push((session_id.to_string(), params.clone()));
        let offset = created.len() as u64 - 1;
        Ok(customer_event(offset, "created::1", &params.message))
    }

    async fn create_session(&self, params: &SessionCreationParams) -> Result<Session> {
        let delay = *self.create_session_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.created_sessions.lock().unwrap().push(params.clone());
        let id = self.next_session_id.lock().unwrap().clone().unwrap_or_default();
        Ok(Session {
            id,
            agent_id: params.agent_id.clone(),
            customer_id: params.customer_id.clone(),
            title: Some(params.title.clone()),
            creation_utc: None,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<Session> {
        self.session
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ParleyError::not_found("Session", session_id))
    }

    async fn retrieve_agent(&self, agent_id: &str) -> Result<Agent> {
        self.agent
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ParleyError::not_found("Agent", agent_id))
    }
}
