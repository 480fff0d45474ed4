//! ParlantHttpClient - REST implementation of the session event transport.
//!
//! Talks to a Parlant-style backend:
//! - `GET  /sessions/{id}/events` long-polls the event log
//! - `POST /sessions/{id}/events` appends a customer message
//! - `POST /sessions` / `GET /sessions/{id}` create and fetch sessions
//! - `GET  /agents/{id}` resolves agent details

use async_trait::async_trait;
use parley_core::config::ChatConfig;
use parley_core::error::{ParleyError, Result};
use parley_core::event::{Event, EventCreationParams};
use parley_core::session::{Agent, Session, SessionCreationParams};
use parley_core::transport::{EventTransport, ListEventsOptions};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_POLL_GRACE: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Event transport that talks to the backend over HTTP.
#[derive(Clone)]
pub struct ParlantHttpClient {
    client: Client,
    base_url: String,
    poll_grace: Duration,
    request_timeout: Duration,
}

impl ParlantHttpClient {
    /// Creates a client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_grace: DEFAULT_POLL_GRACE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Creates a client from the server URL and timeouts of `config`.
    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.server_url()).with_timeouts(
            Duration::from_secs(config.polling.poll_grace_secs),
            config.polling.request_timeout(),
        )
    }

    /// Sets the long-poll slack and the timeout of every other request.
    pub fn with_timeouts(mut self, poll_grace: Duration, request_timeout: Duration) -> Self {
        self.poll_grace = poll_grace;
        self.request_timeout = request_timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-success response into a transport error.
    async fn ensure_success(response: Response, context: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ParleyError::http_status(
            status.as_u16(),
            format!("{}: {}", context, error_text),
        ))
    }

    async fn decode<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
        let response = Self::ensure_success(response, context).await?;
        response.json::<T>().await.map_err(|e| ParleyError::Serialization {
            format: "JSON".to_string(),
            message: format!("{}: {}", context, e),
        })
    }
}

#[async_trait]
impl EventTransport for ParlantHttpClient {
    async fn list_events(&self, session_id: &str, options: ListEventsOptions) -> Result<Vec<Event>> {
        let url = self.url(&format!("/sessions/{}/events", session_id));
        tracing::debug!(
            "[ParlantHttpClient] list_events session={} min_offset={} wait_for_data={}",
            session_id,
            options.min_offset,
            options.wait_for_data_secs
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("min_offset", options.min_offset),
                ("wait_for_data", options.wait_for_data_secs),
            ])
            .timeout(Duration::from_secs(options.wait_for_data_secs) + self.poll_grace)
            .send()
            .await?;

        // The server answers 504 when the long poll elapsed without new data.
        if response.status() == StatusCode::GATEWAY_TIMEOUT {
            tracing::debug!("[ParlantHttpClient] long poll elapsed without data (session={})", session_id);
            return Ok(Vec::new());
        }

        let events: Vec<Event> = Self::decode(response, "Failed to list events").await?;
        tracing::debug!(
            "[ParlantHttpClient] received {} events for session {}",
            events.len(),
            session_id
        );
        Ok(events)
    }

    async fn create_event(&self, session_id: &str, params: &EventCreationParams) -> Result<Event> {
        let url = self.url(&format!("/sessions/{}/events", session_id));
        tracing::debug!(
            "[ParlantHttpClient] create_event session={} source={:?}",
            session_id,
            params.source
        );

        let response = self
            .client
            .post(&url)
            .json(params)
            .timeout(self.request_timeout)
            .send()
            .await?;

        Self::decode(response, "Failed to create event").await
    }

    async fn create_session(&self, params: &SessionCreationParams) -> Result<Session> {
        let url = self.url("/sessions");
        tracing::debug!("[ParlantHttpClient] create_session agent={}", params.agent_id);

        let response = self
            .client
            .post(&url)
            .query(&[("allow_greeting", params.allow_greeting)])
            .json(params)
            .timeout(self.request_timeout)
            .send()
            .await?;

        Self::decode(response, "Failed to create session").await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<Session> {
        let url = self.url(&format!("/sessions/{}", session_id));

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ParleyError::not_found("Session", session_id));
        }
        Self::decode(response, "Failed to retrieve session").await
    }

    async fn retrieve_agent(&self, agent_id: &str) -> Result<Agent> {
        let url = self.url(&format!("/agents/{}", agent_id));

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ParleyError::not_found("Agent", agent_id));
        }
        Self::decode(response, "Failed to retrieve agent").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::event::{EventSource, EventStatus};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message_json(offset: u64, correlation_id: &str, text: &str) -> serde_json::Value {
        json!({
            "id": format!("e{offset}"),
            "source": "customer",
            "kind": "message",
            "offset": offset,
            "correlation_id": correlation_id,
            "creation_utc": "2025-01-01T00:00:00Z",
            "data": {"message": text}
        })
    }

    fn status_json(offset: u64, correlation_id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": format!("e{offset}"),
            "source": "ai_agent",
            "kind": "status",
            "offset": offset,
            "correlation_id": correlation_id,
            "creation_utc": "2025-01-01T00:00:01Z",
            "data": {"status": status}
        })
    }

    #[tokio::test]
    async fn test_list_events_sends_offset_and_wait() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/events"))
            .and(query_param("min_offset", "3"))
            .and(query_param("wait_for_data", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                message_json(3, "a::1", "hi"),
                status_json(4, "a::2", "processing"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ParlantHttpClient::new(server.uri());
        let events = client
            .list_events("s1", ListEventsOptions::from_offset(3).with_wait(1))
            .await
            .expect("list_events should succeed");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_message().unwrap().message, "hi");
        assert_eq!(events[1].as_status().unwrap().status, EventStatus::Processing);
    }

    #[tokio::test]
    async fn test_list_events_gateway_timeout_is_empty_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/events"))
            .respond_with(ResponseTemplate::new(504).set_body_string("Request timed out"))
            .mount(&server)
            .await;

        let client = ParlantHttpClient::new(server.uri());
        let events = client
            .list_events("s1", ListEventsOptions::from_offset(0).with_wait(1))
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1/events"))
            .respond_with(ResponseTemplate::new(500).set_body_string("kaboom"))
            .mount(&server)
            .await;

        let client = ParlantHttpClient::new(server.uri());
        let err = client
            .list_events("s1", ListEventsOptions::from_offset(0).with_wait(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ParleyError::Transport { status: Some(500), .. }));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_create_event_posts_customer_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/s1/events"))
            .and(body_json(json!({"kind": "message", "source": "customer", "message": "hello"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(message_json(7, "x::1", "hello")))
            .expect(1)
            .mount(&server)
            .await;

        let client = ParlantHttpClient::new(server.uri());
        let event = client
            .create_event("s1", &EventCreationParams::customer_message("hello"))
            .await
            .unwrap();

        assert_eq!(event.offset, 7);
        assert_eq!(event.source, EventSource::Customer);
    }

    #[tokio::test]
    async fn test_create_session_disables_greeting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions"))
            .and(query_param("allow_greeting", "false"))
            .and(body_json(json!({"agent_id": "ag1", "title": "Support"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "s-new",
                "agent_id": "ag1",
                "title": "Support"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ParlantHttpClient::new(format!("{}/", server.uri()));
        let session = client
            .create_session(&SessionCreationParams::new("ag1", "Support"))
            .await
            .unwrap();
        assert_eq!(session.id, "s-new");
    }

    #[tokio::test]
    async fn test_missing_session_and_agent_are_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ParlantHttpClient::new(server.uri());
        assert!(client.retrieve_session("nope").await.unwrap_err().is_not_found());
        assert!(client.retrieve_agent("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_retrieve_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agents/ag1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ag1",
                "name": "Otto",
                "description": "Support agent",
                "max_engine_iterations": 3
            })))
            .mount(&server)
            .await;

        let client = ParlantHttpClient::new(server.uri());
        let agent = client.retrieve_agent("ag1").await.unwrap();
        assert_eq!(agent.name, "Otto");
    }

    #[tokio::test]
    async fn test_malformed_body_is_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ParlantHttpClient::new(server.uri());
        let err = client.retrieve_session("s1").await.unwrap_err();
        assert!(matches!(err, ParleyError::Serialization { .. }));
        assert!(!err.is_retryable());
    }
}
