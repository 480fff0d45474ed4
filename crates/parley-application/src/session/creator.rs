//! Deferred session creation.
//!
//! A chat configured with only an agent id has no session until the first
//! message is submitted. `DefaultSessionCreator` creates it, seeds the
//! opening message and submits the pending message against it.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::config::ChatConfig;
use parley_core::error::{ParleyError, Result};
use parley_core::event::EventCreationParams;
use parley_core::session::{SessionCreationParams, default_session_title};
use parley_core::transport::{EventTransport, SessionCreator};
use std::sync::Arc;

/// Session creator backed by the event transport.
pub struct DefaultSessionCreator {
    transport: Arc<dyn EventTransport>,
    agent_id: String,
    customer_id: Option<String>,
    title: Option<String>,
    opening_message: Option<String>,
}

impl DefaultSessionCreator {
    /// Creates a creator for sessions with `agent_id`.
    pub fn new(transport: Arc<dyn EventTransport>, agent_id: impl Into<String>) -> Self {
        Self {
            transport,
            agent_id: agent_id.into(),
            customer_id: None,
            title: None,
            opening_message: None,
        }
    }

    /// Builds a creator from `config`, or `None` when no agent id is set.
    pub fn from_config(transport: Arc<dyn EventTransport>, config: &ChatConfig) -> Option<Self> {
        let agent_id = config.agent_id.clone()?;
        Some(
            Self::new(transport, agent_id)
                .with_customer_id(config.customer_id.clone())
                .with_title(config.session_title.clone())
                .with_opening_message(config.agent_opening_message.clone()),
        )
    }

    pub fn with_customer_id(mut self, customer_id: Option<String>) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_opening_message(mut self, opening_message: Option<String>) -> Self {
        self.opening_message = opening_message.filter(|m| !m.trim().is_empty());
        self
    }
}

#[async_trait]
impl SessionCreator for DefaultSessionCreator {
    async fn create_session(&self, message: EventCreationParams) -> Result<String> {
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| default_session_title(Utc::now()));
        let params = SessionCreationParams::new(&self.agent_id, title).with_customer_id(self.customer_id.clone());

        let session = self.transport.create_session(&params).await?;
        if session.id.is_empty() {
            tracing::error!("[SessionCreator] session was not created (agent={})", self.agent_id);
            return Err(ParleyError::session_creation("backend returned no session id"));
        }
        tracing::info!("[SessionCreator] Created session {} for agent {}", session.id, self.agent_id);

        if let Some(opening) = &self.opening_message {
            self.transport
                .create_event(&session.id, &EventCreationParams::agent_message(opening.clone()))
                .await?;
        }

        let event = self.transport.create_event(&session.id, &message).await?;
        if event.id.is_empty() {
            tracing::error!(
                "[SessionCreator] first message was not accepted by session {}",
                session.id
            );
            return Err(ParleyError::session_creation("first message was not accepted"));
        }

        Ok(session.id)
    }
}
