//! Read-only view of a chat handed to the presentation layer.

use parley_core::message::{MessageView, PendingMessage};
use parley_core::reconcile::{Indicator, Timeline};
use parley_core::session::{Agent, Session};
use std::sync::Arc;

/// Everything a renderer needs, captured at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ChatSnapshot {
    pub session_id: Option<String>,
    pub session: Option<Session>,
    pub agent: Option<Agent>,
    /// Messages to render, including the opening greeting while empty.
    pub messages: Arc<Vec<MessageView>>,
    /// The optimistic placeholder, when a submission is in flight.
    pub pending: Option<PendingMessage>,
    pub indicator: Indicator,
}

impl ChatSnapshot {
    pub(crate) fn capture(
        timeline: &Timeline,
        opening_message: Option<&str>,
        session_id: Option<String>,
        session: Option<Session>,
        agent: Option<Agent>,
    ) -> Self {
        let pending = timeline.pending();
        Self {
            session_id,
            session,
            agent,
            messages: Arc::new(timeline.display_messages(opening_message)),
            pending: (!pending.is_empty()).then(|| pending.clone()),
            indicator: timeline.indicator().clone(),
        }
    }

    pub fn agent_name(&self) -> Option<&str> {
        self.agent.as_ref().map(|a| a.name.as_str())
    }

    pub fn indicator_text(&self) -> String {
        self.indicator.text()
    }
}
