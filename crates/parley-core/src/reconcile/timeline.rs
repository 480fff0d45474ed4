//! The reconciled, offset-ordered message list.

use std::collections::BTreeMap;

use crate::event::Event;
use crate::message::{MessageView, PendingMessage};

use super::correlation::CorrelationMap;
use super::indicator::Indicator;
use super::status::annotate_messages;

/// What a call to [`Timeline::apply_batch`] changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Number of message events in the batch.
    pub new_messages: usize,
    /// Whether the optimistic placeholder was dropped.
    pub pending_cleared: bool,
    /// Offset of the last event of the batch.
    pub last_offset: Option<u64>,
}

/// Canonical message list of one chat instance.
///
/// Holds one [`MessageView`] per distinct message offset, ordered by ascending
/// offset with no gaps in content. Also owns the optimistic placeholder and
/// the current activity indicator, all of which change only through
/// [`Timeline::apply_batch`] and the pending-message setters.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    messages: Vec<MessageView>,
    pending: PendingMessage,
    indicator: Indicator,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[MessageView] {
        &self.messages
    }

    pub fn pending(&self) -> &PendingMessage {
        &self.pending
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages to render: the opening greeting while the conversation is
    /// still empty, the reconciled list otherwise.
    pub fn display_messages(&self, opening_message: Option<&str>) -> Vec<MessageView> {
        match opening_message {
            Some(text) if self.messages.is_empty() && !text.is_empty() => {
                vec![MessageView::opening(text)]
            }
            _ => self.messages.clone(),
        }
    }

    /// Shows `content` as the optimistic placeholder.
    pub fn set_pending(&mut self, content: impl Into<String>) {
        self.pending = PendingMessage::submitted(content);
    }

    pub fn clear_pending(&mut self) {
        self.pending = PendingMessage::empty();
    }

    /// Merges a freshly polled batch into the timeline.
    ///
    /// An empty batch (long-poll timeout) leaves everything untouched,
    /// including the indicator. Re-applying the same batch yields the same
    /// list.
    pub fn apply_batch(&mut self, batch: &[Event]) -> BatchOutcome {
        let Some(last) = batch.last() else {
            return BatchOutcome::default();
        };

        let correlations = CorrelationMap::build(batch);
        let annotated = annotate_messages(batch, &correlations);
        let new_messages = annotated.len();

        let pending_cleared = new_messages > 0 && !self.pending.is_empty();
        if pending_cleared {
            self.clear_pending();
        }

        self.messages = merge_messages(&self.messages, annotated, &correlations);
        self.indicator = Indicator::derive(batch, !self.messages.is_empty());

        BatchOutcome {
            new_messages,
            pending_cleared,
            last_offset: Some(last.offset),
        }
    }
}

/// Merges `incoming` into `current`, keyed by offset, with incoming entries
/// winning ties.
///
/// Before merging, a trailing customer message whose correlation group shows
/// up in the batch gets its status refreshed from that group's latest status
/// event. The result is always a new list; `current` is never modified.
pub fn merge_messages(
    current: &[MessageView],
    incoming: Vec<MessageView>,
    correlations: &CorrelationMap<'_>,
) -> Vec<MessageView> {
    let mut merged = current.to_vec();
    if let Some(patched) = current.last().and_then(|tail| patch_tail(tail, correlations)) {
        if let Some(slot) = merged.last_mut() {
            *slot = patched;
        }
    }

    if incoming.is_empty() {
        return merged;
    }

    let mut by_offset: BTreeMap<u64, MessageView> =
        merged.into_iter().map(|m| (m.offset, m)).collect();
    for message in incoming {
        by_offset.insert(message.offset, message);
    }
    by_offset.into_values().collect()
}

fn patch_tail(tail: &MessageView, correlations: &CorrelationMap<'_>) -> Option<MessageView> {
    if !tail.is_customer() {
        return None;
    }
    let latest = correlations.latest_status(&tail.correlation_id)?;
    Some(tail.with_status(Some(latest.status), Some(latest)))
}
