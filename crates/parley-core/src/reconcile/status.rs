//! Per-message status derivation.

use crate::event::{Event, EventStatus};
use crate::message::MessageView;

use super::correlation::CorrelationMap;

/// Annotates every message event of `batch` with its delivery status.
///
/// The status comes from the last event of the message's correlation group
/// when that event is a status event. Without one, a message followed by
/// another message in the same batch is considered settled (`ready`); the
/// final message stays undecided (`None`).
///
/// Only the current batch is consulted; statuses derived in earlier cycles
/// are ignored.
pub fn annotate_messages(batch: &[Event], correlations: &CorrelationMap<'_>) -> Vec<MessageView> {
    let messages: Vec<&Event> = batch.iter().filter(|e| e.is_message()).collect();

    messages
        .iter()
        .enumerate()
        .filter_map(|(i, event)| {
            let view = MessageView::from_event(event)?;
            let latest = correlations.latest_status(&event.correlation_id);
            let status = latest
                .map(|s| s.status)
                .or_else(|| (i + 1 < messages.len()).then_some(EventStatus::Ready));
            Some(view.with_status(status, latest))
        })
        .collect()
}
