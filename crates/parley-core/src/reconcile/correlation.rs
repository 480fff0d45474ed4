//! Grouping of a fetched batch by correlation root.

use std::collections::HashMap;

use crate::event::{Event, StatusData, correlation_root};

/// Events of one batch grouped by the root of their correlation id.
///
/// Groups keep fetch order. Events without a root (empty correlation id or
/// one starting with `::`) are left out entirely so unrelated events are never
/// conflated under an empty key.
#[derive(Debug, Default)]
pub struct CorrelationMap<'a> {
    groups: HashMap<&'a str, Vec<&'a Event>>,
}

impl<'a> CorrelationMap<'a> {
    pub fn build(events: &'a [Event]) -> Self {
        let mut groups: HashMap<&'a str, Vec<&'a Event>> = HashMap::new();
        for event in events {
            if let Some(root) = event.correlation_root() {
                groups.entry(root).or_default().push(event);
            }
        }
        Self { groups }
    }

    /// Events sharing the given root, in fetch order.
    pub fn group(&self, root: &str) -> Option<&[&'a Event]> {
        self.groups.get(root).map(Vec::as_slice)
    }

    /// Events correlated with the given (full) correlation id.
    pub fn group_for(&self, correlation_id: &str) -> Option<&[&'a Event]> {
        correlation_root(correlation_id).and_then(|root| self.group(root))
    }

    pub fn contains(&self, correlation_id: &str) -> bool {
        self.group_for(correlation_id).is_some()
    }

    /// Status payload of the last event of the group, if that event is a
    /// status event. The position in the batch decides, not the offset.
    pub fn latest_status(&self, correlation_id: &str) -> Option<&'a StatusData> {
        self.group_for(correlation_id)
            .and_then(|group| group.last())
            .and_then(|event| event.as_status())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
