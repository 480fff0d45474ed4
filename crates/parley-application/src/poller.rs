//! Long-poll driver for a session's event log.
//!
//! `EventPoller` owns the next offset to request and advances it after every
//! non-empty batch. It performs exactly one request per [`EventPoller::poll`]
//! call; chaining, pacing and cancellation are up to the caller.

use parley_core::config::PollingSettings;
use parley_core::error::Result;
use parley_core::event::Event;
use parley_core::transport::{EventTransport, ListEventsOptions};
use std::sync::Arc;
use std::time::Duration;

/// Exponential backoff after consecutive failures.
///
/// The n-th consecutive failure waits `initial * 2^(n-1)`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    consecutive_failures: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            consecutive_failures: 0,
        }
    }

    pub fn from_settings(settings: &PollingSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.backoff_initial_ms),
            Duration::from_millis(settings.backoff_max_ms),
        )
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Delay before the next attempt. Zero when the last attempt succeeded.
    pub fn delay(&self) -> Duration {
        if self.consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (self.consecutive_failures - 1).min(16);
        self.initial.saturating_mul(1u32 << exponent).min(self.max)
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }
}

/// Issues `list_events` calls for one session, tracking the offset cursor.
pub struct EventPoller {
    transport: Arc<dyn EventTransport>,
    session_id: String,
    min_offset: u64,
    wait_for_data_secs: u64,
    backoff: Backoff,
}

impl EventPoller {
    pub fn new(transport: Arc<dyn EventTransport>, session_id: impl Into<String>, settings: &PollingSettings) -> Self {
        Self {
            transport,
            session_id: session_id.into(),
            min_offset: 0,
            wait_for_data_secs: settings.wait_for_data_secs,
            backoff: Backoff::from_settings(settings),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Offset the next request starts from.
    pub fn min_offset(&self) -> u64 {
        self.min_offset
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Performs one long poll.
    ///
    /// On success the cursor moves to one past the last returned event; it
    /// never moves backwards and stops at `u64::MAX`. Failures leave the cursor untouched and grow
    /// the backoff.
    pub async fn poll(&mut self) -> Result<Vec<Event>> {
        let options = ListEventsOptions::from_offset(self.min_offset).with_wait(self.wait_for_data_secs);

        match self.transport.list_events(&self.session_id, options).await {
            Ok(events) => {
                self.backoff.record_success();
                if let Some(last) = events.last() {
                    self.min_offset = self.min_offset.max(last.offset.saturating_add(1));
                }
                Ok(events)
            }
            Err(e) => {
                self.backoff.record_failure();
                Err(e)
            }
        }
    }
}
