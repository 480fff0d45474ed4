//! Domain core of Parley.
//!
//! Types for a session's event log, the status-annotated message views built
//! from it, and the pure reconciliation logic that keeps an offset-ordered
//! message list consistent across long-poll cycles. Network access is behind
//! the [`transport::EventTransport`] trait.

pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod reconcile;
pub mod session;
pub mod transport;

// Re-export common types
pub use config::{ChatConfig, PollingSettings};
pub use error::{ParleyError, Result};
pub use event::{
    Event, EventCreationParams, EventPayload, EventSource, EventStatus, MessageData, Participant,
    StatusData, StatusDetail,
};
pub use message::{MessageView, PendingMessage};
pub use reconcile::{BatchOutcome, CorrelationMap, Indicator, Timeline};
pub use session::{Agent, Session, SessionCreationParams};
pub use transport::{EventTransport, ListEventsOptions, SessionCreator};
