//! Application layer for Parley.
//!
//! This crate drives a chat: the long-poll loop over a session's event log,
//! deferred session creation, and the [`ChatSession`] use case that publishes
//! reconciled snapshots to the presentation layer.

mod chat_session;
pub mod poller;
pub mod session;

#[cfg(test)]
mod test_support;

pub use chat_session::{ChatSession, SessionCreatedCallback};
pub use poller::{Backoff, EventPoller};
pub use session::{ChatSnapshot, DefaultSessionCreator};
