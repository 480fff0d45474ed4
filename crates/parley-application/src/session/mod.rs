//! Session application services.
//!
//! This module contains the services around one chat session: creating it on
//! demand and publishing its state to the presentation layer.

mod creator;
mod snapshot;

pub use creator::DefaultSessionCreator;
pub use snapshot::ChatSnapshot;
