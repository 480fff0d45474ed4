//! Message reconciliation.
//!
//! This module turns polled event batches into the reconciled message list
//! the presentation layer renders.
//!
//! # Module Structure
//!
//! - `correlation`: grouping of a batch by correlation root (`CorrelationMap`)
//! - `status`: per-message status derivation (`annotate_messages`)
//! - `timeline`: the offset-keyed merge (`Timeline`, `merge_messages`)
//! - `indicator`: the session-level activity indicator (`Indicator`)

mod correlation;
mod indicator;
mod status;
mod timeline;

pub use correlation::CorrelationMap;
pub use indicator::Indicator;
pub use status::annotate_messages;
pub use timeline::{BatchOutcome, Timeline, merge_messages};
