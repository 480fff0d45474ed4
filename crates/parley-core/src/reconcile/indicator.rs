//! Session-level "thinking"/"typing" indicator.

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventStatus};

const DEFAULT_STAGE: &str = "Thinking";

/// Transient activity indicator derived from the last status event of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Indicator {
    #[default]
    Idle,
    /// The agent is working; `stage` labels what it is doing.
    Thinking { stage: Option<String> },
    Typing,
}

impl Indicator {
    /// Derives the indicator for `batch`.
    ///
    /// `has_messages` tells whether the reconciled list is non-empty; a
    /// processing status on an empty conversation shows nothing.
    pub fn derive(batch: &[Event], has_messages: bool) -> Self {
        let Some(status) = batch.iter().rev().find_map(Event::as_status) else {
            return Self::Idle;
        };

        match status.status {
            EventStatus::Processing if has_messages => Self::Thinking {
                stage: status
                    .stage()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            },
            EventStatus::Typing => Self::Typing,
            _ => Self::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// User-facing text; empty when idle.
    pub fn text(&self) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Thinking { stage } => format!("{}...", stage.as_deref().unwrap_or(DEFAULT_STAGE)),
            Self::Typing => "Typing...".to_string(),
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}
