//! Turns successive chat snapshots into transcript lines.

use std::collections::HashMap;

use colored::Colorize;
use parley_application::ChatSnapshot;
use parley_core::event::EventStatus;
use parley_core::message::MessageView;

/// One line of terminal output.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderLine {
    Message {
        speaker: String,
        text: String,
        from_customer: bool,
    },
    /// A customer message the agent failed to process.
    Failed { text: String, error: Option<String> },
    Indicator(String),
}

impl RenderLine {
    pub fn print(&self) {
        match self {
            RenderLine::Message {
                speaker,
                text,
                from_customer,
            } => {
                if *from_customer {
                    println!("{}", format!("[{}]", speaker).green());
                    for line in text.lines() {
                        println!("{}", line.green());
                    }
                } else {
                    println!("{}", format!("[{}]", speaker).bright_magenta());
                    for line in text.lines() {
                        println!("{}", line.bright_blue());
                    }
                }
                println!();
            }
            RenderLine::Failed { text, error } => {
                let reason = error.as_deref().unwrap_or("unknown error");
                eprintln!("{}", format!("Message not processed ({}): {}", reason, text).red());
            }
            RenderLine::Indicator(text) => println!("{}", text.bright_black()),
        }
    }
}

/// Remembers what has been printed so each snapshot only yields new output.
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    printed: HashMap<u64, Option<EventStatus>>,
    opening_printed: bool,
    indicator: String,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: &ChatSnapshot) -> Vec<RenderLine> {
        let mut lines = Vec::new();
        let agent_name = snapshot.agent_name().unwrap_or("Agent");

        for message in snapshot.messages.iter() {
            // The opening greeting is synthetic and has no event id.
            if message.id.is_empty() {
                if !self.opening_printed {
                    self.opening_printed = true;
                    lines.push(message_line(message, agent_name));
                }
                continue;
            }

            match self.printed.insert(message.offset, message.status) {
                None => {
                    lines.push(message_line(message, agent_name));
                    if message.status == Some(EventStatus::Error) {
                        lines.push(failed_line(message));
                    }
                }
                Some(previous) => {
                    if previous != Some(EventStatus::Error) && message.status == Some(EventStatus::Error) {
                        lines.push(failed_line(message));
                    }
                }
            }
        }

        let indicator = snapshot.indicator_text();
        if indicator != self.indicator {
            if !indicator.is_empty() {
                lines.push(RenderLine::Indicator(indicator.clone()));
            }
            self.indicator = indicator;
        }

        lines
    }
}

fn message_line(message: &MessageView, agent_name: &str) -> RenderLine {
    let speaker = if message.is_customer() {
        "You".to_string()
    } else {
        message
            .participant()
            .map(|p| p.display_name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| agent_name.to_string())
    };
    RenderLine::Message {
        speaker,
        text: message.text().to_string(),
        from_customer: message.is_customer(),
    }
}

fn failed_line(message: &MessageView) -> RenderLine {
    RenderLine::Failed {
        text: message.text().to_string(),
        error: message.error.clone(),
    }
}
