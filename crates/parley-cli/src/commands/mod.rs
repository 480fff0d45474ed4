pub mod chat;
pub mod render;
pub mod tail;

use std::sync::Arc;

use anyhow::Result;
use parley_application::ChatSession;
use parley_core::config::ChatConfig;
use parley_interaction::ParlantHttpClient;

/// Builds a chat over HTTP. Configuration errors surface before anything is
/// polled.
pub fn connect(config: ChatConfig) -> Result<ChatSession> {
    let transport = Arc::new(ParlantHttpClient::from_config(&config));
    Ok(ChatSession::new(config, transport)?)
}
