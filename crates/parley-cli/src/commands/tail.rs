//! Read-only follow of an existing session.

use anyhow::{Result, bail};
use colored::Colorize;
use parley_core::config::ChatConfig;

use super::chat::spawn_renderer;

pub async fn run(config: ChatConfig) -> Result<()> {
    let Some(session_id) = config.session_id.clone() else {
        bail!("tail needs an existing session (--session or PARLEY_SESSION_ID)");
    };

    let chat = super::connect(config)?;
    let renderer = spawn_renderer(chat.subscribe());
    chat.start().await;
    tracing::info!("[Tail] Following session {}", session_id);

    println!("{}", format!("Following session {} (CTRL-C to stop)", session_id).bright_black());
    tokio::signal::ctrl_c().await?;

    chat.shutdown();
    drop(chat);
    let _ = renderer.await;
    tracing::info!("[Tail] Stopped");

    Ok(())
}
