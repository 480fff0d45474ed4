//! Interactive chat REPL.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use colored::Colorize;
use parley_application::{ChatSession, ChatSnapshot};
use parley_core::config::ChatConfig;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::render::TranscriptRenderer;

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];
const SESSION_COMMAND: &str = "/session";

/// Completion and highlighting for slash commands.
///
/// `/session` is only offered once the chat has a session to show.
#[derive(Clone)]
struct ChatHelper {
    has_session: Arc<AtomicBool>,
}

impl ChatHelper {
    fn new(has_session: Arc<AtomicBool>) -> Self {
        Self { has_session }
    }

    fn commands(&self) -> Vec<&'static str> {
        let mut commands = Vec::with_capacity(QUIT_COMMANDS.len() + 1);
        if self.has_session.load(Ordering::Relaxed) {
            commands.push(SESSION_COMMAND);
        }
        commands.extend(QUIT_COMMANDS);
        commands
    }

    fn matching(&self, prefix: &str) -> Vec<&'static str> {
        if !prefix.starts_with('/') {
            return Vec::new();
        }
        self.commands()
            .into_iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .collect()
    }
}

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = self
            .matching(&line[..pos])
            .into_iter()
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ChatHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.contains(' ') {
            return None;
        }
        self.matching(line)
            .into_iter()
            .find(|cmd| cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for ChatHelper {}

/// Prints new transcript lines whenever the chat publishes a snapshot.
pub fn spawn_renderer(mut rx: watch::Receiver<ChatSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut renderer = TranscriptRenderer::new();
        loop {
            let snapshot = rx.borrow_and_update().clone();
            for line in renderer.render(&snapshot) {
                line.print();
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}

pub async fn run(config: ChatConfig) -> Result<()> {
    let chat = super::connect(config)?;
    let has_session = Arc::new(AtomicBool::new(chat.session_id().await.is_some()));

    let flag = has_session.clone();
    chat.set_on_session_created(Arc::new(move |id: String| {
        flag.store(true, Ordering::Relaxed);
        tracing::info!("[Chat] Session {} created", id);
        println!("{}", format!("Session created: {}", id).bright_black());
    }))
    .await;

    let renderer = spawn_renderer(chat.subscribe());
    chat.start().await;
    tracing::info!("[Chat] Started (session: {:?})", chat.session_id().await);

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ChatHelper::new(has_session)));

    println!("{}", "=== Parley ===".bright_magenta().bold());
    println!(
        "{}",
        "Type a message and press Enter. '/session' shows the session id, '/quit' exits.".bright_black()
    );
    println!();

    // Text of a message that failed to send, offered again at the next prompt.
    let mut draft = String::new();

    loop {
        let readline = rl.readline_with_initial(">> ", (draft.as_str(), ""));
        draft.clear();

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if QUIT_COMMANDS.contains(&trimmed) {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if trimmed == SESSION_COMMAND {
                    print_session(&chat).await;
                    continue;
                }

                if let Err(e) = chat.post_message(trimmed).await {
                    tracing::debug!("[Chat] Keeping unsent draft ({} chars)", trimmed.len());
                    eprintln!("{}", format!("Message not sent: {}", e).red());
                    draft = trimmed.to_string();
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    chat.shutdown();
    drop(chat);
    let _ = renderer.await;
    tracing::info!("[Chat] Stopped");

    Ok(())
}

async fn print_session(chat: &ChatSession) {
    match chat.session_id().await {
        Some(id) => println!("{}", format!("Session: {}", id).bright_black()),
        None => println!("{}", "No session yet; one is created with your first message.".bright_black()),
    }
}
