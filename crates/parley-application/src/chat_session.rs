//! Chat session use case.
//!
//! `ChatSession` ties the poller, the reconciled [`Timeline`] and the
//! transport together for one chat instance, and publishes a [`ChatSnapshot`]
//! after every change.

use crate::poller::EventPoller;
use crate::session::{ChatSnapshot, DefaultSessionCreator};
use parley_core::config::ChatConfig;
use parley_core::error::{ParleyError, Result};
use parley_core::event::{Event, EventCreationParams};
use parley_core::reconcile::Timeline;
use parley_core::session::{Agent, Session};
use parley_core::transport::{EventTransport, SessionCreator};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tokio_util::sync::CancellationToken;

/// Callback invoked with the id of a session created on first submission.
pub type SessionCreatedCallback = Arc<dyn Fn(String) + Send + Sync>;

/// One chat instance: its reconciled state, its poll loop and its submissions.
///
/// Instances share nothing; several chats may run side by side, each with its
/// own poller and timeline.
///
/// # Lifecycle
///
/// Nothing runs until [`ChatSession::start`]. [`ChatSession::shutdown`], or
/// dropping the handle, cancels the poll loop and the info lookups; an
/// outstanding long poll is abandoned without touching state.
pub struct ChatSession {
    inner: Arc<Inner>,
}

struct Inner {
    config: ChatConfig,
    transport: Arc<dyn EventTransport>,
    session_creator: Option<Arc<dyn SessionCreator>>,
    state: RwLock<ChatState>,
    snapshot_tx: watch::Sender<ChatSnapshot>,
    cancel: CancellationToken,
    poller_running: AtomicBool,
    /// Serializes deferred session creation.
    creation_lock: Mutex<()>,
    on_session_created: RwLock<Option<SessionCreatedCallback>>,
}

#[derive(Default)]
struct ChatState {
    timeline: Timeline,
    session_id: Option<String>,
    session: Option<Session>,
    agent: Option<Agent>,
}

impl ChatSession {
    /// Creates a chat from `config`.
    ///
    /// Fails with a configuration error when neither a session id nor an agent
    /// id is configured. With an agent id, a [`DefaultSessionCreator`] handles
    /// deferred session creation.
    pub fn new(config: ChatConfig, transport: Arc<dyn EventTransport>) -> Result<Self> {
        config.validate()?;

        let session_creator = DefaultSessionCreator::from_config(transport.clone(), &config)
            .map(|c| Arc::new(c) as Arc<dyn SessionCreator>);

        let state = ChatState {
            session_id: config.session_id.clone(),
            agent: config.agent_name.clone().map(Agent::named),
            ..ChatState::default()
        };
        let initial = ChatSnapshot::capture(
            &state.timeline,
            config.agent_opening_message.as_deref(),
            state.session_id.clone(),
            None,
            state.agent.clone(),
        );
        let (snapshot_tx, _) = watch::channel(initial);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transport,
                session_creator,
                state: RwLock::new(state),
                snapshot_tx,
                cancel: CancellationToken::new(),
                poller_running: AtomicBool::new(false),
                creation_lock: Mutex::new(()),
                on_session_created: RwLock::new(None),
            }),
        })
    }

    /// Replaces the collaborator used when the first message arrives without a
    /// session.
    pub fn with_session_creator(mut self, creator: Arc<dyn SessionCreator>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.session_creator = Some(creator);
        }
        self
    }

    /// Sets a callback to be invoked when a deferred session gets created.
    pub async fn set_on_session_created(&self, callback: SessionCreatedCallback) {
        *self.inner.on_session_created.write().await = Some(callback);
    }

    pub fn config(&self) -> &ChatConfig {
        &self.inner.config
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// The most recently published state.
    pub fn snapshot(&self) -> ChatSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub async fn session_id(&self) -> Option<String> {
        self.inner.state.read().await.session_id.clone()
    }

    /// Starts polling (when a session exists) and the session/agent lookups.
    ///
    /// Calling it again while the poll loop runs has no effect.
    pub async fn start(&self) {
        let session_id = self.session_id().await;
        match session_id {
            Some(id) => Inner::spawn_poller(&self.inner, id),
            None => tracing::info!("[ChatSession] No session yet; polling starts after the first message"),
        }
        Inner::spawn_info_lookup(&self.inner);
    }

    /// Submits a customer message.
    ///
    /// Blank content is ignored. The text shows up as the pending placeholder
    /// right away; the authoritative copy arrives through the poll loop once
    /// the server has stored it. Without a session, the session creator runs
    /// first and polling starts on the new session.
    ///
    /// On failure the placeholder is dropped and the error is returned, so the
    /// caller can restore its draft.
    pub async fn post_message(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Ok(());
        }

        {
            let mut state = self.inner.state.write().await;
            state.timeline.set_pending(content);
            self.inner.publish(&state);
        }

        let params = EventCreationParams::customer_message(content);
        let result = self.submit(params).await;

        if let Err(e) = &result {
            tracing::warn!("[ChatSession] Failed to submit message: {}", e);
            let mut state = self.inner.state.write().await;
            state.timeline.clear_pending();
            self.inner.publish(&state);
        }
        result
    }

    async fn submit(&self, params: EventCreationParams) -> Result<()> {
        if let Some(session_id) = self.session_id().await {
            self.inner.transport.create_event(&session_id, &params).await?;
            return Ok(());
        }

        let _creating = self.inner.creation_lock.lock().await;
        // Another submission may have created the session while we waited.
        if let Some(session_id) = self.session_id().await {
            self.inner.transport.create_event(&session_id, &params).await?;
            return Ok(());
        }

        let creator = self
            .inner
            .session_creator
            .clone()
            .ok_or_else(|| ParleyError::config("agent_id is required to create a session"))?;
        let session_id = creator.create_session(params).await?;

        {
            let mut state = self.inner.state.write().await;
            state.session_id = Some(session_id.clone());
            self.inner.publish(&state);
        }

        if let Some(callback) = self.inner.on_session_created.read().await.clone() {
            callback(session_id.clone());
        }

        Inner::spawn_poller(&self.inner, session_id);
        Inner::spawn_info_lookup(&self.inner);
        Ok(())
    }

    /// Stops the poll loop and pending lookups.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

/// Clears the running flag when the poll task ends, including by panic.
struct PollerRunning<'a>(&'a AtomicBool);

impl Drop for PollerRunning<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Inner {
    fn publish(&self, state: &ChatState) {
        let snapshot = ChatSnapshot::capture(
            &state.timeline,
            self.config.agent_opening_message.as_deref(),
            state.session_id.clone(),
            state.session.clone(),
            state.agent.clone(),
        );
        self.snapshot_tx.send_replace(snapshot);
    }

    async fn apply_batch(&self, batch: &[Event]) {
        let mut state = self.state.write().await;
        let outcome = state.timeline.apply_batch(batch);
        tracing::debug!(
            "[ChatSession] Applied {} events ({} messages, pending cleared: {}), {} messages total",
            batch.len(),
            outcome.new_messages,
            outcome.pending_cleared,
            state.timeline.len()
        );
        self.publish(&state);
    }

    fn spawn_poller(inner: &Arc<Self>, session_id: String) {
        if inner.cancel.is_cancelled() {
            return;
        }
        if inner.poller_running.swap(true, Ordering::SeqCst) {
            tracing::debug!("[Poller] Poll loop already running, skipping");
            return;
        }

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let _running = PollerRunning(&inner.poller_running);
            inner.run_poll_loop(session_id).await;
        });
    }

    /// Chains long polls one after another until cancelled.
    async fn run_poll_loop(&self, session_id: String) {
        let mut poller = EventPoller::new(self.transport.clone(), session_id.clone(), &self.config.polling);
        tracing::info!("[Poller] Poll loop started for session {}", session_id);

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = poller.poll() => result,
            };
            if self.cancel.is_cancelled() {
                break;
            }

            let pause = match result {
                Ok(batch) if batch.is_empty() => self.config.polling.idle_delay(),
                Ok(batch) => {
                    self.apply_batch(&batch).await;
                    Duration::ZERO
                }
                Err(e) => {
                    let delay = poller.backoff().delay();
                    let failures = poller.backoff().consecutive_failures();
                    if e.is_retryable() {
                        tracing::warn!(
                            "[Poller] Poll failed ({} in a row), retrying in {:?}: {}",
                            failures,
                            delay,
                            e
                        );
                    } else {
                        tracing::error!(
                            "[Poller] Poll failed ({} in a row), retrying in {:?}: {}",
                            failures,
                            delay,
                            e
                        );
                    }
                    delay
                }
            };

            if !pause.is_zero() && !self.sleep_or_cancel(pause).await {
                break;
            }
        }

        tracing::info!(
            "[Poller] Poll loop stopped for session {} at offset {}",
            session_id,
            poller.min_offset()
        );
    }

    /// Sleeps for `duration`. Returns `false` when cancelled first.
    async fn sleep_or_cancel(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn spawn_info_lookup(inner: &Arc<Self>) {
        if inner.cancel.is_cancelled() {
            return;
        }
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.cancel.cancelled() => {}
                _ = inner.load_session_and_agent() => {}
            }
        });
    }

    /// Fetches the session and resolves the agent shown in the header.
    ///
    /// A configured agent name wins over the backend's; otherwise the agent
    /// id of the session, or the configured one, is looked up.
    async fn load_session_and_agent(&self) {
        let session_id = self.state.read().await.session_id.clone();

        let session = match session_id {
            Some(id) => match self.transport.retrieve_session(&id).await {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!("[ChatSession] Failed to retrieve session {}: {}", id, e);
                    None
                }
            },
            None => None,
        };

        if let Some(session) = &session {
            let mut state = self.state.write().await;
            state.session = Some(session.clone());
            self.publish(&state);
        }

        if self.config.agent_name.is_some() {
            return;
        }
        let agent_id = session
            .map(|s| s.agent_id)
            .filter(|id| !id.is_empty())
            .or_else(|| self.config.agent_id.clone());
        let Some(agent_id) = agent_id else {
            return;
        };

        match self.transport.retrieve_agent(&agent_id).await {
            Ok(agent) => {
                tracing::debug!("[ChatSession] Resolved agent {} ({})", agent.name, agent_id);
                let mut state = self.state.write().await;
                state.agent = Some(agent);
                self.publish(&state);
            }
            Err(e) => tracing::warn!("[ChatSession] Failed to retrieve agent {}: {}", agent_id, e),
        }
    }
}

#[cfg(test)]
#[path = "chat_session_test.rs"]
mod tests;
