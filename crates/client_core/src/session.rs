//! Chat session controller: owns the transcript, session identity and the
//! send protocol against the backend.
//!
//! Sends follow `Idle -> Sending -> Idle`. A send appends the user turn and a
//! loading placeholder, awaits the backend, then replaces or removes that
//! placeholder by id. `clear_chat` and `reset_session` bump an epoch; a reply
//! from an older epoch is dropped without touching state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use shared::{
    domain::{Message, MessageId},
    protocol::{ChatReply, ChatRequest},
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{config::ClientSettings, error::TransportError, transport::FundsBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RequestToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Sending(RequestToken),
}

/// Read-only view of the session handed to presentation code.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub session_id: Option<String>,
    pub is_connected: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    StateChanged(ChatSnapshot),
    SessionEstablished(String),
    SendFailed { message: String, retryable: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Ignored(IgnoreReason),
    Delivered,
    Failed(String),
    /// The session was cleared or reset while the request was in flight.
    Discarded,
}

struct SessionState {
    messages: Vec<Message>,
    session_id: Option<String>,
    is_connected: bool,
    error: Option<String>,
    phase: Phase,
    epoch: u64,
    next_token: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            session_id: None,
            is_connected: true,
            error: None,
            phase: Phase::Idle,
            epoch: 0,
            next_token: 0,
        }
    }

    fn issue_token(&mut self) -> RequestToken {
        self.next_token += 1;
        RequestToken(self.next_token)
    }

    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.messages.clone(),
            session_id: self.session_id.clone(),
            is_connected: self.is_connected,
            is_loading: matches!(self.phase, Phase::Sending(_)),
            error: self.error.clone(),
        }
    }
}

struct PendingSend {
    token: RequestToken,
    epoch: u64,
    placeholder_id: MessageId,
}

/// Leaves the `Sending` phase when the attempt ends, however it ends.
struct SendGuard<'a> {
    controller: &'a ChatController,
    token: RequestToken,
    placeholder_id: MessageId,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        let changed = {
            let mut state = self.controller.lock();
            let mut changed = false;
            if state.phase == Phase::Sending(self.token) {
                state.phase = Phase::Idle;
                changed = true;
            }
            // Only present here if the send future was dropped before settling.
            let before = state.messages.len();
            state
                .messages
                .retain(|m| !(m.id == self.placeholder_id && m.is_loading));
            changed || state.messages.len() != before
        };
        if changed {
            self.controller.publish_state();
        }
    }
}

pub struct ChatController {
    backend: Arc<dyn FundsBackend>,
    teardown_on_reset: bool,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatController {
    pub fn new(backend: Arc<dyn FundsBackend>) -> Arc<Self> {
        Self::with_settings(backend, &ClientSettings::default())
    }

    /// Only `teardown_on_reset` is read here; the transport owns the rest.
    pub fn with_settings(backend: Arc<dyn FundsBackend>, settings: &ClientSettings) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            backend,
            teardown_on_reset: settings.teardown_on_reset,
            inner: Mutex::new(SessionState::new()),
            events,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.events.send(event);
    }

    fn publish_state(&self) {
        let snapshot = self.snapshot();
        self.emit(ChatEvent::StateChanged(snapshot));
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.lock().snapshot()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.lock().session_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.lock().phase, Phase::Sending(_))
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_connected
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Sends one user utterance. Blank input and sends issued while another
    /// is in flight are ignored without touching state. Transport failures
    /// end up in `error`; they are never returned to the caller.
    pub async fn send_message(&self, text: &str, user_name: Option<&str>) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            debug!("chat: ignoring empty message");
            return SendOutcome::Ignored(IgnoreReason::EmptyInput);
        }

        let (request, pending) = {
            let mut state = self.lock();
            if let Phase::Sending(token) = state.phase {
                debug!(in_flight = token.0, "chat: ignoring send while busy");
                return SendOutcome::Ignored(IgnoreReason::Busy);
            }

            let token = state.issue_token();
            let user = Message::user(text);
            let placeholder = Message::assistant_placeholder();
            let pending = PendingSend {
                token,
                epoch: state.epoch,
                placeholder_id: placeholder.id.clone(),
            };
            state.messages.push(user);
            state.messages.push(placeholder);
            state.phase = Phase::Sending(token);
            state.error = None;

            let request = ChatRequest {
                message: text.to_string(),
                session_id: state.session_id.clone(),
                user_name: user_name
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            };
            (request, pending)
        };
        self.publish_state();

        let _guard = SendGuard {
            controller: self,
            token: pending.token,
            placeholder_id: pending.placeholder_id.clone(),
        };
        let result = self.backend.send_message(request).await;
        self.settle(&pending, result)
    }

    fn settle(&self, pending: &PendingSend, result: Result<ChatReply, TransportError>) -> SendOutcome {
        let mut established = None;
        let mut failure = None;

        let outcome = {
            let mut state = self.lock();
            if state.epoch != pending.epoch {
                debug!(
                    token = pending.token.0,
                    "chat: discarding response from a cleared or reset session"
                );
                return SendOutcome::Discarded;
            }

            match result {
                Ok(reply) => {
                    let Some(slot) = state
                        .messages
                        .iter_mut()
                        .find(|m| m.id == pending.placeholder_id)
                    else {
                        debug!(token = pending.token.0, "chat: placeholder already gone");
                        return SendOutcome::Discarded;
                    };
                    slot.content = reply.reply;
                    slot.timestamp = reply.timestamp.unwrap_or_else(Utc::now);
                    slot.is_loading = false;
                    if let Some(id) = reply.message_id {
                        slot.id = id;
                    }

                    state.is_connected = true;
                    state.error = None;
                    if let Some(id) = reply.session_id.filter(|id| !id.trim().is_empty()) {
                        match state.session_id.clone() {
                            None => {
                                info!(session_id = %id, "chat: session established");
                                state.session_id = Some(id.clone());
                                established = Some(id);
                            }
                            Some(held) if held != id => {
                                debug!(%held, offered = %id, "chat: keeping existing session id");
                            }
                            Some(_) => {}
                        }
                    }
                    SendOutcome::Delivered
                }
                Err(err) => {
                    warn!(error = %err, token = pending.token.0, "chat: send failed");
                    state.messages.retain(|m| m.id != pending.placeholder_id);
                    let message = err.user_message();
                    state.error = Some(message.clone());
                    state.is_connected = false;
                    failure = Some((message.clone(), err.is_retryable()));
                    SendOutcome::Failed(message)
                }
            }
        };

        if let Some(id) = established {
            self.emit(ChatEvent::SessionEstablished(id));
        }
        if let Some((message, retryable)) = failure {
            self.emit(ChatEvent::SendFailed { message, retryable });
        }
        outcome
    }

    /// Empties the transcript; the backend session and connection flag stay.
    pub fn clear_chat(&self) {
        {
            let mut state = self.lock();
            state.messages.clear();
            state.epoch += 1;
        }
        info!("chat: transcript cleared");
        self.publish_state();
    }

    /// Abandons the backend session and returns to the initial state.
    pub fn reset_session(&self) {
        let previous = {
            let mut state = self.lock();
            let epoch = state.epoch + 1;
            let next_token = state.next_token;
            let previous = state.session_id.take();
            *state = SessionState {
                epoch,
                next_token,
                ..SessionState::new()
            };
            previous
        };
        info!(had_session = previous.is_some(), "chat: session reset");
        self.publish_state();

        if let Some(session_id) = previous.filter(|_| self.teardown_on_reset) {
            self.spawn_teardown(session_id);
        }
    }

    fn spawn_teardown(&self, session_id: String) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(%session_id, "chat: no runtime available, skipping session teardown");
            return;
        };
        let backend = Arc::clone(&self.backend);
        handle.spawn(async move {
            match backend.end_session(&session_id).await {
                Ok(()) => debug!(%session_id, "chat: backend session ended"),
                Err(err) => warn!(%session_id, error = %err, "chat: session teardown failed"),
            }
        });
    }

    /// Refreshes `is_connected` from the backend health endpoint.
    pub async fn check_connection(&self) -> bool {
        let healthy = match self.backend.health_check().await {
            Ok(status) => status.is_healthy(),
            Err(err) => {
                warn!(error = %err, "chat: health check failed");
                false
            }
        };
        self.lock().is_connected = healthy;
        self.publish_state();
        healthy
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
