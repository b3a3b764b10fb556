//! Scripted in-memory backend shared by controller tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use shared::protocol::{
    ChatReply, ChatRequest, FundSearchRequest, FundSearchResponse, HealthStatus,
};
use tokio::sync::oneshot;

use crate::{error::TransportError, transport::FundsBackend};

pub(crate) struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ChatReply, TransportError>>>,
    searches: Mutex<VecDeque<Result<FundSearchResponse, TransportError>>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    health: Result<HealthStatus, TransportError>,
    fail_teardown: bool,
    pub(crate) chat_requests: Mutex<Vec<ChatRequest>>,
    pub(crate) search_requests: Mutex<Vec<FundSearchRequest>>,
    pub(crate) ended_sessions: Arc<Mutex<Vec<String>>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            searches: Mutex::new(VecDeque::new()),
            gate: Mutex::new(None),
            health: Ok(HealthStatus {
                status: "ok".into(),
            }),
            fail_teardown: false,
            chat_requests: Mutex::new(Vec::new()),
            search_requests: Mutex::new(Vec::new()),
            ended_sessions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn reply(self, reply: ChatReply) -> Self {
        self.replies.lock().expect("lock").push_back(Ok(reply));
        self
    }

    pub(crate) fn fail(self, err: TransportError) -> Self {
        self.replies.lock().expect("lock").push_back(Err(err));
        self
    }

    pub(crate) fn search_result(self, response: FundSearchResponse) -> Self {
        self.searches.lock().expect("lock").push_back(Ok(response));
        self
    }

    pub(crate) fn search_failure(self, err: TransportError) -> Self {
        self.searches.lock().expect("lock").push_back(Err(err));
        self
    }

    pub(crate) fn with_health(mut self, health: Result<HealthStatus, TransportError>) -> Self {
        self.health = health;
        self
    }

    pub(crate) fn failing_teardown(mut self) -> Self {
        self.fail_teardown = true;
        self
    }

    /// Holds the next backend call until the returned sender fires.
    pub(crate) fn gate_next_call(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().expect("lock") = Some(rx);
        tx
    }

    async fn wait_for_gate(&self) {
        let gate = self.gate.lock().expect("lock").take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }

    pub(crate) fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().expect("lock").clone()
    }

    pub(crate) fn search_requests(&self) -> Vec<FundSearchRequest> {
        self.search_requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl FundsBackend for ScriptedBackend {
    async fn send_message(&self, request: ChatRequest) -> Result<ChatReply, TransportError> {
        self.chat_requests.lock().expect("lock").push(request);
        self.wait_for_gate().await;
        let next = self.replies.lock().expect("lock").pop_front();
        next.unwrap_or_else(|| Err(TransportError::Network("no scripted reply".into())))
    }

    async fn search_funds(
        &self,
        request: FundSearchRequest,
    ) -> Result<FundSearchResponse, TransportError> {
        self.search_requests.lock().expect("lock").push(request);
        self.wait_for_gate().await;
        let next = self.searches.lock().expect("lock").pop_front();
        next.unwrap_or_else(|| Err(TransportError::Network("no scripted search".into())))
    }

    async fn end_session(&self, session_id: &str) -> Result<(), TransportError> {
        self.ended_sessions
            .lock()
            .expect("lock")
            .push(session_id.to_string());
        if self.fail_teardown {
            return Err(TransportError::Status {
                status: 500,
                detail: "teardown exploded".into(),
            });
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, TransportError> {
        self.health.clone()
    }
}

/// Polls `check` until it holds or a second passes.
pub(crate) async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
