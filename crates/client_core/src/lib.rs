use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

pub mod config;
pub mod error;
pub mod search;
pub mod session;
pub mod transport;

pub use config::{load_settings, load_settings_from, ClientSettings};
pub use error::TransportError;
pub use search::{FundSearchController, Notice, NoticeKind, SearchOutcome, SearchSnapshot};
pub use session::{ChatController, ChatEvent, ChatSnapshot, IgnoreReason, SendOutcome};
pub use transport::{FundsBackend, HttpBackend};

/// Both controllers wired to one shared backend.
#[derive(Clone)]
pub struct AgentClient {
    pub chat: Arc<ChatController>,
    pub search: Arc<FundSearchController>,
}

impl AgentClient {
    pub fn new(backend: Arc<dyn FundsBackend>, settings: &ClientSettings) -> Self {
        Self {
            chat: ChatController::with_settings(Arc::clone(&backend), settings),
            search: FundSearchController::new(backend),
        }
    }

    pub fn connect(settings: &ClientSettings) -> Result<Self> {
        let backend = HttpBackend::new(settings).with_context(|| {
            format!(
                "failed to build backend client for '{}'",
                settings.api_base_url
            )
        })?;
        info!(
            base_url = backend.base_url(),
            timeout_secs = settings.request_timeout_secs,
            "client: backend configured"
        );
        Ok(Self::new(Arc::new(backend), settings))
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
