//! Failure taxonomy for backend exchanges.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("backend returned status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("malformed backend response: {0}")]
    Malformed(String),
    #[error("invalid backend url '{0}'")]
    InvalidBaseUrl(String),
}

impl TransportError {
    /// Text shown inline in the chat or search surface.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Network(_) => {
                "Unable to reach the assistant; check your connection and try again.".to_string()
            }
            TransportError::Timeout => {
                "The assistant took too long to respond; please try again.".to_string()
            }
            TransportError::Status { status, detail } if detail.trim().is_empty() => {
                format!("The assistant returned an error (HTTP {status}).")
            }
            TransportError::Status { status, detail } => {
                format!("The assistant returned an error (HTTP {status}): {detail}")
            }
            TransportError::Malformed(_) => {
                "Received an unexpected response from the assistant.".to_string()
            }
            TransportError::InvalidBaseUrl(url) => {
                format!("The assistant address '{url}' is not a valid URL.")
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) | TransportError::Timeout => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Malformed(_) | TransportError::InvalidBaseUrl(_) => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                detail: String::new(),
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}
