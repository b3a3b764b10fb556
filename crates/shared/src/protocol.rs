use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FundRecord, MessageId, SearchType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

/// Assistant reply for one exchange. Older backends send the text as `response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(alias = "response")]
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatReply {
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            session_id: None,
            message_id: None,
            timestamp: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundSearchRequest {
    pub fund_name: String,
    #[serde(default)]
    pub search_type: SearchType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundSearchResponse {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<FundRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FundSearchResponse {
    pub fn found(results: Vec<FundRecord>) -> Self {
        Self {
            found: true,
            results: Some(results),
            error: None,
        }
    }

    pub fn not_found(error: Option<String>) -> Self {
        Self {
            found: false,
            results: None,
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "ok" | "healthy" | "up"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_absent_session_and_user() {
        let request = ChatRequest {
            message: "hi".into(),
            session_id: None,
            user_name: None,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json, serde_json::json!({ "message": "hi" }));
    }

    #[test]
    fn chat_reply_accepts_response_alias() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"response":"The NAV is ₹45.23 as of today.","session_id":"abc123","timestamp":"2024-05-01T10:00:00Z"}"#,
        )
        .expect("decode reply");
        assert_eq!(reply.reply, "The NAV is ₹45.23 as of today.");
        assert_eq!(reply.session_id.as_deref(), Some("abc123"));
        assert!(reply.timestamp.is_some());
    }

    #[test]
    fn search_request_defaults_to_general() {
        let request: FundSearchRequest =
            serde_json::from_str(r#"{"fund_name":"axis"}"#).expect("decode");
        assert_eq!(request.search_type, SearchType::General);
    }

    #[test]
    fn health_status_accepts_common_spellings() {
        assert!(HealthStatus { status: "OK".into() }.is_healthy());
        assert!(!HealthStatus { status: "degraded".into() }.is_healthy());
    }
}
