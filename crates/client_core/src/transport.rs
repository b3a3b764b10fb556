//! Backend transport: the call contract used by the controllers and its HTTP binding.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    error::ApiErrorBody,
    protocol::{ChatReply, ChatRequest, FundSearchRequest, FundSearchResponse, HealthStatus},
};
use tracing::debug;
use url::Url;

use crate::{config::ClientSettings, error::TransportError};

#[async_trait]
pub trait FundsBackend: Send + Sync {
    async fn send_message(&self, request: ChatRequest) -> Result<ChatReply, TransportError>;
    async fn search_funds(
        &self,
        request: FundSearchRequest,
    ) -> Result<FundSearchResponse, TransportError>;
    /// Best-effort teardown of a backend conversation context.
    async fn end_session(&self, session_id: &str) -> Result<(), TransportError>;
    async fn health_check(&self) -> Result<HealthStatus, TransportError>;
}

pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(settings: &ClientSettings) -> Result<Self, TransportError> {
        let base_url = settings
            .base_url()
            .map_err(|_| TransportError::InvalidBaseUrl(settings.api_base_url.clone()))?;
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Appends `segments` to the base path, percent-encoding each one, so an
    /// opaque id such as `a/b?c` stays a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl FundsBackend for HttpBackend {
    async fn send_message(&self, request: ChatRequest) -> Result<ChatReply, TransportError> {
        debug!(
            has_session = request.session_id.is_some(),
            chars = request.message.chars().count(),
            "transport: posting chat message"
        );
        let response = self
            .http
            .post(self.endpoint(&["chat"])?)
            .json(&request)
            .send()
            .await?;
        let reply: ChatReply = decode_json(ensure_success(response).await?).await?;
        if reply.reply.trim().is_empty() {
            return Err(TransportError::Malformed(
                "reply text is empty".to_string(),
            ));
        }
        Ok(reply)
    }

    async fn search_funds(
        &self,
        request: FundSearchRequest,
    ) -> Result<FundSearchResponse, TransportError> {
        debug!(search_type = %request.search_type, "transport: searching funds");
        let response = self
            .http
            .post(self.endpoint(&["search"])?)
            .json(&request)
            .send()
            .await?;
        decode_json(ensure_success(response).await?).await
    }

    async fn end_session(&self, session_id: &str) -> Result<(), TransportError> {
        let response = self
            .http
            .delete(self.endpoint(&["session", session_id])?)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, TransportError> {
        let response = self.http.get(self.endpoint(&["health"])?).send().await?;
        decode_json(ensure_success(response).await?).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.detail_text().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    Err(TransportError::Status {
        status: status.as_u16(),
        detail,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| TransportError::Malformed(e.to_string()))
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
