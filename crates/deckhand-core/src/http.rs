//! HTTP client for the deckhand backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::instruction::{InstructionRequest, InstructionResponse, InstructionSource};
use crate::publish::{
    DocumentUpload, DocumentUploader, SnapshotPayload, SnapshotTransport, TransportError,
    TransportResult,
};

pub const SNAPSHOT_ROUTE: &str = "/upload-metadata";
pub const UPLOAD_ROUTE: &str = "/upload-pptx";
pub const INSTRUCTION_ROUTE: &str = "/process_instruction";

/// Talks JSON to the backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("deckhand/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &B,
    ) -> TransportResult<reqwest::Response> {
        let url = self.url(route);
        debug!(url = %url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// POST and decode a JSON acknowledgement. An explicit
    /// `{"status": "error"}` body is a rejection even on a 2xx status.
    async fn post_for_ack<B: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &B,
    ) -> TransportResult<serde_json::Value> {
        let ack: serde_json::Value = self.post(route, body).await?.json().await?;
        if ack.get("status").and_then(|s| s.as_str()) == Some("error") {
            let message = ack
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no message")
                .to_string();
            return Err(TransportError::Rejected(message));
        }
        Ok(ack)
    }
}

#[async_trait]
impl SnapshotTransport for HttpBackend {
    async fn send_snapshot(&self, payload: &SnapshotPayload<'_>) -> TransportResult<serde_json::Value> {
        self.post_for_ack(SNAPSHOT_ROUTE, payload).await
    }
}

#[async_trait]
impl DocumentUploader for HttpBackend {
    async fn upload_document(&self, upload: &DocumentUpload) -> TransportResult<serde_json::Value> {
        self.post_for_ack(UPLOAD_ROUTE, upload).await
    }
}

#[async_trait]
impl InstructionSource for HttpBackend {
    async fn request_code(&self, request: &InstructionRequest) -> TransportResult<InstructionResponse> {
        Ok(self.post(INSTRUCTION_ROUTE, request).await?.json().await?)
    }
}
