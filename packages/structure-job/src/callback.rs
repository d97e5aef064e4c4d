//! Result delivery to the caller's API endpoint.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Wire payload POSTed to the job's `apiEndpoint`.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackPayload {
    #[serde(rename = "ticketId")]
    pub ticket_id: String,
    #[serde(rename = "fileId")]
    pub file_id: String,
    /// One object (object mode) or an array of objects (array mode).
    pub data: Value,
    pub confidence: IndexMap<String, f64>,
    pub suggestion: Value,
}

/// Delivery seam, so tests can capture payloads without a server.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, endpoint: &str, payload: &CallbackPayload) -> anyhow::Result<()>;
}

/// POSTs payloads to the callback endpoint.
pub struct HttpResultSink {
    client: reqwest::Client,
}

impl HttpResultSink {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResultSink for HttpResultSink {
    async fn deliver(&self, endpoint: &str, payload: &CallbackPayload) -> anyhow::Result<()> {
        let response = self
            .client
            .post(endpoint.trim())
            .json(payload)
            .send()
            .await?;

        tracing::info!(
            file_id = %payload.file_id,
            status = %response.status(),
            "delivered extraction result"
        );
        Ok(())
    }
}
