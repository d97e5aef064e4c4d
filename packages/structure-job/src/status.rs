//! HTTP client for the external ticket/status store.

use async_trait::async_trait;
use docstruct::{ExtractError, FileStatus, StatusSink};
use serde_json::json;

/// Upserts per-file status records into the status service, keyed by
/// ticket id.
pub struct HttpStatusSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusSink {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StatusSink for HttpStatusSink {
    async fn upsert_file(&self, ticket_id: &str, status: &FileStatus) -> docstruct::Result<()> {
        self.client
            .put(format!(
                "{}/tickets/{}/files/{}",
                self.base_url, ticket_id, status.file_id
            ))
            .json(status)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExtractError::Status(Box::new(e)))?;
        Ok(())
    }

    async fn fail_ticket(&self, ticket_id: &str, message: &str) -> docstruct::Result<()> {
        self.client
            .patch(format!("{}/tickets/{}", self.base_url, ticket_id))
            .json(&json!({ "status": "error", "message": message }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExtractError::Status(Box::new(e)))?;
        Ok(())
    }
}
