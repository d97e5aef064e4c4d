//! Ticket/status store collaborator trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-file processing state surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Per-file status record upserted into the external ticket/status store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStatus {
    #[serde(rename = "fileId")]
    pub file_id: String,
    pub file_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FileStatus {
    pub fn new(file_id: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_url: file_url.into(),
            status: None,
            process: None,
            message: None,
            updated_at: Utc::now(),
        }
    }

    pub fn processing(file_id: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            process: Some(ProcessState::Processing),
            ..Self::new(file_id, file_url)
        }
    }

    pub fn completed(
        file_id: impl Into<String>,
        file_url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            process: Some(ProcessState::Completed),
            message: Some(message.into()),
            ..Self::new(file_id, file_url)
        }
    }

    pub fn failed(
        file_id: impl Into<String>,
        file_url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: Some("error".into()),
            process: Some(ProcessState::Failed),
            message: Some(message.into()),
            ..Self::new(file_id, file_url)
        }
    }
}

/// The external ticket/status store, keyed by ticket id.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Upsert one file's status record under the given ticket.
    async fn upsert_file(&self, ticket_id: &str, status: &FileStatus) -> Result<()>;

    /// Record a ticket-level failure (e.g. the job deadline fired).
    async fn fail_ticket(&self, ticket_id: &str, message: &str) -> Result<()>;
}
