//! Testing utilities including mock implementations.
//!
//! Deterministic stand-ins for the inference endpoint, the document
//! reader, and the status store, so pipeline logic tests never touch the
//! network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ExtractError, Result};
use crate::segment::table::Sheet;
use crate::traits::inference::Inference;
use crate::traits::reader::DocumentReader;
use crate::traits::status::{FileStatus, StatusSink};

/// Scripted reply for one mock inference call.
#[derive(Debug, Clone)]
enum ScriptedReply {
    Text(String),
    Throttle,
    InvalidInput(String),
}

/// A mock inference endpoint with deterministic, configurable responses.
///
/// Resolution order per call: scripted replies (consumed in order), then
/// keyed responses (first key contained in the prompt wins), then the
/// default response.
#[derive(Default)]
pub struct MockInference {
    script: Mutex<VecDeque<ScriptedReply>>,
    keyed: Vec<(String, String)>,
    default_response: Option<String>,
    always_throttle: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Text(text.into()));
        self
    }

    /// Queue a throttle-class rejection.
    pub fn with_throttle(self) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Throttle);
        self
    }

    /// Queue a permanent input-validity rejection.
    pub fn with_invalid_input(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::InvalidInput(message.into()));
        self
    }

    /// Respond with `text` whenever the prompt contains `key`.
    pub fn with_keyed_response(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.keyed.push((key.into(), text.into()));
        self
    }

    /// Respond with `text` for every otherwise-unmatched call.
    pub fn with_default_response(mut self, text: impl Into<String>) -> Self {
        self.default_response = Some(text.into());
        self
    }

    /// Throttle every call, forever.
    pub fn always_throttled(mut self) -> Self {
        self.always_throttle = true;
        self
    }

    /// All `(prompt, model_id)` pairs received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Inference for MockInference {
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), model_id.to_string()));

        if self.always_throttle {
            return Err(ExtractError::Throttled {
                model: model_id.to_string(),
            });
        }

        if let Some(reply) = self.script.lock().unwrap().pop_front() {
            return match reply {
                ScriptedReply::Text(text) => Ok(text),
                ScriptedReply::Throttle => Err(ExtractError::Throttled {
                    model: model_id.to_string(),
                }),
                ScriptedReply::InvalidInput(message) => {
                    Err(ExtractError::InvalidInput { message })
                }
            };
        }

        for (key, text) in &self.keyed {
            if prompt.contains(key.as_str()) {
                return Ok(text.clone());
            }
        }

        if let Some(text) = &self.default_response {
            return Ok(text.clone());
        }

        Err(ExtractError::Config {
            message: "MockInference has no response configured for this call".into(),
        })
    }
}

/// A mock document reader serving fixed pages and sheets.
#[derive(Default)]
pub struct MockReader {
    pages: Vec<String>,
    sheets: Vec<Sheet>,
    fail_with: Option<String>,
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, content: impl Into<String>) -> Self {
        self.pages.push(content.into());
        self
    }

    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Fail every read with the given message.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }
}

#[async_trait]
impl DocumentReader for MockReader {
    async fn read_text(&self, _location: &str, _extension: &str) -> Result<Vec<String>> {
        match &self.fail_with {
            Some(message) => Err(ExtractError::Reader(message.clone().into())),
            None => Ok(self.pages.clone()),
        }
    }

    async fn read_workbook(&self, _location: &str) -> Result<Vec<Sheet>> {
        match &self.fail_with {
            Some(message) => Err(ExtractError::Reader(message.clone().into())),
            None => Ok(self.sheets.clone()),
        }
    }
}

/// A status sink that records every upsert for assertions.
#[derive(Default)]
pub struct RecordingStatusSink {
    files: Mutex<Vec<(String, FileStatus)>>,
    tickets: Mutex<Vec<(String, String)>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_updates(&self) -> Vec<(String, FileStatus)> {
        self.files.lock().unwrap().clone()
    }

    pub fn ticket_failures(&self) -> Vec<(String, String)> {
        self.tickets.lock().unwrap().clone()
    }

    /// Last recorded status for a file id, if any.
    pub fn last_for(&self, file_id: &str) -> Option<FileStatus> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, s)| s.file_id == file_id)
            .map(|(_, s)| s.clone())
    }
}

#[async_trait]
impl StatusSink for RecordingStatusSink {
    async fn upsert_file(&self, ticket_id: &str, status: &FileStatus) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .push((ticket_id.to_string(), status.clone()));
        Ok(())
    }

    async fn fail_ticket(&self, ticket_id: &str, message: &str) -> Result<()> {
        self.tickets
            .lock()
            .unwrap()
            .push((ticket_id.to_string(), message.to_string()));
        Ok(())
    }
}
