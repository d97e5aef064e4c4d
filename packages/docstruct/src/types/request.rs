//! Extraction request types.

use serde::{Deserialize, Serialize};

use crate::pipeline::router::ModelPool;
use crate::segment::table::Sheet;
use crate::types::schema::FieldSchema;

/// Whether a job produces one record per document or many records from
/// tabular chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Object,
    Array,
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Object
    }
}

/// Instruction-emphasis variant biasing the model toward a document
/// structure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStrategy {
    Default,
    Table,
    List,
    KeyValue,
}

impl PromptStrategy {
    /// Tag used in logs and attempt records.
    pub fn tag(&self) -> &'static str {
        match self {
            PromptStrategy::Default => "default",
            PromptStrategy::Table => "table",
            PromptStrategy::List => "list",
            PromptStrategy::KeyValue => "key_value",
        }
    }
}

/// Source content handed to the orchestrator.
///
/// Object mode consumes `Text` whole; array mode segments `Text` at page
/// breaks or chunks `Sheets` through the tabular segmenter.
#[derive(Debug, Clone)]
pub enum SourceContent {
    Text(String),
    Sheets(Vec<Sheet>),
}

/// One extraction job for one document.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Document content (text or tabular grids).
    pub content: SourceContent,

    /// Fields to fill.
    pub schema: FieldSchema,

    /// Caller's free-text instruction, appended to every prompt.
    pub instruction: String,

    /// Object or array output.
    pub mode: OutputMode,

    /// Run multiple prompt strategies and vote (object mode only).
    pub ensemble: bool,

    /// Models to call, most capable first.
    pub pool: ModelPool,
}

impl ExtractionRequest {
    pub fn new(content: SourceContent, schema: FieldSchema, pool: ModelPool) -> Self {
        Self {
            content,
            schema,
            instruction: String::new(),
            mode: OutputMode::Object,
            ensemble: true,
            pool,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn without_ensemble(mut self) -> Self {
        self.ensemble = false;
        self
    }
}
