//! Schema-Driven Document Structuring Library
//!
//! Turns documents (scanned forms, spreadsheets) into schema-conformant
//! structured records by asking a generative model to fill a
//! caller-supplied field schema, then reconciling multiple, possibly
//! disagreeing, answers into one confident value per field.
//!
//! # Design Philosophy
//!
//! - Schema-driven: the caller says what fields exist; the model fills them
//! - Defensive at the model boundary: repair truncated JSON, backfill
//!   missing keys, never drop a field silently
//! - Explicit state over hidden state: the model pool and retry policy are
//!   values passed through the call path, not module globals
//! - Collaborators behind traits so tests never touch the network
//!
//! # Usage
//!
//! ```rust,ignore
//! use docstruct::{
//!     DocumentSource, ExtractionRequest, FieldSchema, FieldType,
//!     ModelPool, ModelSpec, PipelineConfig, SourceContent,
//! };
//! use std::time::Duration;
//!
//! let schema = FieldSchema::new()
//!     .with_field("name", FieldType::String, "applicant name")
//!     .with_field("amount", FieldType::Number, "requested amount");
//!
//! let pool = ModelPool::new([
//!     ModelSpec::new("primary-model", Duration::from_secs(60)),
//!     ModelSpec::new("fallback-model", Duration::from_secs(20)),
//! ]);
//!
//! let request = ExtractionRequest::new(
//!     SourceContent::Text(document_text),
//!     schema,
//!     pool,
//! );
//! let source = DocumentSource::new("file-1", "https://example.com/form.pdf");
//!
//! let outcome = docstruct::pipeline::run(&inference, &request, &source, &PipelineConfig::default()).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (Inference, DocumentReader, StatusSink)
//! - [`types`] - Schemas, requests, records, provenance
//! - [`segment`] - Bounded-size chunking for text and tabular grids
//! - [`pipeline`] - Extraction, routing, consensus, orchestration
//! - [`testing`] - Deterministic mocks

pub mod error;
pub mod pipeline;
pub mod segment;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{ExtractError, Result};
pub use traits::{
    inference::Inference,
    reader::DocumentReader,
    status::{FileStatus, ProcessState, StatusSink},
};
pub use types::{
    record::{render_display_name, NamePart, Provenance, StructuredRecord},
    request::{ExtractionRequest, OutputMode, PromptStrategy, SourceContent},
    schema::{FieldSchema, FieldSpec, FieldType},
};

// Re-export segmentation
pub use segment::{
    chunk_workbook, split_content, Cell, ChunkedContent, MergeRange, Sheet, TableChunk,
    DEFAULT_MAX_CHUNK_LEN, PAGE_BREAK,
};

// Re-export pipeline components
pub use pipeline::{
    default_confidence, extract_array, extract_object, run, ConsensusResult, DocumentSource,
    ExtractionAttempt, ExtractionOutcome, ModelPool, ModelSpec, ObjectOutcome, PipelineConfig,
    RetryPolicy, SharedModelPool,
};

#[cfg(feature = "openai")]
pub use ai::OpenAIInference;

// Re-export testing utilities
pub use testing::{MockInference, MockReader, RecordingStatusSink};
