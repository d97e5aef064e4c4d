//! Core data types for schema-driven structuring.

pub mod record;
pub mod request;
pub mod schema;

pub use record::{NamePart, Provenance, StructuredRecord};
pub use request::{ExtractionRequest, OutputMode, PromptStrategy, SourceContent};
pub use schema::{FieldSchema, FieldSpec, FieldType};
