//! Schema-driven extraction: one model call that fills a field schema
//! from a content chunk, with defensive response parsing.

use serde_json::{Map, Value};

use crate::error::{ExtractError, Result};
use crate::pipeline::prompts::format_extract_prompt;
use crate::pipeline::router::{generate_with_rotation, RetryPolicy, SharedModelPool};
use crate::traits::inference::Inference;
use crate::types::request::{OutputMode, PromptStrategy};
use crate::types::schema::FieldSchema;

/// One model answer for one chunk. Created per call, discarded after
/// aggregation.
#[derive(Debug, Clone)]
pub struct ExtractionAttempt {
    pub strategy: PromptStrategy,
    pub raw: String,
    pub fields: Option<Map<String, Value>>,
}

impl ExtractionAttempt {
    pub fn succeeded(&self) -> bool {
        self.fields.is_some()
    }
}

/// Repair common model-output damage before JSON decoding: trim
/// whitespace, drop trailing noise after the last `}`, and restore a
/// missing leading `{` (models prefilled with `{` omit it).
fn repair_json(raw: &str) -> Option<String> {
    let text = raw.trim();
    let end = text.rfind('}')?;
    let truncated = &text[..=end];
    if truncated.starts_with('{') {
        Some(truncated.to_string())
    } else {
        Some(format!("{{{truncated}"))
    }
}

/// Decode a model response as a JSON object, tolerating truncation and
/// trailing noise. Failures carry the raw text.
pub fn parse_object_response(raw: &str) -> Result<Map<String, Value>> {
    let candidate = repair_json(raw).ok_or_else(|| ExtractError::Parse {
        raw: raw.to_string(),
        source: serde_json::from_str::<Value>("").unwrap_err(),
    })?;

    match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ExtractError::Parse {
            raw: raw.to_string(),
            source: serde_json::from_value::<Map<String, Value>>(other).unwrap_err(),
        }),
        Err(source) => Err(ExtractError::Parse {
            raw: raw.to_string(),
            source,
        }),
    }
}

/// Decode an array-mode response: `{"records": [...]}`. Non-object
/// elements are dropped; the same defensive repair applies.
pub fn parse_array_response(raw: &str) -> Result<Vec<Map<String, Value>>> {
    let map = parse_object_response(raw)?;
    let records = match map.get("records") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    };
    Ok(records)
}

/// Strict-mode backfill: every schema key absent from the decoded map is
/// set to null, guaranteeing complete field coverage regardless of what
/// the model returned.
pub fn backfill_schema_keys(fields: &mut Map<String, Value>, schema: &FieldSchema) {
    for key in schema.keys() {
        fields.entry(key.to_string()).or_insert(Value::Null);
    }
}

/// Null out compound (object/array) values; record fields are scalars.
pub fn null_compound_values(fields: &mut Map<String, Value>) {
    for value in fields.values_mut() {
        if value.is_object() || value.is_array() {
            *value = Value::Null;
        }
    }
}

/// One object-mode extraction call: prompt, routed generation, defensive
/// parse, strict backfill.
pub async fn extract_object_chunk<I: Inference + ?Sized>(
    inference: &I,
    pool: &SharedModelPool,
    policy: &RetryPolicy,
    content: &str,
    schema: &FieldSchema,
    instruction: &str,
    strategy: PromptStrategy,
) -> Result<ExtractionAttempt> {
    let prompt = format_extract_prompt(content, schema, instruction, strategy, OutputMode::Object);
    let raw = generate_with_rotation(inference, pool, policy, &prompt).await?;

    tracing::debug!(strategy = strategy.tag(), raw_len = raw.len(), "model response received");

    let mut fields = parse_object_response(&raw)?;
    backfill_schema_keys(&mut fields, schema);

    Ok(ExtractionAttempt {
        strategy,
        raw,
        fields: Some(fields),
    })
}

/// One array-mode extraction call: expects `records`, backfills every
/// record and nulls compound values.
pub async fn extract_array_chunk<I: Inference + ?Sized>(
    inference: &I,
    pool: &SharedModelPool,
    policy: &RetryPolicy,
    content: &str,
    schema: &FieldSchema,
    instruction: &str,
) -> Result<Vec<Map<String, Value>>> {
    let prompt = format_extract_prompt(
        content,
        schema,
        instruction,
        PromptStrategy::Table,
        OutputMode::Array,
    );
    let raw = generate_with_rotation(inference, pool, policy, &prompt).await?;

    tracing::debug!(raw_len = raw.len(), "array-mode model response received");

    let mut records = parse_array_response(&raw)?;
    for record in &mut records {
        null_compound_values(record);
        backfill_schema_keys(record, schema);
    }
    Ok(records)
}
