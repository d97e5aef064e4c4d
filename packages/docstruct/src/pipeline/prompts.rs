//! LLM prompts for schema-driven extraction.
//!
//! One base template plus strategy-specific emphasis blocks. Prompts ask
//! for minified JSON with exactly the schema's keys and forbid invented
//! values; the defensive parser in `extract` handles the rest.

use crate::types::request::{OutputMode, PromptStrategy};
use crate::types::schema::FieldSchema;

/// Base extraction prompt.
pub const EXTRACT_PROMPT: &str = r#"Extract all relevant information from the given document to fill the response schema.
Pay attention to various data structures including plain text, tables, lists, and key-value pairs.

General guidelines:
1. Thoroughly analyze the entire document to extract all relevant information.
2. Ensure that relationships between different pieces of information are preserved.
3. If information for a field is not found, use null as the default value. Never invent values that are not supported by the document.
{emphasis}

{format_instructions}
Generate the output as a valid JSON object in a minified format (without spaces or line breaks).

User additional prompt:
{instruction}

Document content:
{content}"#;

/// Emphasis for table-heavy documents.
pub const TABLE_EMPHASIS: &str = r#"For tables, pay extra attention to:
- Identifying all tables in the document.
- Extracting headers and all data rows accurately.
- Interpreting merged cells and complex table structures correctly.
- Preserving relationships between table headers and data."#;

/// Emphasis for list-heavy documents.
pub const LIST_EMPHASIS: &str = r#"For lists, pay extra attention to:
- Identifying all types of lists (bulleted, numbered, or otherwise).
- Capturing the hierarchy and structure of nested lists.
- Preserving the relationship between list items and any associated descriptions."#;

/// Emphasis for key-value documents (forms, cover sheets).
pub const KEY_VALUE_EMPHASIS: &str = r#"For key-value structures, pay extra attention to:
- Identifying all key-value pairs in various formats (e.g., "Key: Value", "Key = Value", or tabular layouts).
- Correctly associating multi-line values with their keys.
- Recognizing implied keys or values based on context."#;

/// Neutral emphasis used by the default strategy.
pub const DEFAULT_EMPHASIS: &str =
    "Pay equal attention to all types of data structures and information present in the document.";

/// Emphasis text for a strategy.
pub fn strategy_emphasis(strategy: PromptStrategy) -> &'static str {
    match strategy {
        PromptStrategy::Default => DEFAULT_EMPHASIS,
        PromptStrategy::Table => TABLE_EMPHASIS,
        PromptStrategy::List => LIST_EMPHASIS,
        PromptStrategy::KeyValue => KEY_VALUE_EMPHASIS,
    }
}

/// Render the schema as field-by-field format instructions.
///
/// Object mode asks for one JSON object with exactly the schema keys;
/// array mode asks for `{"records": [...]}` of such objects.
pub fn format_instructions(schema: &FieldSchema, mode: OutputMode) -> String {
    let mut out = String::new();
    match mode {
        OutputMode::Object => {
            out.push_str("Respond with a JSON object containing exactly these keys:\n");
        }
        OutputMode::Array => {
            out.push_str(
                "Respond with a JSON object of the form {\"records\": [...]} where every \
                 element of \"records\" is an object containing exactly these keys:\n",
            );
        }
    }
    for field in schema.iter() {
        out.push_str(&format!(
            "- \"{}\" ({}): {}. Value of field must be in type {} or null.\n",
            field.name,
            field.field_type.as_str(),
            field.description,
            field.field_type.as_str(),
        ));
    }
    out
}

/// Build the full extraction prompt for one chunk.
pub fn format_extract_prompt(
    content: &str,
    schema: &FieldSchema,
    instruction: &str,
    strategy: PromptStrategy,
    mode: OutputMode,
) -> String {
    EXTRACT_PROMPT
        .replace("{emphasis}", strategy_emphasis(strategy))
        .replace("{format_instructions}", &format_instructions(schema, mode))
        .replace("{instruction}", instruction)
        .replace("{content}", content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::schema::FieldType;

    fn schema() -> FieldSchema {
        FieldSchema::new()
            .with_field("name", FieldType::String, "full name")
            .with_field("age", FieldType::Number, "age in years")
    }

    #[test]
    fn test_prompt_carries_schema_and_content() {
        let prompt = format_extract_prompt(
            "Name: Ada\nAge: 36",
            &schema(),
            "extract the person",
            PromptStrategy::Default,
            OutputMode::Object,
        );

        assert!(prompt.contains("\"name\" (string): full name"));
        assert!(prompt.contains("\"age\" (number): age in years"));
        assert!(prompt.contains("Name: Ada"));
        assert!(prompt.contains("extract the person"));
        assert!(prompt.contains("minified format"));
        assert!(!prompt.contains("{emphasis}"));
    }

    #[test]
    fn test_table_strategy_adds_merged_cell_emphasis() {
        let prompt = format_extract_prompt(
            "a|b",
            &schema(),
            "",
            PromptStrategy::Table,
            OutputMode::Array,
        );

        assert!(prompt.contains("merged cells"));
        assert!(prompt.contains("\"records\""));
    }

    #[test]
    fn test_each_strategy_has_distinct_emphasis() {
        let all = [
            PromptStrategy::Default,
            PromptStrategy::Table,
            PromptStrategy::List,
            PromptStrategy::KeyValue,
        ];
        let texts: Vec<&str> = all.iter().map(|s| strategy_emphasis(*s)).collect();
        for (i, a) in texts.iter().enumerate() {
            for b in texts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
