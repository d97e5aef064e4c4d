//! Structured records and their provenance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record-level metadata identifying the originating document and a
/// human-readable display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_id: String,
    pub source_url: String,
    pub display_name: String,
}

/// One part of a caller-supplied display-name template: either a literal
/// or a reference to an extracted field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "target", rename_all = "lowercase")]
pub enum NamePart {
    Text(String),
    Column(String),
}

/// Render a display name by concatenating literal parts and looked-up
/// field values. Missing or null fields render as empty.
pub fn render_display_name(parts: &[NamePart], fields: &Map<String, Value>) -> String {
    let mut name = String::new();
    for part in parts {
        match part {
            NamePart::Text(literal) => name.push_str(literal),
            NamePart::Column(field) => match fields.get(field.as_str()) {
                Some(Value::Null) | None => {}
                Some(Value::String(s)) => name.push_str(s),
                Some(other) => name.push_str(&other.to_string()),
            },
        }
    }
    name
}

/// A schema-conformant record plus provenance. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub fields: Map<String, Value>,
    pub provenance: Provenance,
}

impl StructuredRecord {
    pub fn new(fields: Map<String, Value>, provenance: Provenance) -> Self {
        Self { fields, provenance }
    }

    /// Flatten into the wire shape: extracted fields plus `_src_id`,
    /// `_src_url`, `_src_name` provenance keys.
    pub fn into_payload(self) -> Map<String, Value> {
        let mut payload = self.fields;
        payload.insert("_src_id".into(), Value::String(self.provenance.source_id));
        payload.insert("_src_url".into(), Value::String(self.provenance.source_url));
        payload.insert(
            "_src_name".into(),
            Value::String(self.provenance.display_name),
        );
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("city".into(), json!("Sapporo"));
        m.insert("count".into(), json!(12));
        m.insert("missing".into(), Value::Null);
        m
    }

    #[test]
    fn test_render_display_name() {
        let parts = vec![
            NamePart::Text("report-".into()),
            NamePart::Column("city".into()),
            NamePart::Text("-".into()),
            NamePart::Column("count".into()),
        ];
        assert_eq!(render_display_name(&parts, &fields()), "report-Sapporo-12");
    }

    #[test]
    fn test_render_display_name_skips_null_and_absent() {
        let parts = vec![
            NamePart::Column("missing".into()),
            NamePart::Column("nonexistent".into()),
            NamePart::Text("x".into()),
        ];
        assert_eq!(render_display_name(&parts, &fields()), "x");
    }

    #[test]
    fn test_payload_carries_provenance_keys() {
        let record = StructuredRecord::new(
            fields(),
            Provenance {
                source_id: "f-1".into(),
                source_url: "https://example.com/doc.pdf".into(),
                display_name: "report-Sapporo".into(),
            },
        );

        let payload = record.into_payload();
        assert_eq!(payload["_src_id"], json!("f-1"));
        assert_eq!(payload["_src_url"], json!("https://example.com/doc.pdf"));
        assert_eq!(payload["_src_name"], json!("report-Sapporo"));
        assert_eq!(payload["city"], json!("Sapporo"));
    }
}
