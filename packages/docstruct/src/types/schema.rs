//! Field schemas supplied per job by the caller.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Data type a field value is expected to take.
///
/// Loose schema type names from the job descriptor map onto these three
/// via [`FieldType::from_loose`]; unknown names fall back to `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
}

impl FieldType {
    /// Map a caller-supplied type name onto a concrete type.
    ///
    /// Accepts the aliases seen in the wild ("text", "float", "int", ...).
    /// Anything unrecognized falls back to `String`.
    pub fn from_loose(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => FieldType::String,
            "number" | "float" | "integer" | "int" => FieldType::Number,
            "boolean" | "bool" => FieldType::Boolean,
            _ => FieldType::String,
        }
    }

    /// Name used when describing the field to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }
}

/// One field the caller wants extracted. Immutable, supplied per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub description: String,
}

impl FieldSpec {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: description.into(),
        }
    }
}

/// Ordered set of field specs. Insertion order is the schema order and is
/// preserved through prompting, consensus, and output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSchema {
    fields: IndexMap<String, FieldSpec>,
}

impl FieldSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from `(name, type name, description)` property
    /// descriptors, resolving loose type names via [`FieldType::from_loose`].
    pub fn from_properties<'a, I>(properties: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        let mut schema = Self::new();
        for (name, type_name, description) in properties {
            schema.push(FieldSpec::new(
                name,
                FieldType::from_loose(type_name),
                description,
            ));
        }
        schema
    }

    /// Add a field, replacing any existing spec with the same name.
    pub fn push(&mut self, spec: FieldSpec) {
        self.fields.insert(spec.name.clone(), spec);
    }

    /// Builder-style field addition.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.push(FieldSpec::new(name, field_type, description));
        self
    }

    /// Field names in schema order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Field specs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_type_mapping() {
        assert_eq!(FieldType::from_loose("text"), FieldType::String);
        assert_eq!(FieldType::from_loose("float"), FieldType::Number);
        assert_eq!(FieldType::from_loose("integer"), FieldType::Number);
        assert_eq!(FieldType::from_loose("Boolean"), FieldType::Boolean);
        // Unknown names fall back to String
        assert_eq!(FieldType::from_loose("geopoint"), FieldType::String);
    }

    #[test]
    fn test_schema_preserves_order() {
        let schema = FieldSchema::from_properties([
            ("zip", "text", "postal code"),
            ("amount", "number", "total amount"),
            ("active", "boolean", "still active"),
        ]);

        let keys: Vec<_> = schema.keys().collect();
        assert_eq!(keys, vec!["zip", "amount", "active"]);
        assert_eq!(schema.get("amount").unwrap().field_type, FieldType::Number);
    }
}
