//! Trigger-payload job descriptor.

use docstruct::{FieldSchema, NamePart, OutputMode};
use indexmap::IndexMap;
use serde::Deserialize;

/// One job: a set of files to structure against one schema, with the
/// callback endpoint to deliver results to.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDescriptor {
    #[serde(rename = "ticketId")]
    pub ticket_id: String,

    pub files: Vec<JobFile>,

    pub schema: SchemaDescriptor,

    /// Caller's free-text instruction.
    #[serde(default)]
    pub prompt: String,

    /// Display-name template parts (literals and field references).
    #[serde(rename = "genSourceName", default)]
    pub gen_source_name: Vec<NamePart>,

    /// Callback endpoint results are POSTed to.
    #[serde(rename = "apiEndpoint")]
    pub api_endpoint: String,

    #[serde(default)]
    pub type_output: OutputMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub id: String,
    pub url: String,
}

/// Caller-supplied schema: named properties with loose type names.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDescriptor {
    pub properties: IndexMap<String, PropertyDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyDescriptor {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub description: String,
}

impl SchemaDescriptor {
    /// Resolve loose property descriptors into a typed field schema,
    /// preserving property order.
    pub fn to_field_schema(&self) -> FieldSchema {
        FieldSchema::from_properties(self.properties.iter().map(|(name, prop)| {
            (
                name.as_str(),
                prop.type_name.as_str(),
                prop.description.as_str(),
            )
        }))
    }
}
