//! Tool argument schemas.
//!
//! Schemas are explicit descriptor values built at scene-registration
//! time from typed property definitions, then rendered to JSON Schema
//! when a tool set is handed to a provider. No runtime reflection is
//! involved.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// JSON Schema primitive type of a tool argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    fn type_name(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
        }
    }
}

/// One named argument in a tool schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    pub name: String,
    pub description: String,
    pub kind: SchemaType,
    pub required: bool,
}

impl SchemaProperty {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: SchemaType,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required,
        }
    }
}

/// Explicit argument schema for a tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    properties: Vec<SchemaProperty>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, property: SchemaProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn properties(&self) -> &[SchemaProperty] {
        &self.properties
    }

    /// Render as a JSON Schema object suitable for a provider tool list
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut props = serde_json::Map::new();
        let mut required = Vec::new();

        for p in &self.properties {
            props.insert(
                p.name.clone(),
                json!({
                    "type": p.kind.type_name(),
                    "description": p.description,
                }),
            );
            if p.required {
                required.push(serde_json::Value::String(p.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": props,
            "required": required,
        })
    }
}
