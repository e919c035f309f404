use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix of every reference into the components block.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// OpenAPI Schema definition.
///
/// A node is either a reference (`$ref`, optionally with a description override) or an
/// inline description built from the remaining fields. The constructors below never build a
/// node that mixes the two.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to a component schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "int64", "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Human readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Value schema for string-keyed maps
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<Schema>>,
    /// Properties for object types, in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required property names, in the order they were added
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    /// Enum values
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
}

impl Schema {
    /// A `$ref` node pointing at `#/components/schemas/<name>`.
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", SCHEMA_REF_PREFIX, name)),
            ..Self::default()
        }
    }

    /// A node with a base type and optional format.
    pub fn typed(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: format.map(str::to_string),
            ..Self::default()
        }
    }

    /// An array node; `items` stays unset when the element could not be resolved.
    pub fn array(items: Option<Schema>) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: items.map(Box::new),
            ..Self::default()
        }
    }

    /// An open map node keyed by strings.
    pub fn map(values: Option<Schema>) -> Self {
        Self {
            schema_type: Some("object".to_string()),
            additional_properties: values.map(Box::new),
            ..Self::default()
        }
    }

    /// An object node with an empty property table.
    pub fn object() -> Self {
        Self {
            schema_type: Some("object".to_string()),
            properties: Some(IndexMap::new()),
            ..Self::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// True when the node carries no constraint at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Name of the referenced component, if this is a reference node.
    pub fn referenced_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX))
    }

    /// Adds `name` to the required list unless it is already there.
    pub fn mark_required(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }
}
