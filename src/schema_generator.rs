use crate::annotation::{strip_annotations, Annotation, AnnotationParser, FieldAnnotation};
use crate::declarations::{FieldDecl, RecordDecl, RecordKind};
use crate::schema::Schema;
use crate::spec_state::SchemaRecord;
use crate::type_resolver::{TypeExpr, TypeResolver};
use indexmap::IndexMap;
use log::debug;

/// Schema generator - converts `!model` structs into component schemas
///
/// Properties follow the struct's declared field order and are named the way serde would
/// serialize them.
pub struct SchemaGenerator;

impl SchemaGenerator {
    /// Generate the schema record for one record declaration.
    ///
    /// # Arguments
    ///
    /// * `record` - The declaration, usually a struct
    /// * `annotations` - Annotations parsed from the record's own doc comment
    ///
    /// Returns `None` for enums, unions and type aliases.
    pub fn generate(record: &RecordDecl, annotations: &[Annotation]) -> Option<SchemaRecord> {
        let RecordKind::Struct(fields) = &record.kind else {
            debug!("Skipping non-struct model {}", record.name);
            return None;
        };

        debug!("Generating schema for struct: {}", record.name);

        let mut schema = Schema::object();
        let mut examples = IndexMap::new();

        for field in fields {
            let Some(property_name) = field.serialized_name(&record.serde) else {
                debug!("Skipping field {}.{}", record.name, field.ident);
                continue;
            };

            Self::add_property(&mut schema, &property_name, field);

            for annotation in AnnotationParser::parse(&field.doc) {
                if let Annotation::Field(field_annotation) = annotation {
                    Self::apply_field_annotation(
                        &mut schema,
                        &mut examples,
                        &property_name,
                        &field_annotation,
                    );
                }
            }
        }

        // Struct level `!field` lines address properties by their serialized name.
        for annotation in annotations {
            let Annotation::Field(field_annotation) = annotation else {
                continue;
            };
            let known = schema
                .properties
                .as_ref()
                .is_some_and(|p| p.contains_key(&field_annotation.name));
            if known {
                let name = field_annotation.name.clone();
                Self::apply_field_annotation(&mut schema, &mut examples, &name, field_annotation);
            } else {
                debug!(
                    "Ignoring !field {} on {}: no such property",
                    field_annotation.name, record.name
                );
            }
        }

        let description = Self::model_description(record, annotations);
        if !description.is_empty() {
            schema.description = Some(description.clone());
        }

        Some(SchemaRecord {
            name: record.name.clone(),
            description,
            schema,
            examples,
        })
    }

    /// Add the base property for one field.
    fn add_property(schema: &mut Schema, property_name: &str, field: &FieldDecl) {
        let mut property = TypeResolver::resolve(&field.ty);

        if property.description.is_none() {
            let prose = strip_annotations(&field.doc);
            if !prose.is_empty() {
                property.description = Some(prose);
            }
        }

        if !field.serde.omit_empty {
            schema.mark_required(property_name);
        }

        schema
            .properties
            .get_or_insert_with(IndexMap::new)
            .insert(property_name.to_string(), property);
    }

    /// Apply one `!field` annotation to an existing property.
    fn apply_field_annotation(
        schema: &mut Schema,
        examples: &mut IndexMap<String, serde_json::Value>,
        property_name: &str,
        annotation: &FieldAnnotation,
    ) {
        let Some(property) = schema
            .properties
            .as_mut()
            .and_then(|p| p.get_mut(property_name))
        else {
            return;
        };

        match annotation.type_name.as_deref().map(TypeExpr::parse) {
            Some(TypeExpr::Unsupported) => {
                debug!(
                    "Keeping the declared type of {}: unreadable type override",
                    property_name
                );
            }
            Some(expr) => {
                let description = property.description.take();
                *property = TypeResolver::resolve(&expr);
                property.description = description;
            }
            None => {}
        }

        if !annotation.description.is_empty() {
            property.description = Some(annotation.description.clone());
        }

        if let Some(example) = &annotation.example {
            if !property.is_reference() {
                property.example = Some(example.clone());
            }
            examples.insert(property_name.to_string(), example.clone());
        }

        if let Some(values) = &annotation.enum_values {
            if !property.is_reference() {
                property.enum_values = Some(values.clone());
            }
        }

        if annotation.required {
            schema.mark_required(property_name);
        }
    }

    /// The `!model` description, or the struct's prose when it has none.
    fn model_description(record: &RecordDecl, annotations: &[Annotation]) -> String {
        let declared = annotations.iter().find_map(|a| match a {
            Annotation::Model(model) if !model.description.is_empty() => {
                Some(model.description.clone())
            }
            _ => None,
        });
        declared.unwrap_or_else(|| strip_annotations(&record.doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarations::SourceFile;
    use crate::parser::AstParser;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    /// Parses `code` and generates the schema of its first record
    fn generate(code: &str) -> Option<SchemaRecord> {
        let parsed = AstParser::parse_str(Path::new("model.rs"), code).unwrap();
        let file = SourceFile::from_parsed(&parsed);
        let record = &file.records[0];
        let annotations = AnnotationParser::parse(&record.doc);
        SchemaGenerator::generate(record, &annotations)
    }

    fn property_names(schema: &Schema) -> Vec<&str> {
        schema
            .properties
            .as_ref()
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_generate_simple_struct() {
        let record = generate(
            r#"
            /// !model "An item"
            pub struct Item {
                pub id: u64,
                pub name: String,
            }
        "#,
        )
        .unwrap();

        assert_eq!(record.name, "Item");
        assert_eq!(record.description, "An item");
        assert_eq!(
            serde_json::to_value(&record.schema).unwrap(),
            json!({
                "type": "object",
                "description": "An item",
                "properties": {
                    "id": {"type": "integer", "format": "int64"},
                    "name": {"type": "string"}
                },
                "required": ["id", "name"]
            })
        );
    }

    #[test]
    fn test_serde_renames_and_skips() {
        let record = generate(
            r#"
            /// !model
            #[serde(rename_all = "camelCase")]
            pub struct User {
                pub user_id: u32,
                #[serde(rename = "mail")]
                pub email_address: String,
                #[serde(skip)]
                pub password_hash: String,
                #[serde(skip_serializing)]
                pub session: String,
                #[serde(rename = "-")]
                pub dash: bool,
            }
        "#,
        )
        .unwrap();

        assert_eq!(property_names(&record.schema), vec!["userId", "mail", "-"]);
        assert_eq!(record.schema.required, vec!["userId", "mail", "-"]);
    }

    #[test]
    fn test_omit_empty_fields_are_optional() {
        let record = generate(
            r#"
            /// !model
            pub struct Pet {
                pub id: i64,
                #[serde(skip_serializing_if = "Option::is_none")]
                pub tag: Option<String>,
                pub owner: Option<Owner>,
            }
        "#,
        )
        .unwrap();

        assert_eq!(record.schema.required, vec!["id", "owner"]);
        let properties = record.schema.properties.unwrap();
        assert!(properties["tag"].nullable);
        assert_eq!(properties["owner"], Schema::reference("Owner"));
    }

    #[test]
    fn test_field_doc_becomes_description() {
        let record = generate(
            r#"
            /// !model
            pub struct Item {
                /// Stable identifier
                pub id: u64,
                /// !field name "Display name" example="Widget"
                pub name: String,
            }
        "#,
        )
        .unwrap();

        let properties = record.schema.properties.as_ref().unwrap();
        assert_eq!(properties["id"].description.as_deref(), Some("Stable identifier"));
        assert_eq!(properties["name"].description.as_deref(), Some("Display name"));
        assert_eq!(properties["name"].example, Some(json!("Widget")));
        assert_eq!(record.examples["name"], json!("Widget"));
    }

    #[test]
    fn test_struct_level_field_annotations() {
        let record = generate(
            r#"
            /// !model "A page of results"
            /// !field nextCursor "Opaque cursor" required example=abc
            /// !field total example=42
            /// !field missing "Not a property"
            #[serde(rename_all = "camelCase")]
            pub struct Page {
                pub total: u32,
                #[serde(skip_serializing_if = "Option::is_none")]
                pub next_cursor: Option<String>,
            }
        "#,
        )
        .unwrap();

        assert_eq!(record.schema.required, vec!["total", "nextCursor"]);
        let properties = record.schema.properties.as_ref().unwrap();
        assert_eq!(
            properties["nextCursor"].description.as_deref(),
            Some("Opaque cursor")
        );
        assert_eq!(properties["total"].example, Some(json!(42)));
        assert_eq!(property_names(&record.schema), vec!["total", "nextCursor"]);
        assert_eq!(record.examples.len(), 2);
    }

    #[test]
    fn test_field_annotation_overrides_type_and_enum() {
        let record = generate(
            r#"
            /// !model
            pub struct Order {
                /// Order state
                /// !field status:string (open|closed)
                pub status: OrderStatus,
            }
        "#,
        )
        .unwrap();

        let status = &record.schema.properties.as_ref().unwrap()["status"];
        assert_eq!(status.schema_type.as_deref(), Some("string"));
        assert_eq!(status.description.as_deref(), Some("Order state"));
        assert_eq!(status.enum_values, Some(vec![json!("open"), json!("closed")]));
    }

    #[test]
    fn test_field_type_override_with_generic_arguments() {
        let record = generate(
            r#"
            /// !model
            pub struct Stats {
                /// Hits per page
                /// !field counts:HashMap<String, i64>
                pub counts: Counts,
                /// !field totals:Vec<
                pub totals: HashMap<String, u32>,
            }
        "#,
        )
        .unwrap();

        let properties = record.schema.properties.as_ref().unwrap();
        assert_eq!(
            properties["counts"],
            Schema {
                description: Some("Hits per page".to_string()),
                ..Schema::map(Some(Schema::typed("integer", Some("int64"))))
            }
        );
        assert_eq!(
            properties["totals"],
            Schema::map(Some(Schema::typed("integer", Some("int32"))))
        );
    }

    #[test]
    fn test_required_is_not_duplicated() {
        let record = generate(
            r#"
            /// !model
            /// !field id required
            pub struct Item {
                /// !field id required
                pub id: u64,
            }
        "#,
        )
        .unwrap();

        assert_eq!(record.schema.required, vec!["id"]);
    }

    #[test]
    fn test_description_falls_back_to_prose() {
        let record = generate(
            r#"
            /// A tag attached to pets.
            ///
            /// !model
            pub struct Tag {
                pub name: String,
            }
        "#,
        )
        .unwrap();

        assert_eq!(record.description, "A tag attached to pets.");
        assert_eq!(
            record.schema.description.as_deref(),
            Some("A tag attached to pets.")
        );
    }

    #[test]
    fn test_tuple_struct_has_no_properties() {
        let record = generate(
            r#"
            /// !model
            pub struct Meters(f64);
        "#,
        )
        .unwrap();

        assert_eq!(record.schema, Schema::object());
    }

    #[test]
    fn test_enum_is_not_eligible() {
        assert!(generate(
            r#"
            /// !model
            pub enum Status { Active, Disabled }
        "#,
        )
        .is_none());
    }
}
