use crate::openapi_builder::{
    ExternalDocs, HttpMethod, Info, Parameter, RequestBody, Response, SecurityRequirement,
    SecurityScheme, Server, Tag,
};
use crate::schema::Schema;
use indexmap::IndexMap;
use log::debug;

/// OpenAPI version used when no `!api` line is found.
pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.3";

/// Accumulator for everything discovered during one run.
///
/// Created once, filled by the walker file by file and read once by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecState {
    pub version: String,
    pub info: Info,
    pub servers: Vec<Server>,
    pub tags: Vec<Tag>,
    pub operations: Vec<OperationRecord>,
    /// Schemas declared with `!schema`
    pub schemas: IndexMap<String, SchemaRecord>,
    /// Schemas inferred from `!model` structs
    pub global_schemas: IndexMap<String, SchemaRecord>,
    pub security_schemes: IndexMap<String, SecurityScheme>,
    pub external_docs: Option<ExternalDocs>,
    pub links: Vec<LinkRecord>,
}

/// One discovered route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationRecord {
    pub method: Option<HttpMethod>,
    pub path: String,
    pub operation_id: String,
    pub summary: String,
    pub description: String,
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    /// Keyed by status code
    pub responses: IndexMap<String, Response>,
    pub security: Vec<SecurityRequirement>,
}

/// One named data shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRecord {
    pub name: String,
    pub description: String,
    pub schema: Schema,
    /// `!field` example values by property name
    pub examples: IndexMap<String, serde_json::Value>,
}

/// Extra documentation link rendered into the info description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub label: String,
    pub url: String,
}

impl Default for SpecState {
    fn default() -> Self {
        Self {
            version: DEFAULT_OPENAPI_VERSION.to_string(),
            info: Info::default(),
            servers: Vec::new(),
            tags: Vec::new(),
            operations: Vec::new(),
            schemas: IndexMap::new(),
            global_schemas: IndexMap::new(),
            security_schemes: IndexMap::new(),
            external_docs: None,
            links: Vec::new(),
        }
    }
}

impl SpecState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation when both method and path are set.
    ///
    /// Returns whether the operation was kept.
    pub fn add_operation(&mut self, operation: OperationRecord) -> bool {
        if operation.method.is_none() || operation.path.is_empty() {
            debug!(
                "Discarding operation without route (id {:?})",
                operation.operation_id
            );
            return false;
        }
        self.operations.push(operation);
        true
    }

    /// Inserts an explicit schema unless the name is already taken.
    pub fn add_schema(&mut self, record: SchemaRecord) -> bool {
        insert_if_absent(&mut self.schemas, record)
    }

    /// Inserts a struct-inferred schema unless the name is already taken.
    pub fn add_global_schema(&mut self, record: SchemaRecord) -> bool {
        insert_if_absent(&mut self.global_schemas, record)
    }

    /// All schemas: explicit ones first, then global ones whose name is still free.
    pub fn merged_schemas(&self) -> IndexMap<&str, &SchemaRecord> {
        let mut merged: IndexMap<&str, &SchemaRecord> = self
            .schemas
            .iter()
            .map(|(name, record)| (name.as_str(), record))
            .collect();
        for (name, record) in &self.global_schemas {
            merged.entry(name.as_str()).or_insert(record);
        }
        merged
    }
}

fn insert_if_absent(collection: &mut IndexMap<String, SchemaRecord>, record: SchemaRecord) -> bool {
    if collection.contains_key(&record.name) {
        debug!("Schema {} already declared, keeping the first", record.name);
        return false;
    }
    collection.insert(record.name.clone(), record);
    true
}
