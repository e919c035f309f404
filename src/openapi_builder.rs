use crate::schema::Schema;
use crate::spec_state::{LinkRecord, OperationRecord, SpecState};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// HTTP methods an operation can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Parse an annotation verb (`GET`, `get`, `Get`, ...)
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "put" => Some(HttpMethod::Put),
            "post" => Some(HttpMethod::Post),
            "delete" => Some(HttpMethod::Delete),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            "patch" => Some(HttpMethod::Patch),
            "trace" => Some(HttpMethod::Trace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }
}

/// Parameter location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
}

/// Security requirement: scheme name to required scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// OpenAPI Info object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "termsOfService", skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDocs {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    /// The slot for `method`
    pub fn slot_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Trace => &mut self.trace,
        }
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, Response>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// Media type used for every request and response body
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A single `application/json` content map
pub fn json_content(schema: Schema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(JSON_MEDIA_TYPE.to_string(), MediaType { schema });
    content
}

/// OpenAPI SecurityScheme object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    /// `apiKey`, `http`, `oauth2` or `openIdConnect`; unset for unknown kinds
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub scheme_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// apiKey parameter name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// apiKey location
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// http scheme (`bearer`, `basic`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<OAuthFlows>,
    #[serde(rename = "openIdConnectUrl", skip_serializing_if = "Option::is_none")]
    pub open_id_connect_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthFlows {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<OAuthFlow>,
    #[serde(rename = "clientCredentials", skip_serializing_if = "Option::is_none")]
    pub client_credentials: Option<OAuthFlow>,
    #[serde(rename = "authorizationCode", skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
}

impl OAuthFlows {
    /// Every flow that is set
    pub fn flows_mut(&mut self) -> impl Iterator<Item = &mut OAuthFlow> {
        [
            self.implicit.as_mut(),
            self.password.as_mut(),
            self.client_credentials.as_mut(),
            self.authorization_code.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthFlow {
    #[serde(rename = "authorizationUrl", skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(rename = "tokenUrl", skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    pub scopes: IndexMap<String, String>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,
    #[serde(
        rename = "securitySchemes",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    pub paths: IndexMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(rename = "externalDocs", skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

/// `Some(text)` unless `text` is empty
pub fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// OpenAPI document builder
///
/// Turns a finished [`SpecState`] into the document handed to the serializer.
pub struct OpenApiBuilder;

impl OpenApiBuilder {
    /// Build the final OpenAPI document
    pub fn build(state: &SpecState) -> OpenApiDocument {
        debug!(
            "Building OpenAPI document from {} operations",
            state.operations.len()
        );

        OpenApiDocument {
            openapi: state.version.clone(),
            info: Self::build_info(state),
            servers: state.servers.clone(),
            tags: state.tags.clone(),
            paths: Self::build_paths(&state.operations),
            components: Self::build_components(state),
            external_docs: state.external_docs.clone(),
        }
    }

    fn build_info(state: &SpecState) -> Info {
        let mut info = state.info.clone();
        if let Some(links) = render_links(&state.links) {
            let description = match info.description.take() {
                Some(text) => format!("{}\n\n{}", text, links),
                None => links,
            };
            info.description = Some(description);
        }
        info
    }

    /// Operations sharing a path and method overwrite each other; the last one wins.
    fn build_paths(operations: &[OperationRecord]) -> IndexMap<String, PathItem> {
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();

        for record in operations {
            let Some(method) = record.method else {
                continue;
            };

            let path_item = paths.entry(record.path.clone()).or_default();
            let slot = path_item.slot_mut(method);
            if slot.is_some() {
                debug!(
                    "Replacing {} {} with operation {:?}",
                    method.as_str(),
                    record.path,
                    record.operation_id
                );
            }
            *slot = Some(Self::build_operation(record));
        }

        paths
    }

    fn build_operation(record: &OperationRecord) -> Operation {
        Operation {
            tags: record.tags.clone(),
            summary: non_empty(&record.summary),
            description: non_empty(&record.description),
            operation_id: non_empty(&record.operation_id),
            parameters: record.parameters.clone(),
            request_body: record.request_body.clone(),
            responses: record.responses.clone(),
            deprecated: record.deprecated,
            security: record.security.clone(),
        }
    }

    /// Omitted when there are neither schemas nor security schemes.
    fn build_components(state: &SpecState) -> Option<Components> {
        let schemas: IndexMap<String, Schema> = state
            .merged_schemas()
            .into_iter()
            .map(|(name, record)| (name.to_string(), record.schema.clone()))
            .collect();

        if schemas.is_empty() && state.security_schemes.is_empty() {
            return None;
        }

        Some(Components {
            schemas,
            security_schemes: state.security_schemes.clone(),
        })
    }
}

/// Render collected links as a markdown list.
fn render_links(links: &[LinkRecord]) -> Option<String> {
    if links.is_empty() {
        return None;
    }
    let mut text = String::from("Some useful links:\n");
    for link in links {
        text.push_str(&format!("- [{}]({})\n", link.label, link.url));
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec_state::SchemaRecord;
    use pretty_assertions::assert_eq;

    fn operation(method: HttpMethod, path: &str, id: &str) -> OperationRecord {
        OperationRecord {
            method: Some(method),
            path: path.to_string(),
            operation_id: id.to_string(),
            ..OperationRecord::default()
        }
    }

    #[test]
    fn test_http_method_from_verb() {
        assert_eq!(HttpMethod::from_verb("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_verb("trace"), Some(HttpMethod::Trace));
        assert_eq!(HttpMethod::from_verb("Patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_verb("fetch"), None);
    }

    #[test]
    fn test_empty_state_builds_minimal_document() {
        let document = OpenApiBuilder::build(&SpecState::new());
        assert_eq!(document.openapi, "3.0.3");
        assert!(document.paths.is_empty());
        assert!(document.components.is_none());

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "openapi": "3.0.3",
                "info": {"title": "", "version": ""},
                "paths": {}
            })
        );
    }

    #[test]
    fn test_operations_grouped_by_path() {
        let mut state = SpecState::new();
        state.add_operation(operation(HttpMethod::Get, "/users", "listUsers"));
        state.add_operation(operation(HttpMethod::Post, "/users", "createUser"));
        state.add_operation(operation(HttpMethod::Get, "/users/{id}", "getUser"));

        let document = OpenApiBuilder::build(&state);
        assert_eq!(document.paths.len(), 2);

        let users = &document.paths["/users"];
        assert_eq!(
            users.operation(HttpMethod::Get).unwrap().operation_id.as_deref(),
            Some("listUsers")
        );
        assert_eq!(
            users.operation(HttpMethod::Post).unwrap().operation_id.as_deref(),
            Some("createUser")
        );
        assert!(users.operation(HttpMethod::Delete).is_none());
    }

    #[test]
    fn test_same_path_and_method_last_wins() {
        let mut state = SpecState::new();
        state.add_operation(operation(HttpMethod::Get, "/items", "first"));
        state.add_operation(operation(HttpMethod::Get, "/items", "second"));

        let document = OpenApiBuilder::build(&state);
        assert_eq!(
            document.paths["/items"].get.as_ref().unwrap().operation_id.as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_links_appended_to_description() {
        let mut state = SpecState::new();
        state.info.description = Some("Pet store".to_string());
        state.links.push(LinkRecord {
            label: "Docs".to_string(),
            url: "https://docs.test.com".to_string(),
        });

        let document = OpenApiBuilder::build(&state);
        assert_eq!(
            document.info.description.as_deref(),
            Some("Pet store\n\nSome useful links:\n- [Docs](https://docs.test.com)\n")
        );
    }

    #[test]
    fn test_links_without_description() {
        let mut state = SpecState::new();
        state.links.push(LinkRecord {
            label: "Home".to_string(),
            url: "https://test.com".to_string(),
        });

        let document = OpenApiBuilder::build(&state);
        assert_eq!(
            document.info.description.as_deref(),
            Some("Some useful links:\n- [Home](https://test.com)\n")
        );
    }

    #[test]
    fn test_components_with_only_security_schemes() {
        let mut state = SpecState::new();
        state.security_schemes.insert(
            "bearerAuth".to_string(),
            SecurityScheme {
                scheme_type: Some("http".to_string()),
                scheme: Some("bearer".to_string()),
                ..SecurityScheme::default()
            },
        );

        let components = OpenApiBuilder::build(&state).components.unwrap();
        assert!(components.schemas.is_empty());
        assert_eq!(components.security_schemes.len(), 1);

        let value = serde_json::to_value(&components).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "securitySchemes": {"bearerAuth": {"type": "http", "scheme": "bearer"}}
            })
        );
    }

    #[test]
    fn test_components_merge_explicit_first() {
        let mut state = SpecState::new();
        state.add_global_schema(SchemaRecord {
            name: "User".to_string(),
            schema: Schema::object(),
            ..SchemaRecord::default()
        });
        state.add_schema(SchemaRecord {
            name: "User".to_string(),
            schema: Schema::typed("string", None),
            ..SchemaRecord::default()
        });

        let components = OpenApiBuilder::build(&state).components.unwrap();
        assert_eq!(components.schemas["User"], Schema::typed("string", None));
    }

    #[test]
    fn test_operation_serialization() {
        let mut record = operation(HttpMethod::Get, "/pets/{id}", "getPet");
        record.summary = "Fetch a pet".to_string();
        record.deprecated = true;
        record.parameters.push(Parameter {
            name: "id".to_string(),
            location: ParameterLocation::Path,
            description: None,
            required: true,
            schema: Schema::typed("integer", Some("int32")),
            example: None,
        });
        record.responses.insert(
            "200".to_string(),
            Response {
                description: "The pet".to_string(),
                content: Some(json_content(Schema::reference("Pet"))),
            },
        );
        let mut requirement = SecurityRequirement::new();
        requirement.insert("apiKey".to_string(), Vec::new());
        record.security.push(requirement);

        let value = serde_json::to_value(OpenApiBuilder::build_operation(&record)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "summary": "Fetch a pet",
                "operationId": "getPet",
                "parameters": [{
                    "name": "id",
                    "in": "path",
                    "required": true,
                    "schema": {"type": "integer", "format": "int32"}
                }],
                "responses": {
                    "200": {
                        "description": "The pet",
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/Pet"}
                            }
                        }
                    }
                },
                "deprecated": true,
                "security": [{"apiKey": []}]
            })
        );
    }
}
