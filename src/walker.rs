//! Declaration walker.
//!
//! Folds the annotations of one [`SourceFile`] at a time into a shared [`SpecState`]:
//! API level annotations from every doc block, one operation per annotated routine and one
//! schema per `!model` struct.

use crate::annotation::{
    strip_annotations, Annotation, AnnotationParser, ParamAnnotation, ResponseAnnotation,
    ScopeAnnotation, SchemaAnnotation, SecurityAnnotation, MARKER,
};
use crate::declarations::{RecordDecl, RoutineDecl, SourceFile};
use crate::openapi_builder::{
    json_content, non_empty, Contact, ExternalDocs, License, OAuthFlow, OAuthFlows, Parameter,
    ParameterLocation, RequestBody, Response, SecurityRequirement, SecurityScheme, Server, Tag,
};
use crate::schema_generator::SchemaGenerator;
use crate::spec_state::{LinkRecord, OperationRecord, SchemaRecord, SpecState};
use crate::type_resolver::TypeResolver;
use indexmap::IndexMap;
use log::debug;

/// Walks source files and accumulates everything they declare into a [`SpecState`].
///
/// # Example
///
/// ```
/// use openapi_from_annotations::declarations::SourceFile;
/// use openapi_from_annotations::parser::AstParser;
/// use openapi_from_annotations::spec_state::SpecState;
/// use openapi_from_annotations::walker::DeclarationWalker;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_str(
///     Path::new("lib.rs"),
///     "/// !GET /health -> health\n/// !ok - \"Alive\"\npub fn health() {}",
/// )
/// .unwrap();
///
/// let mut state = SpecState::new();
/// DeclarationWalker::new(&mut state).walk_file(&SourceFile::from_parsed(&parsed));
/// assert_eq!(state.operations.len(), 1);
/// ```
pub struct DeclarationWalker<'a> {
    state: &'a mut SpecState,
}

impl<'a> DeclarationWalker<'a> {
    pub fn new(state: &'a mut SpecState) -> Self {
        Self { state }
    }

    /// Process one file: doc blocks first, then routines, then records.
    pub fn walk_file(&mut self, file: &SourceFile) {
        debug!("Walking declarations of {}", file.path.display());

        for block in &file.doc_blocks {
            for annotation in AnnotationParser::parse(block) {
                if annotation.is_api_level() {
                    self.apply_api_annotation(annotation);
                }
            }
        }

        for routine in &file.routines {
            if let Some(operation) = Self::build_operation(routine) {
                self.state.add_operation(operation);
            }
        }

        for record in &file.records {
            self.visit_record(record);
        }
    }

    /// Dispatch one API level annotation into the state.
    fn apply_api_annotation(&mut self, annotation: Annotation) {
        let state = &mut *self.state;

        match annotation {
            Annotation::Api(version) => state.version = version,
            Annotation::Info(info) => {
                state.info.title = info.title;
                state.info.version = info.version;
                state.info.description = non_empty(&info.description);
            }
            Annotation::Contact(contact) => {
                state.info.contact = Some(Contact {
                    name: non_empty(&contact.name),
                    email: non_empty(&contact.email),
                    url: non_empty(&contact.url),
                });
            }
            Annotation::License(license) => {
                state.info.license = Some(License {
                    name: license.name,
                    url: non_empty(&license.url),
                });
            }
            Annotation::TermsOfService(url) => state.info.terms_of_service = Some(url),
            Annotation::Server(server) => state.servers.push(Server {
                url: server.url,
                description: non_empty(&server.description),
            }),
            Annotation::Tag(tag) => state.tags.push(Tag {
                name: tag.name,
                description: non_empty(&tag.description),
            }),
            Annotation::ExternalDocs(docs) => {
                state.external_docs = Some(ExternalDocs {
                    url: docs.url,
                    description: non_empty(&docs.description),
                });
            }
            Annotation::Link(link) => state.links.push(LinkRecord {
                label: link.label,
                url: link.url,
            }),
            Annotation::Security(security) => {
                let name = security.name.clone();
                debug!("Declaring security scheme {} ({})", name, security.kind);
                state
                    .security_schemes
                    .insert(name, build_security_scheme(security));
            }
            Annotation::Scope(scope) => Self::add_scope(state, scope),
            Annotation::Schema(schema) => {
                let record = build_explicit_schema(schema);
                debug!("Declaring schema {}", record.name);
                state.add_schema(record);
            }
            Annotation::Route(_)
            | Annotation::Param(_)
            | Annotation::Body(_)
            | Annotation::Response(_)
            | Annotation::Secure(_)
            | Annotation::Model(_)
            | Annotation::Field(_) => {}
        }
    }

    /// Adds a scope to every flow of an already declared OAuth2 scheme.
    fn add_scope(state: &mut SpecState, scope: ScopeAnnotation) {
        let flows = state
            .security_schemes
            .get_mut(&scope.scheme)
            .and_then(|scheme| scheme.flows.as_mut());

        let Some(flows) = flows else {
            debug!(
                "Dropping scope {}: no OAuth2 scheme named {}",
                scope.name, scope.scheme
            );
            return;
        };

        for flow in flows.flows_mut() {
            flow.scopes
                .insert(scope.name.clone(), scope.description.clone());
        }
    }

    /// Fold the annotations of one routine into an operation.
    ///
    /// Returns `None` when the doc comment has no annotations at all. Operations without a
    /// route are returned and later rejected by [`SpecState::add_operation`].
    fn build_operation(routine: &RoutineDecl) -> Option<OperationRecord> {
        if !routine.doc.contains(MARKER) {
            return None;
        }

        let annotations = AnnotationParser::parse(&routine.doc);
        if annotations.is_empty() {
            return None;
        }

        debug!("Building operation for routine: {}", routine.name);

        let mut operation = OperationRecord {
            description: strip_annotations(&routine.doc),
            deprecated: routine.deprecated,
            ..OperationRecord::default()
        };

        for annotation in annotations {
            match annotation {
                Annotation::Route(route) => {
                    operation.method = Some(route.method);
                    operation.path = route.path;
                    operation.operation_id = route.operation_id;
                    operation.summary = route.summary;
                    operation.tags = route.tags;
                    operation.deprecated |= route.deprecated;
                }
                Annotation::Param(param) => operation.parameters.push(build_parameter(param)),
                Annotation::Body(body) => {
                    operation.request_body = Some(RequestBody {
                        description: non_empty(&body.description),
                        required: body.required,
                        content: json_content(TypeResolver::resolve_schema_token(&body.schema)),
                    });
                }
                Annotation::Response(response) => {
                    let status = response.status.clone();
                    operation
                        .responses
                        .insert(status, build_response(&response));
                }
                Annotation::Secure(secure) => {
                    for scheme in secure.schemes {
                        let mut requirement = SecurityRequirement::new();
                        requirement.insert(scheme, Vec::new());
                        operation.security.push(requirement);
                    }
                }
                _ => {}
            }
        }

        Some(operation)
    }

    fn visit_record(&mut self, record: &RecordDecl) {
        let annotations = AnnotationParser::parse(&record.doc);
        if !annotations
            .iter()
            .any(|a| matches!(a, Annotation::Model(_)))
        {
            return;
        }

        if let Some(schema) = SchemaGenerator::generate(record, &annotations) {
            self.state.add_global_schema(schema);
        }
    }
}

fn build_parameter(param: ParamAnnotation) -> Parameter {
    let mut schema = TypeResolver::resolve_word(&param.type_name);
    if !schema.is_reference() {
        schema.enum_values = param.enum_values;
    }

    Parameter {
        required: param.required || param.location == ParameterLocation::Path,
        description: non_empty(&param.description),
        example: param.example.or(param.default),
        name: param.name,
        location: param.location,
        schema,
    }
}

fn build_response(response: &ResponseAnnotation) -> Response {
    let content = if response.has_body() {
        Some(json_content(TypeResolver::resolve_schema_token(
            &response.schema,
        )))
    } else {
        None
    };

    Response {
        description: response.description.clone(),
        content,
    }
}

/// Build a scheme from `!security <name> <kind> [args...]`.
///
/// Unknown kinds keep only the description.
fn build_security_scheme(security: SecurityAnnotation) -> SecurityScheme {
    let mut scheme = SecurityScheme {
        description: non_empty(&security.description),
        ..SecurityScheme::default()
    };
    let mut args = security.args.into_iter();

    match security.kind.to_ascii_lowercase().as_str() {
        "apikey" => {
            scheme.scheme_type = Some("apiKey".to_string());
            scheme.location = args.next();
            scheme.name = Some(args.next().unwrap_or(security.name));
        }
        "http" => {
            scheme.scheme_type = Some("http".to_string());
            scheme.scheme = args.next();
            scheme.bearer_format = security.bearer_format;
        }
        "oauth2" => {
            scheme.scheme_type = Some("oauth2".to_string());
            let flow = args.next().unwrap_or_default();
            scheme.flows = build_oauth_flows(&flow, args.next(), args.next());
        }
        "openidconnect" => {
            scheme.scheme_type = Some("openIdConnect".to_string());
            scheme.open_id_connect_url = args.next();
        }
        other => debug!("Unknown security scheme kind {:?}", other),
    }

    scheme
}

fn build_oauth_flows(flow: &str, url: Option<String>, token_url: Option<String>) -> Option<OAuthFlows> {
    let mut flows = OAuthFlows::default();

    match flow.to_ascii_lowercase().as_str() {
        "implicit" => {
            flows.implicit = Some(OAuthFlow {
                authorization_url: url,
                ..OAuthFlow::default()
            });
        }
        "password" => {
            flows.password = Some(OAuthFlow {
                token_url: url,
                ..OAuthFlow::default()
            });
        }
        "clientcredentials" | "application" => {
            flows.client_credentials = Some(OAuthFlow {
                token_url: url,
                ..OAuthFlow::default()
            });
        }
        "authorizationcode" | "accesscode" => {
            flows.authorization_code = Some(OAuthFlow {
                token_url: token_url.or_else(|| url.clone()),
                authorization_url: url,
                ..OAuthFlow::default()
            });
        }
        _ => {
            // `oauth2 <url>` or an unrecognised flow word followed by a URL
            let url = url.or_else(|| {
                (flow.starts_with("http://") || flow.starts_with("https://"))
                    .then(|| flow.to_string())
            });
            if url.is_some() {
                flows.implicit = Some(OAuthFlow {
                    authorization_url: url,
                    ..OAuthFlow::default()
                });
            }
        }
    }

    if flows == OAuthFlows::default() {
        debug!("OAuth2 scheme without a usable flow ({:?})", flow);
        None
    } else {
        Some(flows)
    }
}

fn build_explicit_schema(annotation: SchemaAnnotation) -> SchemaRecord {
    let mut schema = TypeResolver::resolve_word(&annotation.type_name);

    if !schema.is_reference() {
        if annotation.format.is_some() {
            schema.format = annotation.format;
        }
        schema.example = annotation.example;
        schema.enum_values = annotation.enum_values;
    }
    schema.description = non_empty(&annotation.description);

    SchemaRecord {
        name: annotation.name,
        description: annotation.description,
        schema,
        examples: IndexMap::new(),
    }
}
