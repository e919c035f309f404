//! Annotation mini-language.
//!
//! Annotations are doc comment lines that start with the `!` marker followed by a verb:
//!
//! ```text
//! !GET /users/{id} -> getUser "Fetch one user" #users
//! !path id:integer "User identifier"
//! !ok User "The user"
//! !error 404 - "No such user"
//! ```
//!
//! The [`lexer`] splits the text after the verb into [`lexer::Token`]s and the
//! [`parser`] turns each recognised line into one typed [`Annotation`]. Lines that are not
//! annotations, use an unknown verb or are malformed produce nothing.

pub mod lexer;
pub mod parser;

pub use parser::AnnotationParser;

use crate::openapi_builder::{HttpMethod, ParameterLocation};
use std::fmt;

/// The marker that starts an annotation line.
pub const MARKER: char = '!';

/// One parsed annotation line.
///
/// All kinds are known up front, so handlers dispatch with a single `match`.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// `!api 3.0.3`
    Api(String),
    Info(InfoAnnotation),
    Contact(ContactAnnotation),
    License(LicenseAnnotation),
    /// `!tos https://example.com/terms`
    TermsOfService(String),
    Server(ServerAnnotation),
    Tag(TagAnnotation),
    ExternalDocs(ExternalDocsAnnotation),
    Link(LinkAnnotation),
    Security(SecurityAnnotation),
    Scope(ScopeAnnotation),
    Route(RouteAnnotation),
    /// `!query`, `!path` and `!header`
    Param(ParamAnnotation),
    Body(BodyAnnotation),
    /// `!ok` and `!error`
    Response(ResponseAnnotation),
    Secure(SecureAnnotation),
    Model(ModelAnnotation),
    Field(FieldAnnotation),
    /// `!schema`, an explicitly declared component schema
    Schema(SchemaAnnotation),
}

impl Annotation {
    /// True for kinds that describe the API as a whole rather than one operation or model.
    pub fn is_api_level(&self) -> bool {
        matches!(
            self,
            Annotation::Api(_)
                | Annotation::Info(_)
                | Annotation::Contact(_)
                | Annotation::License(_)
                | Annotation::TermsOfService(_)
                | Annotation::Server(_)
                | Annotation::Tag(_)
                | Annotation::ExternalDocs(_)
                | Annotation::Link(_)
                | Annotation::Security(_)
                | Annotation::Scope(_)
                | Annotation::Schema(_)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoAnnotation {
    pub title: String,
    pub version: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactAnnotation {
    pub name: String,
    pub email: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseAnnotation {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerAnnotation {
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagAnnotation {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalDocsAnnotation {
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkAnnotation {
    pub label: String,
    pub url: String,
}

/// `!security <name> <kind> [args...] ["description"]`
///
/// `args` keeps the bare words after the kind; their meaning depends on the kind
/// (`apiKey header X-API-Key`, `http bearer`, `oauth2 implicit <url>`, `openIdConnect <url>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityAnnotation {
    pub name: String,
    pub kind: String,
    pub args: Vec<String>,
    pub description: String,
    pub bearer_format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeAnnotation {
    pub scheme: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAnnotation {
    pub method: HttpMethod,
    pub path: String,
    pub operation_id: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamAnnotation {
    pub name: String,
    pub location: ParameterLocation,
    /// Declared type word, `string` when omitted
    pub type_name: String,
    pub description: String,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub example: Option<serde_json::Value>,
    pub enum_values: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyAnnotation {
    pub schema: String,
    pub description: String,
    pub required: bool,
}

/// Whether a response line came from `!ok` or `!error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAnnotation {
    pub kind: ResponseKind,
    pub status: String,
    /// Schema token; empty when the line declares none
    pub schema: String,
    pub description: String,
}

impl ResponseAnnotation {
    /// Schema tokens that mean "this response has no body".
    pub const NO_BODY: [&'static str; 4] = ["-", "nil", "none", "()"];

    pub fn has_body(&self) -> bool {
        !self.schema.is_empty() && !Self::NO_BODY.contains(&self.schema.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecureAnnotation {
    pub schemes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelAnnotation {
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAnnotation {
    pub name: String,
    pub type_name: Option<String>,
    pub description: String,
    pub required: bool,
    pub example: Option<serde_json::Value>,
    pub enum_values: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaAnnotation {
    pub name: String,
    pub type_name: String,
    pub description: String,
    pub format: Option<String>,
    pub example: Option<serde_json::Value>,
    pub enum_values: Option<Vec<serde_json::Value>>,
}

/// Reason an annotation line was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// A `"` without its closing quote
    UnterminatedQuote,
    /// A `<` or `(` without its closing delimiter
    UnterminatedDelimiter(char),
    /// The verb needs a token the line does not have
    MissingToken { verb: String, token: &'static str },
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnnotationError::UnterminatedQuote => write!(f, "unterminated quoted string"),
            AnnotationError::UnterminatedDelimiter(open) => {
                write!(f, "unterminated '{}' value", open)
            }
            AnnotationError::MissingToken { verb, token } => {
                write!(f, "!{} is missing its {}", verb, token)
            }
        }
    }
}

impl std::error::Error for AnnotationError {}

/// Removes annotation lines from a doc comment and returns the remaining prose, trimmed.
pub fn strip_annotations(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim_start().starts_with(MARKER))
        .collect();
    lines.join("\n").trim().to_string()
}
