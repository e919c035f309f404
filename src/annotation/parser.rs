use super::lexer::{split_verb, tokenize, Token};
use super::*;
use log::debug;
use std::collections::VecDeque;

/// Parser turning doc comment text into [`Annotation`] records.
///
/// Parsing is line oriented and never fails: prose lines, unknown verbs and malformed lines
/// are skipped, the last of these with a debug log entry.
///
/// # Example
///
/// ```
/// use openapi_from_annotations::annotation::{Annotation, AnnotationParser};
///
/// let annotations = AnnotationParser::parse("Some prose\n!api 3.0.3\n!unknown thing");
/// assert_eq!(annotations, vec![Annotation::Api("3.0.3".to_string())]);
/// ```
pub struct AnnotationParser;

impl AnnotationParser {
    /// Parses every annotation line in `text`, in order.
    pub fn parse(text: &str) -> Vec<Annotation> {
        text.lines()
            .filter_map(|line| match Self::parse_line(line) {
                Ok(annotation) => annotation,
                Err(e) => {
                    debug!("Dropping annotation line {:?}: {}", line.trim(), e);
                    None
                }
            })
            .collect()
    }

    /// Parses one line.
    ///
    /// Returns `Ok(None)` for lines that are not annotations or use an unknown verb, and an
    /// error for annotation lines that cannot be built.
    pub fn parse_line(line: &str) -> Result<Option<Annotation>, AnnotationError> {
        let Some((verb, rest)) = split_verb(line) else {
            return Ok(None);
        };
        let verb = verb.to_ascii_lowercase();

        if !Self::is_known_verb(&verb) {
            debug!("Ignoring unknown annotation verb: {}", verb);
            return Ok(None);
        }

        let mut line = Line::new(&verb, tokenize(rest)?);

        let annotation = match verb.as_str() {
            "api" => Annotation::Api(line.require_text("version")?),
            "info" => Annotation::Info(line.info()?),
            "contact" => Annotation::Contact(line.contact()?),
            "license" => Annotation::License(LicenseAnnotation {
                name: line.require_text("license name")?,
                url: line.next_text().unwrap_or_default(),
            }),
            "tos" => Annotation::TermsOfService(line.require_text("terms of service URL")?),
            "server" => Annotation::Server(ServerAnnotation {
                url: line.require_text("server URL")?,
                description: line.rest_text(),
            }),
            "tag" => Annotation::Tag(TagAnnotation {
                name: line.require_text("tag name")?,
                description: line.rest_text(),
            }),
            "externaldocs" | "docs" => Annotation::ExternalDocs(ExternalDocsAnnotation {
                url: line.require_text("documentation URL")?,
                description: line.rest_text(),
            }),
            "link" => Annotation::Link(LinkAnnotation {
                label: line.require_text("link label")?,
                url: line.require_text("link URL")?,
            }),
            "security" => Annotation::Security(line.security()?),
            "scope" => Annotation::Scope(ScopeAnnotation {
                scheme: line.require_text("security scheme name")?,
                name: line.require_text("scope name")?,
                description: line.rest_text(),
            }),
            "query" => Annotation::Param(line.param(ParameterLocation::Query)?),
            "path" => Annotation::Param(line.param(ParameterLocation::Path)?),
            "header" => Annotation::Param(line.param(ParameterLocation::Header)?),
            "body" => Annotation::Body(line.body()?),
            "ok" => Annotation::Response(line.response(ResponseKind::Success)),
            "error" => Annotation::Response(line.response(ResponseKind::Error)),
            "secure" => Annotation::Secure(line.secure()?),
            "model" => Annotation::Model(ModelAnnotation {
                description: line.rest_text(),
            }),
            "field" => Annotation::Field(line.field()?),
            "schema" => Annotation::Schema(line.schema()?),
            method => match HttpMethod::from_verb(method) {
                Some(method) => Annotation::Route(line.route(method)?),
                None => return Ok(None),
            },
        };

        if !line.positional.is_empty() {
            debug!(
                "Ignoring trailing tokens of !{}: {:?}",
                line.verb,
                line.positional.iter().map(Token::text).collect::<Vec<_>>()
            );
        }

        Ok(Some(annotation))
    }

    fn is_known_verb(verb: &str) -> bool {
        const VERBS: &[&str] = &[
            "api", "info", "contact", "license", "tos", "server", "tag", "externaldocs", "docs",
            "link", "security", "scope", "query", "path", "header", "body", "ok", "error",
            "secure", "model", "field", "schema",
        ];
        VERBS.contains(&verb) || HttpMethod::from_verb(verb).is_some()
    }
}

/// Tokens of one annotation line, split into positional tokens, tags and flags.
struct Line {
    verb: String,
    positional: VecDeque<Token>,
    tags: Vec<String>,
    flags: Vec<(String, String, bool)>,
}

impl Line {
    fn new(verb: &str, tokens: Vec<Token>) -> Self {
        let mut positional = VecDeque::new();
        let mut tags = Vec::new();
        let mut flags = Vec::new();

        for token in tokens {
            match token {
                Token::Tag(tag) => tags.push(tag),
                Token::Flag { key, value, quoted } => flags.push((key, value, quoted)),
                other => positional.push_back(other),
            }
        }

        Self {
            verb: verb.to_string(),
            positional,
            tags,
            flags,
        }
    }

    fn missing(&self, token: &'static str) -> AnnotationError {
        AnnotationError::MissingToken {
            verb: self.verb.clone(),
            token,
        }
    }

    fn next_text(&mut self) -> Option<String> {
        self.positional.pop_front().map(|t| t.text())
    }

    fn require_text(&mut self, token: &'static str) -> Result<String, AnnotationError> {
        self.next_text().ok_or_else(|| self.missing(token))
    }

    /// Removes a bare boolean word such as `required` wherever it appears.
    fn take_switch(&mut self, name: &str) -> bool {
        let position = self.positional.iter().position(|t| match t {
            Token::Word(w) => w.eq_ignore_ascii_case(name),
            _ => false,
        });
        match position {
            Some(idx) => {
                self.positional.remove(idx);
                true
            }
            None => false,
        }
    }

    fn take_first_quoted(&mut self) -> Option<String> {
        let idx = self.positional.iter().position(Token::is_quoted)?;
        self.positional.remove(idx).map(|t| t.text())
    }

    fn take_paren(&mut self) -> Option<String> {
        let idx = self
            .positional
            .iter()
            .position(|t| matches!(t, Token::Paren(_)))?;
        self.positional.remove(idx).map(|t| t.text())
    }

    fn flag(&self, key: &str) -> Option<(&str, bool)> {
        self.flags
            .iter()
            .find(|(k, _, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v, quoted)| (v.as_str(), *quoted))
    }

    fn flag_value(&self, key: &str) -> Option<serde_json::Value> {
        self.flag(key).map(|(v, quoted)| parse_value(v, quoted))
    }

    fn enum_values(&mut self) -> Option<Vec<serde_json::Value>> {
        self.take_paren().map(|raw| parse_enum(&raw))
    }

    /// Joins every remaining positional token.
    fn rest_text(&mut self) -> String {
        let parts: Vec<String> = self.positional.drain(..).map(|t| t.text()).collect();
        parts.join(" ")
    }

    /// The first quoted string, or the remaining bare words joined when nothing is quoted.
    fn description(&mut self) -> String {
        self.take_first_quoted().unwrap_or_else(|| self.rest_text())
    }

    fn info(&mut self) -> Result<InfoAnnotation, AnnotationError> {
        let title = self.require_text("title")?;
        let has_version = matches!(self.positional.front(), Some(t) if t.is_bare());
        let version = if has_version {
            self.next_text().unwrap_or_default()
        } else {
            String::new()
        };
        Ok(InfoAnnotation {
            title,
            version: strip_version_prefix(&version).to_string(),
            description: self.rest_text(),
        })
    }

    fn contact(&mut self) -> Result<ContactAnnotation, AnnotationError> {
        let mut contact = ContactAnnotation::default();
        for token in self.positional.drain(..) {
            match token {
                Token::Angle(email) => contact.email = email,
                Token::Word(w) if is_url(&w) => contact.url = w,
                other if contact.name.is_empty() => contact.name = other.text(),
                _ => {}
            }
        }
        if contact == ContactAnnotation::default() {
            return Err(self.missing("name, email or URL"));
        }
        Ok(contact)
    }

    fn security(&mut self) -> Result<SecurityAnnotation, AnnotationError> {
        let name = self.require_text("scheme name")?;
        let kind = self.require_text("scheme kind")?;
        let description = self.take_first_quoted().unwrap_or_default();
        let bearer_format = self.flag("bearerFormat").map(|(v, _)| v.to_string());
        let args = self.positional.drain(..).map(|t| t.text()).collect();
        Ok(SecurityAnnotation {
            name,
            kind,
            args,
            description,
            bearer_format,
        })
    }

    fn route(&mut self, method: HttpMethod) -> Result<RouteAnnotation, AnnotationError> {
        let deprecated = self.take_switch("deprecated");
        let path = match self.positional.pop_front() {
            Some(t) if t.is_bare() => t.text(),
            _ => return Err(self.missing("path")),
        };

        let mut operation_id = String::new();
        if self.positional.front() == Some(&Token::Arrow) {
            self.positional.pop_front();
            match self.positional.pop_front() {
                Some(t) if t.is_bare() => operation_id = t.text(),
                _ => return Err(self.missing("operation id")),
            }
        }

        Ok(RouteAnnotation {
            method,
            path,
            operation_id,
            summary: self.description(),
            tags: std::mem::take(&mut self.tags),
            deprecated,
        })
    }

    fn param(&mut self, location: ParameterLocation) -> Result<ParamAnnotation, AnnotationError> {
        let required = self.take_switch("required");
        let enum_values = self.enum_values();
        let (name, type_name) = match self.positional.pop_front() {
            Some(Token::Typed { name, ty }) => (name, ty),
            Some(Token::Word(name)) => (name, "string".to_string()),
            _ => return Err(self.missing("parameter name")),
        };
        Ok(ParamAnnotation {
            name,
            location,
            type_name,
            description: self.description(),
            required,
            default: self.flag_value("default"),
            example: self.flag_value("example"),
            enum_values,
        })
    }

    fn body(&mut self) -> Result<BodyAnnotation, AnnotationError> {
        let required = self.take_switch("required");
        let schema = match self.positional.pop_front() {
            Some(t) if !t.is_quoted() => t.text(),
            _ => return Err(self.missing("schema")),
        };
        Ok(BodyAnnotation {
            schema,
            description: self.description(),
            required,
        })
    }

    fn response(&mut self, kind: ResponseKind) -> ResponseAnnotation {
        let has_status = matches!(self.positional.front(), Some(Token::Word(w)) if is_status(w));
        let status = match (has_status, kind) {
            (true, _) => self.next_text().unwrap_or_default(),
            (false, ResponseKind::Success) => "200".to_string(),
            (false, ResponseKind::Error) => "default".to_string(),
        };
        let quoted = self.take_first_quoted();
        let schema = match self.positional.pop_front() {
            Some(Token::Paren(inner)) if inner.is_empty() => "()".to_string(),
            Some(t) => t.text(),
            None => String::new(),
        };
        let description = quoted.unwrap_or_else(|| self.rest_text());
        ResponseAnnotation {
            kind,
            status,
            schema,
            description,
        }
    }

    fn secure(&mut self) -> Result<SecureAnnotation, AnnotationError> {
        let schemes: Vec<String> = self.positional.drain(..).map(|t| t.text()).collect();
        if schemes.is_empty() {
            return Err(self.missing("security scheme name"));
        }
        Ok(SecureAnnotation { schemes })
    }

    fn field(&mut self) -> Result<FieldAnnotation, AnnotationError> {
        let required = self.take_switch("required");
        let enum_values = self.enum_values();
        let (name, type_name) = match self.positional.pop_front() {
            Some(Token::Typed { name, ty }) => (name, Some(ty)),
            Some(Token::Word(name)) => (name, None),
            _ => return Err(self.missing("field name")),
        };
        Ok(FieldAnnotation {
            name,
            type_name,
            description: self.description(),
            required,
            example: self.flag_value("example"),
            enum_values,
        })
    }

    fn schema(&mut self) -> Result<SchemaAnnotation, AnnotationError> {
        let enum_values = self.enum_values();
        let (name, type_name) = match self.positional.pop_front() {
            Some(Token::Typed { name, ty }) => (name, ty),
            Some(Token::Word(name)) => (name, self.require_text("schema type")?),
            _ => return Err(self.missing("schema name")),
        };
        Ok(SchemaAnnotation {
            name,
            type_name,
            description: self.description(),
            format: self.flag("format").map(|(v, _)| v.to_string()),
            example: self.flag_value("example"),
            enum_values,
        })
    }
}

/// `v1.2.0` becomes `1.2.0`; other words are returned unchanged.
fn strip_version_prefix(version: &str) -> &str {
    match version.strip_prefix(&['v', 'V'][..]) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => version,
    }
}

fn is_url(word: &str) -> bool {
    word.starts_with("http://") || word.starts_with("https://")
}

/// `200`, `404`, `2XX` or `default`.
fn is_status(word: &str) -> bool {
    word.eq_ignore_ascii_case("default")
        || (word.len() == 3
            && word.starts_with(|c: char| ('1'..='5').contains(&c))
            && word[1..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.eq_ignore_ascii_case(&'x')))
}

/// Converts a flag or enum value. Quoted values stay strings, bare values are read as JSON
/// when they parse (`12`, `true`, `[1,2]`) and as strings otherwise.
pub fn parse_value(raw: &str, quoted: bool) -> serde_json::Value {
    if quoted {
        return serde_json::Value::String(raw.to_string());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn parse_enum(raw: &str) -> Vec<serde_json::Value> {
    raw.split(&['|', ','][..])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| match v.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            Some(inner) => parse_value(inner, true),
            None => parse_value(v, false),
        })
        .collect()
}
