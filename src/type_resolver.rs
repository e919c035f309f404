use crate::schema::Schema;
use log::debug;

/// Declared type expression of a field or parameter.
///
/// Built either from a `syn::Type` (struct fields) or from an annotation type word
/// (`!query limit:integer`, `!field tags:[]string`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A plain name: a primitive or a model declared somewhere in the tree
    Named(String),
    /// `Option<T>`, `?T` or `T?`
    Optional(Box<TypeExpr>),
    /// `Vec<T>`, `[T]`, `[T; N]`, sets, `[]T` or `T[]`
    Sequence(Box<TypeExpr>),
    /// String keyed map; only the value type is kept
    Map(Box<TypeExpr>),
    /// A path into another crate, e.g. `chrono::DateTime`
    External(String),
    /// Anything the resolver has no rule for (tuples, trait objects, fn pointers, ...)
    Unsupported,
}

/// Wrappers that serialize exactly like their single type argument.
const TRANSPARENT_WRAPPERS: &[&str] = &["Box", "Rc", "Arc", "Cow", "RefCell", "Cell"];

const SEQUENCE_TYPES: &[&str] = &["Vec", "VecDeque", "HashSet", "BTreeSet", "IndexSet", "LinkedList"];

const MAP_TYPES: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];

impl TypeExpr {
    /// Convert a Rust type into a type expression.
    pub fn from_syn(ty: &syn::Type) -> Self {
        match ty {
            syn::Type::Path(type_path) if type_path.qself.is_none() => {
                Self::from_path(&type_path.path)
            }
            syn::Type::Reference(reference) => Self::from_syn(&reference.elem),
            syn::Type::Paren(paren) => Self::from_syn(&paren.elem),
            syn::Type::Group(group) => Self::from_syn(&group.elem),
            syn::Type::Array(array) => TypeExpr::Sequence(Box::new(Self::from_syn(&array.elem))),
            syn::Type::Slice(slice) => TypeExpr::Sequence(Box::new(Self::from_syn(&slice.elem))),
            _ => TypeExpr::Unsupported,
        }
    }

    fn from_path(path: &syn::Path) -> Self {
        let Some(segment) = path.segments.last() else {
            return TypeExpr::Unsupported;
        };
        let ident = segment.ident.to_string();
        let type_args = Self::type_arguments(&segment.arguments);

        if ident == "Option" {
            return match type_args.first() {
                Some(inner) => TypeExpr::Optional(Box::new(Self::from_syn(inner))),
                None => TypeExpr::Unsupported,
            };
        }

        if TRANSPARENT_WRAPPERS.contains(&ident.as_str()) {
            return match type_args.first() {
                Some(inner) => Self::from_syn(inner),
                None => TypeExpr::Unsupported,
            };
        }

        if SEQUENCE_TYPES.contains(&ident.as_str()) {
            return match type_args.first() {
                Some(inner) => TypeExpr::Sequence(Box::new(Self::from_syn(inner))),
                None => TypeExpr::Sequence(Box::new(TypeExpr::Unsupported)),
            };
        }

        if MAP_TYPES.contains(&ident.as_str()) {
            return match type_args.get(1) {
                Some(value) => TypeExpr::Map(Box::new(Self::from_syn(value))),
                None => TypeExpr::Map(Box::new(TypeExpr::Unsupported)),
            };
        }

        let rooted_locally = path
            .segments
            .first()
            .map(|first| matches!(first.ident.to_string().as_str(), "crate" | "self" | "super"))
            .unwrap_or(false);

        if path.segments.len() > 1 && !rooted_locally {
            let joined: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
            return TypeExpr::External(joined.join("::"));
        }

        TypeExpr::Named(ident)
    }

    /// Type arguments of a path segment, lifetimes and const arguments skipped.
    fn type_arguments(arguments: &syn::PathArguments) -> Vec<&syn::Type> {
        match arguments {
            syn::PathArguments::AngleBracketed(args) => args
                .args
                .iter()
                .filter_map(|arg| match arg {
                    syn::GenericArgument::Type(ty) => Some(ty),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Parse an annotation type word.
    ///
    /// Accepts `[]T` and `T[]` for sequences, `?T` and `T?` for optionals, and falls back to
    /// Rust type syntax (`Vec<User>`, `chrono::DateTime<Utc>`) through `syn`.
    pub fn parse(word: &str) -> Self {
        let word = word.trim();
        if word.is_empty() {
            return TypeExpr::Unsupported;
        }

        if let Some(inner) = word.strip_prefix("[]") {
            return TypeExpr::Sequence(Box::new(Self::parse(inner)));
        }
        if let Some(inner) = word.strip_suffix("[]") {
            return TypeExpr::Sequence(Box::new(Self::parse(inner)));
        }
        if let Some(inner) = word.strip_prefix('?').or_else(|| word.strip_suffix('?')) {
            return TypeExpr::Optional(Box::new(Self::parse(inner)));
        }

        if word.contains(&['<', ':', '[', '&'][..]) {
            return match syn::parse_str::<syn::Type>(word) {
                Ok(ty) => Self::from_syn(&ty),
                Err(e) => {
                    debug!("Unparsable type word {:?}: {}", word, e);
                    TypeExpr::Unsupported
                }
            };
        }

        TypeExpr::Named(word.to_string())
    }
}

/// Primitive table: name to OpenAPI base type and format.
///
/// Covers Rust primitives as well as the vocabulary used in annotation type words.
pub fn primitive(name: &str) -> Option<(&'static str, Option<&'static str>)> {
    let mapped = match name {
        "String" | "str" | "char" | "string" => ("string", None),
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" | "int" | "int8" | "int16" | "int32"
        | "integer" | "uint" | "uint8" | "uint16" | "uint32" => ("integer", Some("int32")),
        "i64" | "i128" | "isize" | "u64" | "u128" | "usize" | "int64" | "uint64" => {
            ("integer", Some("int64"))
        }
        "f32" | "float" | "float32" => ("number", Some("float")),
        "f64" | "float64" | "double" | "number" => ("number", Some("double")),
        "bool" | "boolean" => ("boolean", None),
        "byte" => ("string", Some("byte")),
        "any" | "object" => ("object", None),
        "array" => ("array", None),
        _ => return None,
    };
    Some(mapped)
}

/// Well-known foreign types that serialize as formatted strings.
fn well_known(name: &str) -> Option<Schema> {
    match name {
        "DateTime" | "NaiveDateTime" | "OffsetDateTime" => {
            Some(Schema::typed("string", Some("date-time")))
        }
        "NaiveDate" => Some(Schema::typed("string", Some("date"))),
        "Uuid" => Some(Schema::typed("string", Some("uuid"))),
        _ => None,
    }
}

/// Type resolver - maps declared type expressions to schema nodes.
///
/// Resolution never fails: unknown shapes degrade to an empty schema.
pub struct TypeResolver;

impl TypeResolver {
    /// Resolve a type expression into a schema node.
    pub fn resolve(expr: &TypeExpr) -> Schema {
        match expr {
            TypeExpr::Named(name) => Self::resolve_name(name),
            TypeExpr::Optional(inner) => {
                let mut schema = Self::resolve(inner);
                // Nullable only sticks to inline nodes; a `$ref` may carry nothing else.
                if !schema.is_reference() && !schema.is_empty() {
                    schema.nullable = true;
                }
                schema
            }
            TypeExpr::Sequence(inner) => Schema::array(Self::non_empty(Self::resolve(inner))),
            TypeExpr::Map(value) => Schema::map(Self::non_empty(Self::resolve(value))),
            TypeExpr::External(path) => {
                let last = path.rsplit("::").next().unwrap_or(path);
                well_known(last).unwrap_or_else(|| {
                    debug!("No schema rule for external type {}", path);
                    Schema::default()
                })
            }
            TypeExpr::Unsupported => Schema::default(),
        }
    }

    /// Resolve a bare name: primitive, well-known foreign type, or a model reference.
    pub fn resolve_name(name: &str) -> Schema {
        if let Some((schema_type, format)) = primitive(name) {
            return Schema::typed(schema_type, format);
        }
        if let Some(schema) = well_known(name) {
            return schema;
        }
        Schema::reference(name)
    }

    /// Resolve an annotation type word (parameters, `!field` and `!schema` types).
    pub fn resolve_word(word: &str) -> Schema {
        Self::resolve(&TypeExpr::parse(word))
    }

    /// Resolve the schema token of a `!body`, `!ok` or `!error` line.
    ///
    /// `[]Name` and `Name[]` are arrays of references to `Name`, even when `Name` spells a
    /// primitive. Other tokens resolve like type words.
    pub fn resolve_schema_token(token: &str) -> Schema {
        let token = token.trim();
        let element = token
            .strip_prefix("[]")
            .or_else(|| token.strip_suffix("[]"))
            .map(str::trim);

        match element {
            Some(name) if !name.is_empty() => Schema::array(Some(Schema::reference(name))),
            Some(_) => Schema::array(None),
            None => Self::resolve_word(token),
        }
    }

    fn non_empty(schema: Schema) -> Option<Schema> {
        if schema.is_empty() {
            None
        } else {
            Some(schema)
        }
    }
}
