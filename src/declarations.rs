//! Per-file declaration model.
//!
//! A [`SourceFile`] is the flattened view of one parsed Rust file that the walker works on:
//! every doc comment block, every function with its doc comment, and every type declaration
//! with its fields and serde attributes.

use crate::parser::ParsedFile;
use crate::type_resolver::TypeExpr;
use log::debug;
use std::path::PathBuf;
use syn::ext::IdentExt;
use syn::visit::Visit;

/// Declarations collected from one source file, each list in source order.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Text of every doc comment block: the file's `//!` docs, inline module docs, and the
    /// outer docs of items, fields, enum variants and trait methods
    pub doc_blocks: Vec<String>,
    /// Free functions, `impl` methods, trait methods with a default body and functions in
    /// inline modules
    pub routines: Vec<RoutineDecl>,
    /// Structs, enums, unions and type aliases
    pub records: Vec<RecordDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutineDecl {
    pub name: String,
    pub doc: String,
    /// Carries `#[deprecated]`
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub name: String,
    pub doc: String,
    pub kind: RecordKind,
    /// Container level serde attributes (`rename_all`)
    pub serde: SerdeAttributes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordKind {
    /// A struct; tuple and unit structs have no fields here
    Struct(Vec<FieldDecl>),
    /// Enums, unions and type aliases
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub ident: String,
    pub ty: TypeExpr,
    pub doc: String,
    pub serde: SerdeAttributes,
}

/// Serde attributes that decide how a field or container serializes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerdeAttributes {
    /// `rename = ".."` or `rename(serialize = "..")`
    pub rename: Option<String>,
    /// `rename_all = ".."` or `rename_all(serialize = "..")`
    pub rename_all: Option<String>,
    /// `skip` or `skip_serializing`
    pub skip: bool,
    /// `skip_serializing_if = ".."`
    pub omit_empty: bool,
}

impl SourceFile {
    /// Collect the declarations of a parsed file.
    pub fn from_parsed(parsed: &ParsedFile) -> Self {
        let mut collector = DeclarationCollector::default();
        collector.visit_file(&parsed.syntax_tree);

        debug!(
            "Collected {} doc blocks, {} routines and {} records from {}",
            collector.doc_blocks.len(),
            collector.routines.len(),
            collector.records.len(),
            parsed.path.display()
        );

        Self {
            path: parsed.path.clone(),
            doc_blocks: collector.doc_blocks,
            routines: collector.routines,
            records: collector.records,
        }
    }
}

impl FieldDecl {
    /// The property name this field serializes under, or `None` when it is skipped.
    pub fn serialized_name(&self, container: &SerdeAttributes) -> Option<String> {
        if self.serde.skip {
            return None;
        }
        if let Some(rename) = &self.serde.rename {
            return Some(rename.clone());
        }
        Some(match &container.rename_all {
            Some(rule) => apply_rename_rule(rule, &self.ident),
            None => self.ident.clone(),
        })
    }
}

/// Visitor for collecting doc comments and declarations
#[derive(Default)]
struct DeclarationCollector {
    doc_blocks: Vec<String>,
    routines: Vec<RoutineDecl>,
    records: Vec<RecordDecl>,
}

impl DeclarationCollector {
    fn push_block(&mut self, text: String) {
        if !text.trim().is_empty() {
            self.doc_blocks.push(text);
        }
    }

    fn push_routine(&mut self, ident: &syn::Ident, attrs: &[syn::Attribute]) {
        self.routines.push(RoutineDecl {
            name: ident.unraw().to_string(),
            doc: doc_text(attrs, DocStyle::Outer),
            deprecated: attrs.iter().any(|a| a.path().is_ident("deprecated")),
        });
    }

    fn push_record(&mut self, ident: &syn::Ident, attrs: &[syn::Attribute], kind: RecordKind) {
        self.records.push(RecordDecl {
            name: ident.unraw().to_string(),
            doc: doc_text(attrs, DocStyle::Outer),
            kind,
            serde: parse_serde_attributes(attrs),
        });
    }
}

impl<'ast> Visit<'ast> for DeclarationCollector {
    fn visit_file(&mut self, node: &'ast syn::File) {
        self.push_block(doc_text(&node.attrs, DocStyle::Inner));
        syn::visit::visit_file(self, node);
    }

    fn visit_item(&mut self, node: &'ast syn::Item) {
        if let Some(attrs) = item_attrs(node) {
            self.push_block(doc_text(attrs, DocStyle::Outer));
        }
        syn::visit::visit_item(self, node);
    }

    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        self.push_block(doc_text(&node.attrs, DocStyle::Inner));
        syn::visit::visit_item_mod(self, node);
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        // Function bodies are not descended into.
        self.push_routine(&node.sig.ident, &node.attrs);
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.push_block(doc_text(&node.attrs, DocStyle::Outer));
        self.push_routine(&node.sig.ident, &node.attrs);
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        self.push_block(doc_text(&node.attrs, DocStyle::Outer));
        // Only methods with a default body are routines.
        if node.default.is_some() {
            self.push_routine(&node.sig.ident, &node.attrs);
        }
    }

    fn visit_field(&mut self, node: &'ast syn::Field) {
        self.push_block(doc_text(&node.attrs, DocStyle::Outer));
    }

    fn visit_variant(&mut self, node: &'ast syn::Variant) {
        self.push_block(doc_text(&node.attrs, DocStyle::Outer));
        syn::visit::visit_fields(self, &node.fields);
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        let fields = match &node.fields {
            syn::Fields::Named(named) => named.named.iter().filter_map(field_decl).collect(),
            _ => Vec::new(),
        };
        self.push_record(&node.ident, &node.attrs, RecordKind::Struct(fields));
        syn::visit::visit_fields(self, &node.fields);
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        self.push_record(&node.ident, &node.attrs, RecordKind::Other);
        for variant in &node.variants {
            self.visit_variant(variant);
        }
    }

    fn visit_item_union(&mut self, node: &'ast syn::ItemUnion) {
        self.push_record(&node.ident, &node.attrs, RecordKind::Other);
        self.visit_fields_named(&node.fields);
    }

    fn visit_item_type(&mut self, node: &'ast syn::ItemType) {
        self.push_record(&node.ident, &node.attrs, RecordKind::Other);
    }
}

fn item_attrs(item: &syn::Item) -> Option<&[syn::Attribute]> {
    let attrs = match item {
        syn::Item::Const(i) => &i.attrs,
        syn::Item::Enum(i) => &i.attrs,
        syn::Item::Fn(i) => &i.attrs,
        syn::Item::Impl(i) => &i.attrs,
        syn::Item::Mod(i) => &i.attrs,
        syn::Item::Static(i) => &i.attrs,
        syn::Item::Struct(i) => &i.attrs,
        syn::Item::Trait(i) => &i.attrs,
        syn::Item::Type(i) => &i.attrs,
        syn::Item::Union(i) => &i.attrs,
        syn::Item::Use(i) => &i.attrs,
        _ => return None,
    };
    Some(attrs)
}

fn field_decl(field: &syn::Field) -> Option<FieldDecl> {
    let ident = field.ident.as_ref()?.unraw().to_string();
    Some(FieldDecl {
        ty: TypeExpr::from_syn(&field.ty),
        doc: doc_text(&field.attrs, DocStyle::Outer),
        serde: parse_serde_attributes(&field.attrs),
        ident,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DocStyle {
    Inner,
    Outer,
}

/// Join the `#[doc = ".."]` attributes of one style into a text block.
///
/// `///` and `//!` comments keep the space after the slashes; one leading space is removed
/// from every line. Multi-line `/** */` and `/*! */` blocks lose their indentation and the
/// `*` gutter instead.
fn doc_text(attrs: &[syn::Attribute], style: DocStyle) -> String {
    let mut lines = Vec::new();

    for attr in attrs {
        let attr_style = match attr.style {
            syn::AttrStyle::Outer => DocStyle::Outer,
            syn::AttrStyle::Inner(_) => DocStyle::Inner,
        };
        if attr_style != style || !attr.path().is_ident("doc") {
            continue;
        }

        if let syn::Meta::NameValue(name_value) = &attr.meta {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(text),
                ..
            }) = &name_value.value
            {
                let value = text.value();
                let block = value.contains('\n');
                for line in value.lines() {
                    let line = if block {
                        strip_gutter(line)
                    } else {
                        line.strip_prefix(' ').unwrap_or(line)
                    };
                    lines.push(line.to_string());
                }
            }
        }
    }

    lines.join("\n")
}

fn strip_gutter(line: &str) -> &str {
    let line = line.trim();
    match line.strip_prefix('*') {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    }
}

/// Parse `#[serde(..)]` attributes.
///
/// Unknown keys are consumed and ignored; an attribute that does not parse leaves whatever
/// was read before the error.
pub fn parse_serde_attributes(attrs: &[syn::Attribute]) -> SerdeAttributes {
    let mut serde = SerdeAttributes::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                serde.rename = serialize_name(&meta)?.or(serde.rename.take());
            } else if meta.path.is_ident("rename_all") {
                serde.rename_all = serialize_name(&meta)?.or(serde.rename_all.take());
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde.skip = true;
            } else if meta.path.is_ident("skip_serializing_if") {
                let _: syn::LitStr = meta.value()?.parse()?;
                serde.omit_empty = true;
            } else {
                skip_meta(&meta)?;
            }
            Ok(())
        });

        if let Err(e) = result {
            debug!("Ignoring unreadable serde attribute: {}", e);
        }
    }

    serde
}

/// Reads `key = "x"` or `key(serialize = "x", deserialize = "y")`, keeping the serialize name.
fn serialize_name(meta: &syn::meta::ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        let value: syn::LitStr = meta.value()?.parse()?;
        return Ok(Some(value.value()));
    }

    let mut name = None;
    meta.parse_nested_meta(|inner| {
        let value: syn::LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("serialize") {
            name = Some(value.value());
        }
        Ok(())
    })?;
    Ok(name)
}

fn skip_meta(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }
    Ok(())
}

/// Apply a serde `rename_all` rule to a snake_case field name.
pub fn apply_rename_rule(rule: &str, field: &str) -> String {
    let words: Vec<&str> = field.split('_').filter(|w| !w.is_empty()).collect();

    let capitalize = |word: &str| {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        }
    };

    match rule {
        "lowercase" => field.to_lowercase(),
        "UPPERCASE" => field.to_uppercase(),
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        "camelCase" => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.to_string() } else { capitalize(w) })
            .collect(),
        "snake_case" => field.to_string(),
        "SCREAMING_SNAKE_CASE" => field.to_uppercase(),
        "kebab-case" => words.join("-"),
        "SCREAMING-KEBAB-CASE" => words.join("-").to_uppercase(),
        other => {
            debug!("Unknown rename_all rule {:?}, keeping {}", other, field);
            field.to_string()
        }
    }
}
