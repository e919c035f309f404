//! openapi-from-annotations - OpenAPI documents from annotated doc comments.
//!
//! Handlers, models and the API itself are described with doc comment lines that start with
//! `!`. The crate collects those lines from a source tree and assembles an OpenAPI 3.0
//! document from them.
//!
//! ```ignore
//! //! !api 3.0.3
//! //! !info "Pet Store" v1.0.0
//!
//! /// !GET /pets -> listPets #pets
//! /// !ok []Pet "All pets"
//! pub async fn list_pets() {}
//!
//! /// !model "A pet"
//! pub struct Pet {
//!     pub id: i64,
//! }
//! ```
//!
//! # Architecture
//!
//! 1. [`scanner`] - Finds the `.rs` files below a directory
//! 2. [`parser`] - Parses each file with `syn`
//! 3. [`declarations`] - Flattens a syntax tree into doc blocks, routines and records
//! 4. [`annotation`] - Lexes and parses annotation lines into typed records
//! 5. [`walker`] - Folds the annotations of every file into a [`spec_state::SpecState`]
//! 6. [`type_resolver`] and [`schema_generator`] - Turn Rust and annotation types into schemas
//! 7. [`openapi_builder`] - Assembles the final document
//! 8. [`serializer`] - Writes it as YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_annotations::{
//!     declarations::SourceFile,
//!     openapi_builder::OpenApiBuilder,
//!     parser::AstParser,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//!     spec_state::SpecState,
//!     walker::DeclarationWalker,
//! };
//! use std::path::PathBuf;
//!
//! let scan_result = FileScanner::new(PathBuf::from("./my-api")).scan().unwrap();
//!
//! let mut state = SpecState::new();
//! let mut walker = DeclarationWalker::new(&mut state);
//! for parsed in AstParser::parse_files(&scan_result.rust_files).into_iter().flatten() {
//!     walker.walk_file(&SourceFile::from_parsed(&parsed));
//! }
//!
//! let document = OpenApiBuilder::build(&state);
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotation;
pub mod cli;
pub mod declarations;
pub mod error;
pub mod openapi_builder;
pub mod parser;
pub mod scanner;
pub mod schema;
pub mod schema_generator;
pub mod serializer;
pub mod spec_state;
pub mod type_resolver;
pub mod walker;
