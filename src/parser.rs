use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// AST (Abstract Syntax Tree) parser for Rust source files.
///
/// The `AstParser` uses the `syn` crate to parse Rust source code into an abstract syntax tree,
/// from which the [`declarations`](crate::declarations) module collects doc comments,
/// routines and records.
///
/// # Example
///
/// ```no_run
/// use openapi_from_annotations::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/main.rs")).unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Parses a single Rust source file into an AST.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the Rust source file to parse
    ///
    /// # Errors
    ///
    /// Returns [`Error::IoError`] if the file cannot be read and [`Error::ParseError`] if it
    /// is not valid Rust. Callers decide whether to skip the file or abort.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)?;
        let syntax_tree = Self::parse_source(path, &content)?;

        debug!("Successfully parsed file: {}", path.display());

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses source text that did not come from disk, e.g. in tests or editors.
    pub fn parse_str(path: &Path, content: &str) -> Result<ParsedFile> {
        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree: Self::parse_source(path, content)?,
        })
    }

    fn parse_source(path: &Path, content: &str) -> Result<syn::File> {
        syn::parse_file(content).map_err(|e| Error::ParseError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parses multiple Rust source files, continuing even if some fail.
    ///
    /// Files that fail to parse are logged as warnings; their errors stay in the returned
    /// list at the same position as their path.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<ParsedFile>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(path).map_err(|e| {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    e
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_parse_annotated_file() {
        let temp_dir = TempDir::new().unwrap();
        let code = r#"
            //! !api 3.0.3

            /// !GET /users -> listUsers
            pub async fn list_users() {}

            /// !model
            pub struct User {
                pub id: u32,
            }
        "#;

        let file_path = create_temp_file(&temp_dir, "valid.rs", code);
        let parsed = AstParser::parse_file(&file_path).unwrap();

        assert_eq!(parsed.path, file_path);
        assert_eq!(parsed.syntax_tree.items.len(), 2);
        assert_eq!(parsed.syntax_tree.attrs.len(), 1);
    }

    #[test]
    fn test_parse_invalid_rust_file() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_code = r#"
            pub struct User {
                pub id: u32
                pub name: String
            }
        "#;

        let file_path = create_temp_file(&temp_dir, "invalid.rs", invalid_code);
        match AstParser::parse_file(&file_path) {
            Err(Error::ParseError { file, message }) => {
                assert_eq!(file, file_path);
                assert!(!message.is_empty());
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = AstParser::parse_file(Path::new("/nonexistent/file.rs"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[test]
    fn test_parse_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_temp_file(&temp_dir, "empty.rs", "");
        let parsed = AstParser::parse_file(&file_path).unwrap();
        assert!(parsed.syntax_tree.items.is_empty());
    }

    #[test]
    fn test_parse_str() {
        let parsed = AstParser::parse_str(Path::new("inline.rs"), "pub fn hello() {}").unwrap();
        assert_eq!(parsed.path, PathBuf::from("inline.rs"));
        assert_eq!(parsed.syntax_tree.items.len(), 1);
    }

    #[test]
    fn test_parse_files_batch() {
        let temp_dir = TempDir::new().unwrap();

        let file1 = create_temp_file(&temp_dir, "file1.rs", "pub fn hello() {}");
        let file2 = create_temp_file(&temp_dir, "file2.rs", "pub struct World;");
        let file3 = create_temp_file(&temp_dir, "file3.rs", "pub fn broken( {");

        let paths = vec![file1.clone(), file2.clone(), file3];
        let results = AstParser::parse_files(&paths);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().path, file1);
        assert_eq!(results[1].as_ref().unwrap().path, file2);
        assert!(results[2].is_err());
    }

    #[test]
    fn test_parse_files_empty_list() {
        let results = AstParser::parse_files(&[]);
        assert!(results.is_empty());
    }
}
