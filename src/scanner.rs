use crate::error::{Error, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["target", "vendor", "testdata"];

/// File scanner for collecting the Rust sources of a project.
///
/// Walks the tree below the root in file name order, so the same tree always yields the
/// same file list. Build output (`target`), vendored code (`vendor`), test data
/// (`testdata`) and hidden directories are skipped.
///
/// # Example
///
/// ```no_run
/// use openapi_from_annotations::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-project"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Rust files", result.rust_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Every `.rs` file found, sorted by path
    pub rust_files: Vec<PathBuf>,
    /// Entries that could not be read; scanning continued past them
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all `.rs` files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the root is not a directory. Unreadable entries
    /// below the root only produce warnings.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a directory",
                self.root_path.display()
            )));
        }

        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !Self::is_skipped(e));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_rust_file(entry.path()) => {
                    rust_files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        rust_files.sort();
        debug!(
            "Found {} Rust files under {}",
            rust_files.len(),
            self.root_path.display()
        );

        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }

    fn is_skipped(entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref())
    }
}

fn is_rust_file(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("rs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_scan_collects_sorted_rust_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("src/handlers")).unwrap();
        fs::write(root.join("src/lib.rs"), "").unwrap();
        fs::write(root.join("src/handlers/users.rs"), "").unwrap();
        fs::write(root.join("src/handlers/pets.rs"), "").unwrap();
        fs::write(root.join("build.rs"), "").unwrap();
        fs::write(root.join("README.md"), "# README").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert!(result.warnings.is_empty());
        assert_eq!(
            relative(root, &result.rust_files),
            vec![
                "build.rs",
                "src/handlers/pets.rs",
                "src/handlers/users.rs",
                "src/lib.rs"
            ]
        );
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new(temp_dir.path().to_path_buf())
            .scan()
            .unwrap();
        assert!(result.rust_files.is_empty());
    }

    #[test]
    fn test_scan_skips_ignored_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        for dir in ["target/debug", "vendor/dep", "testdata", ".git", "src"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("target/debug/out.rs"), "").unwrap();
        fs::write(root.join("vendor/dep/lib.rs"), "").unwrap();
        fs::write(root.join("testdata/sample.rs"), "").unwrap();
        fs::write(root.join(".git/hook.rs"), "").unwrap();
        fs::write(root.join(".hidden.rs"), "").unwrap();
        fs::write(root.join("src/main.rs"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();
        assert_eq!(relative(root, &result.rust_files), vec!["src/main.rs"]);
    }

    #[test]
    fn test_scan_rejects_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("main.rs");
        fs::write(&file, "fn main() {}").unwrap();

        let result = FileScanner::new(file).scan();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_scan_rejects_missing_root() {
        let result = FileScanner::new(PathBuf::from("/nonexistent/project")).scan();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
