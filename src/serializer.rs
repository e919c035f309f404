//! Serialization of assembled documents to YAML or JSON, and file output.

use crate::error::Result;
use crate::openapi_builder::OpenApiDocument;
use anyhow::Context;
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes an OpenAPI document to YAML.
///
/// Map keys keep the order they were inserted in while walking the sources.
///
/// # Errors
///
/// Returns [`Error::SerializationError`](crate::error::Error::SerializationError) if
/// serialization fails.
///
/// # Example
///
/// ```
/// use openapi_from_annotations::openapi_builder::OpenApiBuilder;
/// use openapi_from_annotations::serializer::serialize_yaml;
/// use openapi_from_annotations::spec_state::SpecState;
///
/// let document = OpenApiBuilder::build(&SpecState::new());
/// let yaml = serialize_yaml(&document).unwrap();
/// assert!(yaml.contains("openapi: 3.0.3"));
/// ```
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    Ok(serde_yaml::to_string(doc)?)
}

/// Serializes an OpenAPI document to pretty printed JSON.
///
/// # Errors
///
/// Returns [`Error::SerializationError`](crate::error::Error::SerializationError) if
/// serialization fails.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Writes `content` to `path`, creating missing parent directories.
pub fn write_to_file(content: &str, path: &Path) -> anyhow::Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
