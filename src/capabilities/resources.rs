//! Example resources: data the LLM can read for context.
//!
//! `file://{path}` is the file-backed resource. Every path it receives is
//! resolved against the configured resource root and rejected if the
//! resolved form escapes that root; this containment check is mandatory
//! wherever a resource handler touches the filesystem.

use std::path::{Component, Path, PathBuf};

use serde_json::json;

use crate::config::ResourcesConfig;
use crate::error::{RegistryError, ResourceError};
use crate::mcp::protocol::SERVER_NAME;
use crate::registry::{CapabilityRegistry, InvokeOutput, ResourceContents};
use crate::schema::ArgumentShape;

/// Registers the example resources.
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] on a URI collision.
pub fn register(
    registry: &mut CapabilityRegistry,
    resources: &ResourcesConfig,
) -> Result<(), RegistryError> {
    registry.register_resource(
        "server://info",
        "Server information and capabilities",
        ArgumentShape::new(),
        |_args| async {
            let info = json!({
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "description": env!("CARGO_PKG_DESCRIPTION"),
                "capabilities": {
                    "tools": true,
                    "resources": true,
                    "prompts": true,
                },
            });
            let text = serde_json::to_string_pretty(&info)?;
            Ok(InvokeOutput::Resource(vec![ResourceContents {
                uri: "server://info".to_string(),
                mime_type: "application/json".to_string(),
                text,
            }]))
        },
    )?;

    let root = resources
        .root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    registry.register_resource(
        "file://{path}",
        "Read a file from the configured resource root",
        ArgumentShape::new().string("path", "Path relative to the resource root"),
        move |args| {
            let root = root.clone();
            async move {
                let requested = args.str_or("path", "");
                let resolved = resolve_under_root(&root, requested)?;
                let text = tokio::fs::read_to_string(&resolved).await.map_err(|e| {
                    ResourceError::ReadError {
                        path: resolved.clone(),
                        source: e,
                    }
                })?;
                Ok(InvokeOutput::Resource(vec![ResourceContents {
                    uri: format!("file://{requested}"),
                    mime_type: mime_type_for(&resolved).to_string(),
                    text,
                }]))
            }
        },
    )?;

    Ok(())
}

/// Resolves `requested` against `root`, refusing anything that escapes it.
///
/// Traversal components are rejected before touching the filesystem, and
/// the canonicalised result must still sit under the canonicalised root.
///
/// # Errors
///
/// Returns [`ResourceError::AccessDenied`] for escaping paths and
/// [`ResourceError::ReadError`] for paths that do not resolve.
pub fn resolve_under_root(root: &Path, requested: &str) -> Result<PathBuf, ResourceError> {
    if Path::new(requested)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ResourceError::AccessDenied);
    }

    let canonical_root = root.canonicalize().map_err(|e| ResourceError::ReadError {
        path: root.to_path_buf(),
        source: e,
    })?;

    let candidate = canonical_root.join(requested.trim_start_matches('/'));
    let resolved = candidate.canonicalize().map_err(|e| ResourceError::ReadError {
        path: candidate.clone(),
        source: e,
    })?;

    // Symlinks may still point outside the root.
    if resolved.starts_with(&canonical_root) {
        Ok(resolved)
    } else {
        Err(ResourceError::AccessDenied)
    }
}

/// Maps a file extension to a MIME type.
fn mime_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return "text/plain";
    };
    match ext.to_ascii_lowercase().as_str() {
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "xml" => "application/xml",
        "html" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "ts" => "text/typescript",
        "md" => "text/markdown",
        "py" => "text/x-python",
        "go" => "text/x-go",
        "rs" => "text/x-rust",
        _ => "text/plain",
    }
}
