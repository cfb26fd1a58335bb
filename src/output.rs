//! The downloadable result: generated JSON as a named file.

use crate::error::Doc2JsonError;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// MIME type of every artifact.
pub const JSON_MIME_TYPE: &str = "application/json";

/// File name used when the document's name is unknown.
pub const FALLBACK_FILE_NAME: &str = "generated_output.json";

/// A file ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    /// Pretty-printed JSON, two-space indentation.
    pub contents: String,
}

impl DownloadArtifact {
    /// Render `value` for the document named `document_name`.
    pub fn new(value: &Value, document_name: Option<&str>) -> Self {
        Self {
            file_name: output_file_name(document_name),
            mime_type: JSON_MIME_TYPE,
            contents: pretty_json(value),
        }
    }
}

/// `<basename>_structured.json`, where the base name is everything before the
/// last `.`; [`FALLBACK_FILE_NAME`] when no name is known.
pub fn output_file_name(document_name: Option<&str>) -> String {
    match document_name {
        Some(name) if !name.is_empty() => {
            let base = name.rsplit_once('.').map_or(name, |(base, _)| base);
            format!("{base}_structured.json")
        }
        _ => FALLBACK_FILE_NAME.to_string(),
    }
}

/// Two-space indented JSON.
pub fn pretty_json(value: &Value) -> String {
    // Serialising a `Value` cannot fail: its map keys are always strings.
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Write `artifact` to `dest`, atomically (temp file + rename).
///
/// If `dest` is an existing directory the artifact's own file name is used
/// inside it. Returns the path written.
pub async fn write_artifact(
    artifact: &DownloadArtifact,
    dest: impl AsRef<Path>,
) -> Result<PathBuf, Doc2JsonError> {
    let dest = dest.as_ref();
    let path = if tokio::fs::metadata(dest)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        dest.join(&artifact.file_name)
    } else {
        dest.to_path_buf()
    };

    let write_err = |source: std::io::Error| Doc2JsonError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &artifact.contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), artifact.contents.len());
    Ok(path)
}
