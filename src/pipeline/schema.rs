//! Schema loading.
//!
//! The "schema" is whatever JSON the user uploads. It is only ever echoed
//! into the prompt as an example of the wanted shape, so any syntactically
//! valid JSON value is accepted: an object, an array, even a bare string or
//! number. No JSON-Schema validation happens here.

use crate::error::Doc2JsonError;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Decode `bytes` as UTF-8 and parse them as JSON.
///
/// Both failure modes (bad encoding, bad syntax) are
/// [`Doc2JsonError::SchemaDecode`].
pub fn parse_schema(bytes: &[u8]) -> Result<Value, Doc2JsonError> {
    let text = std::str::from_utf8(bytes).map_err(|e| Doc2JsonError::SchemaDecode {
        detail: format!("not UTF-8: {e}"),
    })?;

    let value: Value = serde_json::from_str(text).map_err(|e| Doc2JsonError::SchemaDecode {
        detail: e.to_string(),
    })?;

    debug!("Schema parsed: {}", describe(&value));
    Ok(value)
}

/// Read schema bytes from disk. I/O failures are
/// [`Doc2JsonError::SchemaOther`], distinct from decode failures.
pub async fn read_schema_file(path: impl AsRef<Path>) -> Result<Vec<u8>, Doc2JsonError> {
    let path = path.as_ref();
    tokio::fs::read(path)
        .await
        .map_err(|e| Doc2JsonError::SchemaOther(format!("{}: {e}", path.display())))
}

/// Short description of a JSON value's shape, for logs.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Object(map) => format!("object with {} keys", map.len()),
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Null => "null".to_string(),
    }
}
