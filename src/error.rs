//! Error types for the doc2json library.
//!
//! Three error types mirror the three layers a request passes through:
//!
//! * [`ExtractError`] — the text extractor could not turn document bytes into
//!   text (unsupported extension, corrupt archive, pdfium unavailable, …).
//!
//! * [`ClientError`] — the completion client failed to obtain a response from
//!   the hosted model (transport, authentication, quota, bad payload).
//!
//! * [`Doc2JsonError`] — the **workflow-boundary** error returned by every
//!   [`crate::session::Session`] handler. Collaborator errors are folded into
//!   it so callers only ever match one enum. Every variant leaves the
//!   affected session slot unset; none of them is fatal to the process.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the [`crate::session::Session`] handlers.
#[derive(Debug, Error)]
pub enum Doc2JsonError {
    // ── Document stage ────────────────────────────────────────────────────
    /// The extractor failed; no partial text is kept.
    #[error("An error occurred while processing the file: {0}")]
    Extraction(#[from] ExtractError),

    // ── Schema stage ──────────────────────────────────────────────────────
    /// Schema bytes are not UTF-8 or not JSON.
    #[error("Invalid JSON schema file: {detail}\nPlease upload a well-formatted JSON file.")]
    SchemaDecode { detail: String },

    /// Any other failure while reading the schema (typically I/O).
    #[error("An error occurred while reading the JSON schema file: {0}")]
    SchemaOther(String),

    /// A schema was supplied before any document text exists.
    #[error("No document text available.\nLoad a document before uploading a schema.")]
    DocumentRequired,

    // ── Generation stage ──────────────────────────────────────────────────
    /// Generation requested before a schema was loaded.
    #[error("No JSON schema loaded.\nUpload a schema before generating.")]
    SchemaRequired,

    /// The API key is empty; the model was not called.
    #[error("Please enter your API key before generating.")]
    MissingCredential,

    /// The model answered, but its answer is not JSON.
    ///
    /// `raw` is the literal response so the caller can show it.
    #[error("The model did not return a valid JSON object ({detail}).\nReview the model's raw output.")]
    ModelOutputParse { raw: String, detail: String },

    /// The model call itself failed (auth, network, quota, bad request).
    #[error("An unexpected error occurred during generation: {message}")]
    Generation { message: String },

    // ── Ambient ───────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not write the download artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Doc2JsonError {
    /// `true` for conditions the user fixes by supplying input, rather than
    /// failures of the document, the schema or the model.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Doc2JsonError::MissingCredential
                | Doc2JsonError::DocumentRequired
                | Doc2JsonError::SchemaRequired
        )
    }

    /// The model's literal output, when the failure was a JSON parse error.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Doc2JsonError::ModelOutputParse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

impl From<ClientError> for Doc2JsonError {
    fn from(e: ClientError) -> Self {
        Doc2JsonError::Generation {
            message: e.to_string(),
        }
    }
}

/// Failures of the text extractor.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// Extension outside the supported allow-list.
    #[error("Unsupported document type '{extension}' for '{name}' (expected one of: pdf, docx, csv, xlsx, html, md, txt)")]
    UnsupportedType { name: String, extension: String },

    /// The document is not encoded as UTF-8 where text was expected.
    #[error("'{name}' is not valid UTF-8: {detail}")]
    InvalidEncoding { name: String, detail: String },

    /// The bytes do not form a readable document of the detected type.
    #[error("Could not read '{name}' as {kind}: {detail}")]
    Corrupt {
        name: String,
        kind: String,
        detail: String,
    },

    /// The pdfium shared library could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium on the library search path."
    )]
    PdfiumUnavailable(String),

    /// Extraction worker stopped unexpectedly.
    #[error("Extraction task failed: {0}")]
    Internal(String),
}

/// Failures of the hosted completion client.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("Request to '{endpoint}' failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// 401 / 403: the key was rejected.
    #[error("Authentication rejected (HTTP {status}): {detail}")]
    Auth { status: u16, detail: String },

    /// 429: quota or rate limit.
    #[error("Rate limit exceeded{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// 2xx, but the body is not a chat completion.
    #[error("Invalid response from model API: {0}")]
    InvalidResponse(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(s) => format!(" (retry after {s}s)"),
        None => String::new(),
    }
}
