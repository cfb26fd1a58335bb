//! Per-user session state and the workflow handlers that drive it.
//!
//! A [`Session`] holds three slots that form a dependency chain:
//!
//! ```text
//! extracted text ──▶ JSON schema ──▶ generated JSON
//! ```
//!
//! Each handler corresponds to one user action (upload a document, upload a
//! schema, press generate) and runs to completion before the next action is
//! accepted: handlers take `&mut self`, so the borrow checker serialises
//! them. An upstream change clears everything downstream of it, which keeps
//! the chain's invariant: generated JSON never exists without a schema, and a
//! schema never exists without extracted text.
//!
//! Every failure is returned as a [`Doc2JsonError`] and leaves the affected
//! slot unset, so the user can simply retry the action.

use crate::config::GenerationConfig;
use crate::error::Doc2JsonError;
use crate::output::{pretty_json, DownloadArtifact};
use crate::pipeline::client::{CompletionClient, CompletionRequest};
use crate::pipeline::extract::{extract_text, FormatExtractor, TextExtractor, UploadedDocument};
use crate::pipeline::schema::{describe, parse_schema, read_schema_file};
use crate::progress::{NoopObserver, SharedObserver};
use crate::prompts::build_generation_prompt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a session is in the document → schema → JSON sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing loaded.
    Idle,
    /// Text extracted, no schema yet.
    DocumentLoaded,
    /// Schema loaded; ready to generate (or the last attempt failed).
    SchemaLoaded,
    /// Generated JSON available for download.
    Generated,
}

/// One user's isolated workflow state.
pub struct Session {
    extractor: Arc<dyn TextExtractor>,
    observer: SharedObserver,
    document_name: Option<String>,
    extracted_text: Option<String>,
    json_schema: Option<Value>,
    generated_json: Option<Value>,
    generation_failed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("extractor", &self.extractor.name())
            .field("document_name", &self.document_name)
            .field("stage", &self.stage())
            .field("generation_failed", &self.generation_failed)
            .finish()
    }
}

impl Session {
    /// A session using the built-in [`FormatExtractor`].
    pub fn new() -> Self {
        Self::with_extractor(Arc::new(FormatExtractor))
    }

    /// A session using a custom text extractor.
    pub fn with_extractor(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            observer: Arc::new(NoopObserver),
            document_name: None,
            extracted_text: None,
            json_schema: None,
            generated_json: None,
            generation_failed: false,
        }
    }

    /// Attach an observer for busy indicators.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    // ── Resets ───────────────────────────────────────────────────────────

    /// A new document invalidates everything: text, schema and output.
    pub fn reset_document_state(&mut self) {
        self.extracted_text = None;
        self.json_schema = None;
        self.generated_json = None;
        self.generation_failed = false;
    }

    /// A new schema invalidates the schema and its output; the text stays.
    pub fn reset_schema_state(&mut self) {
        self.json_schema = None;
        self.generated_json = None;
        self.generation_failed = false;
    }

    // ── Handlers ─────────────────────────────────────────────────────────

    /// Upload a document: reset, then extract its text.
    ///
    /// On failure the text slot stays empty; nothing partial is kept.
    pub async fn load_document(
        &mut self,
        document: UploadedDocument,
    ) -> Result<&str, Doc2JsonError> {
        self.reset_document_state();
        self.document_name = Some(document.name.clone());
        info!("Processing {}", document.name);
        self.observer.on_extraction_start(&document.name);

        let (text, elements) = extract_text(Arc::clone(&self.extractor), document)
            .await
            .inspect_err(|e| warn!("Extraction failed: {}", e))?;

        self.observer
            .on_extraction_complete(elements, text.chars().count());
        Ok(self.extracted_text.insert(text).as_str())
    }

    /// Read a document from disk and [`load_document`](Self::load_document) it.
    pub async fn load_document_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<&str, Doc2JsonError> {
        let path = path.as_ref();
        // an unreadable file still replaces the previous document
        self.reset_document_state();
        self.document_name = None;
        let document = UploadedDocument::from_path(path).await.map_err(|e| {
            crate::error::ExtractError::Corrupt {
                name: path.display().to_string(),
                kind: "file".into(),
                detail: e.to_string(),
            }
        })?;
        self.load_document(document).await
    }

    /// Upload schema bytes: reset the schema, then parse.
    ///
    /// Requires extracted text. On failure the schema slot stays empty.
    pub fn load_schema(&mut self, bytes: &[u8]) -> Result<&Value, Doc2JsonError> {
        if self.extracted_text.is_none() {
            return Err(Doc2JsonError::DocumentRequired);
        }
        self.reset_schema_state();

        let schema = parse_schema(bytes).inspect_err(|e| warn!("Schema rejected: {}", e))?;
        info!("Schema loaded: {}", describe(&schema));
        Ok(self.json_schema.insert(schema))
    }

    /// Read a schema from disk and [`load_schema`](Self::load_schema) it.
    ///
    /// A read failure is [`Doc2JsonError::SchemaOther`] and also resets the
    /// schema, as any new upload would.
    pub async fn load_schema_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<&Value, Doc2JsonError> {
        if self.extracted_text.is_none() {
            return Err(Doc2JsonError::DocumentRequired);
        }
        let bytes = match read_schema_file(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.reset_schema_state();
                return Err(e);
            }
        };
        self.load_schema(&bytes)
    }

    /// Ask the model for JSON that follows the loaded schema.
    ///
    /// With an empty API key the model is not called and the state is left
    /// as it was. Any other failure clears the generated slot.
    pub async fn generate(
        &mut self,
        client: &dyn CompletionClient,
        config: &GenerationConfig,
    ) -> Result<&Value, Doc2JsonError> {
        let Some(text) = self.extracted_text.as_deref() else {
            return Err(Doc2JsonError::DocumentRequired);
        };
        let Some(schema) = self.json_schema.as_ref() else {
            return Err(Doc2JsonError::SchemaRequired);
        };
        if !config.has_api_key() {
            warn!("Generation requested without an API key");
            return Err(Doc2JsonError::MissingCredential);
        }

        let prompt = build_generation_prompt(schema, text);
        let request = CompletionRequest::new(config, prompt);
        info!(
            "Calling {} via {} ({} prompt chars)",
            request.model,
            client.name(),
            request.prompt.chars().count()
        );
        self.observer.on_generation_start(&request.model);

        let outcome = match client.complete(&request).await {
            Ok(raw) => {
                debug!("Model returned {} chars", raw.chars().count());
                serde_json::from_str::<Value>(&raw).map_err(|e| {
                    Doc2JsonError::ModelOutputParse {
                        detail: e.to_string(),
                        raw,
                    }
                })
            }
            Err(e) => Err(Doc2JsonError::from(e)),
        };

        self.observer.on_generation_complete(outcome.is_ok());
        match outcome {
            Ok(value) => {
                self.generation_failed = false;
                info!("Generated JSON: {}", describe(&value));
                Ok(self.generated_json.insert(value))
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                self.generated_json = None;
                self.generation_failed = true;
                Err(e)
            }
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn stage(&self) -> Stage {
        if self.generated_json.is_some() {
            Stage::Generated
        } else if self.json_schema.is_some() {
            Stage::SchemaLoaded
        } else if self.extracted_text.is_some() {
            Stage::DocumentLoaded
        } else {
            Stage::Idle
        }
    }

    /// Whether the most recent generation attempt failed.
    pub fn failed(&self) -> bool {
        self.generation_failed
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document_name.as_deref()
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.extracted_text.as_deref()
    }

    pub fn json_schema(&self) -> Option<&Value> {
        self.json_schema.as_ref()
    }

    pub fn generated_json(&self) -> Option<&Value> {
        self.generated_json.as_ref()
    }

    /// The schema as indented JSON.
    pub fn render_schema(&self) -> Option<String> {
        self.json_schema.as_ref().map(pretty_json)
    }

    /// The generated JSON as indented JSON.
    pub fn render_generated(&self) -> Option<String> {
        self.generated_json.as_ref().map(pretty_json)
    }

    /// The download file, once JSON has been generated.
    pub fn download(&self) -> Option<DownloadArtifact> {
        self.generated_json
            .as_ref()
            .map(|v| DownloadArtifact::new(v, self.document_name.as_deref()))
    }
}
