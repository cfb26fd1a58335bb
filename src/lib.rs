//! # doc2json
//!
//! Turn an unstructured document into JSON shaped like a schema you supply.
//!
//! ## How it works
//!
//! The text layer of a document (PDF, Word, spreadsheet, CSV, HTML,
//! Markdown or plain text) is extracted locally. Together with an example
//! JSON schema it is sent to a hosted large language model, which is asked to
//! reply with nothing but a JSON value following that schema. The reply is
//! parsed, shown, and offered as a `<document>_structured.json` download.
//!
//! ```text
//! document ──▶ extract ──▶ text ─┐
//!                                ├──▶ prompt ──▶ LLM ──▶ parse ──▶ JSON file
//! schema.json ──▶ parse ──▶ value┘
//! ```
//!
//! Each step lives in [`session::Session`], which owns the three pieces of
//! state (text, schema, generated JSON) and clears whatever depends on an
//! input when that input changes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2json::{ChatCompletionsClient, GenerationConfig, Session, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenerationConfig::builder()
//!         .api_key(std::env::var("GROQ_API_KEY")?)
//!         .build()?;
//!     let client = ChatCompletionsClient::from_config(&config)?;
//!
//!     let mut session = Session::new();
//!     session
//!         .load_document(UploadedDocument::from_path("invoice.pdf").await?)
//!         .await?;
//!     session.load_schema(br#"{"invoice_number": "", "total": 0}"#)?;
//!     session.generate(&client, &config).await?;
//!
//!     if let Some(artifact) = session.download() {
//!         doc2json::write_artifact(&artifact, ".").await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2json` binary (clap + anyhow + tracing-subscriber + rustyline) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2json = { version = "0.1", default-features = false }
//! ```
//!
//! ## Models
//!
//! | Model | Context | Notes |
//! |-------|---------|-------|
//! | `llama3-8b-8192` (default) | 8k | Fast, cheap |
//! | `llama3-70b-8192` | 8k | Better at nested schemas |
//! | `mixtral-8x7b-32768` | 32k | Long documents |
//! | `gemma-7b-it` | 8k | Alternative small model |
//!
//! The whole document goes into one prompt; documents longer than the
//! model's context window are rejected by the provider.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, ModelId};
pub use error::{ClientError, Doc2JsonError, ExtractError};
pub use output::{output_file_name, write_artifact, DownloadArtifact};
pub use pipeline::client::{ChatCompletionsClient, CompletionClient, CompletionRequest};
pub use pipeline::extract::{
    DocumentKind, ElementKind, FormatExtractor, TextElement, TextExtractor, UploadedDocument,
};
pub use progress::{NoopObserver, SharedObserver, WorkflowObserver};
pub use session::{Session, Stage};
