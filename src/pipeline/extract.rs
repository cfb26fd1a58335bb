//! Text extraction: turn uploaded document bytes into an ordered list of
//! text elements, then into one text blob.
//!
//! The extractor is a seam. [`TextExtractor`] is the whole contract the
//! session relies on; [`FormatExtractor`] is the default implementation that
//! picks a reader from the file extension. Tests (and callers with their own
//! parsing service) plug in their own implementation.
//!
//! ## Why `spawn_blocking`?
//!
//! Every reader here is synchronous and CPU-bound (pdfium, zip inflate, XML
//! scanning). [`extract_text`] moves the work onto Tokio's blocking pool so an
//! async caller's worker threads keep running.

use crate::error::ExtractError;
use crate::pipeline::{markup, office, pdf};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Separator placed between elements in the joined text.
pub const ELEMENT_SEPARATOR: &str = "\n\n";

/// Raw bytes plus the name they were uploaded under.
///
/// The name is advisory: only its extension is used, to pick a reader.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a document from disk, keeping only the file name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Document types recognised by the default extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Csv,
    Xlsx,
    Html,
    Markdown,
    Text,
}

impl DocumentKind {
    /// Extensions accepted for upload.
    pub const SUPPORTED_EXTENSIONS: [&'static str; 7] =
        ["pdf", "docx", "csv", "xlsx", "html", "md", "txt"];

    /// Infer the kind from a file name's extension (case-insensitive).
    pub fn from_filename(name: &str) -> Result<Self, ExtractError> {
        let extension = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            "csv" => Ok(DocumentKind::Csv),
            "xlsx" => Ok(DocumentKind::Xlsx),
            "html" => Ok(DocumentKind::Html),
            "md" => Ok(DocumentKind::Markdown),
            "txt" => Ok(DocumentKind::Text),
            _ => Err(ExtractError::UnsupportedType {
                name: name.to_string(),
                extension,
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Docx => "DOCX",
            DocumentKind::Csv => "CSV",
            DocumentKind::Xlsx => "XLSX",
            DocumentKind::Html => "HTML",
            DocumentKind::Markdown => "Markdown",
            DocumentKind::Text => "plain text",
        }
    }
}

/// Structural role of an extracted element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Title,
    NarrativeText,
    ListItem,
    Table,
    Text,
}

/// One text-bearing piece of a document. Renders as its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextElement {
    pub kind: ElementKind,
    pub text: String,
}

impl TextElement {
    pub fn new(kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for TextElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Contract for anything that can turn document bytes into text elements.
pub trait TextExtractor: Send + Sync {
    /// Extract elements in reading order.
    fn extract(&self, document: &UploadedDocument) -> Result<Vec<TextElement>, ExtractError>;

    /// Name of this backend (for diagnostics).
    fn name(&self) -> &str;
}

/// Default extractor: dispatches on [`DocumentKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatExtractor;

impl TextExtractor for FormatExtractor {
    fn extract(&self, document: &UploadedDocument) -> Result<Vec<TextElement>, ExtractError> {
        let kind = DocumentKind::from_filename(&document.name)?;
        debug!("Extracting '{}' as {}", document.name, kind.label());

        let name = document.name.as_str();
        let bytes = document.bytes.as_slice();
        match kind {
            DocumentKind::Pdf => pdf::extract_pdf(name, bytes),
            DocumentKind::Docx => office::extract_docx(name, bytes),
            DocumentKind::Xlsx => office::extract_xlsx(name, bytes),
            DocumentKind::Csv => markup::extract_csv(name, decode_utf8(name, bytes)?),
            DocumentKind::Html => Ok(markup::extract_html(decode_utf8(name, bytes)?)),
            DocumentKind::Markdown => Ok(markup::extract_markdown(decode_utf8(name, bytes)?)),
            DocumentKind::Text => Ok(markup::extract_plain(decode_utf8(name, bytes)?)),
        }
    }

    fn name(&self) -> &str {
        "format"
    }
}

/// Join elements into the text blob stored in the session.
pub fn join_elements(elements: &[TextElement]) -> String {
    elements
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(ELEMENT_SEPARATOR)
}

/// Run `extractor` off the async executor and join the result.
///
/// Returns the element count alongside the text for reporting.
pub async fn extract_text(
    extractor: Arc<dyn TextExtractor>,
    document: UploadedDocument,
) -> Result<(String, usize), ExtractError> {
    let name = document.name.clone();
    let backend = extractor.name().to_string();

    let elements = tokio::task::spawn_blocking(move || extractor.extract(&document))
        .await
        .map_err(|e| ExtractError::Internal(format!("extraction task panicked: {e}")))??;

    let text = join_elements(&elements);
    info!(
        "Extracted '{}' via {}: {} elements, {} chars",
        name,
        backend,
        elements.len(),
        text.chars().count()
    );
    Ok((text, elements.len()))
}

fn decode_utf8<'a>(name: &str, bytes: &'a [u8]) -> Result<&'a str, ExtractError> {
    std::str::from_utf8(bytes).map_err(|e| ExtractError::InvalidEncoding {
        name: name.to_string(),
        detail: e.to_string(),
    })
}
