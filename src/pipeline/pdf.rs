//! PDF text layer via pdfium.
//!
//! pdfium is a shared library loaded at runtime. `PDFIUM_LIB_PATH` points at a
//! specific copy; otherwise the platform library search path is used. Binding
//! happens per call so a missing library surfaces as an ordinary extraction
//! error for that document rather than a startup failure.
//!
//! Scanned PDFs without a text layer produce no elements; there is no OCR.

use crate::error::ExtractError;
use crate::pipeline::extract::TextElement;
use crate::pipeline::markup;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Paragraph elements of every page, in page order.
pub fn extract_pdf(name: &str, bytes: &[u8]) -> Result<Vec<TextElement>, ExtractError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let detail = format!("{:?}", e);
        let detail = if detail.contains("Password") || detail.contains("password") {
            "document is encrypted and requires a password".to_string()
        } else {
            detail
        };
        ExtractError::Corrupt {
            name: name.to_string(),
            kind: "PDF".into(),
            detail,
        }
    })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut elements = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| ExtractError::Corrupt {
                name: name.to_string(),
                kind: "PDF".into(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();
        let page_elements = markup::extract_plain(&text);
        debug!("Page {}: {} elements", idx + 1, page_elements.len());
        elements.extend(page_elements);
    }
    Ok(elements)
}

fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.is_empty() => {
            debug!("Binding pdfium from {}", path);
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractError::PdfiumUnavailable(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}
