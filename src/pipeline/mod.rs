//! Pipeline stages for document-to-JSON generation.
//!
//! Each submodule implements one step; [`crate::session::Session`] wires
//! them together and owns the resulting state.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ (pdf | office | markup) ──▶ text
//! schema  ──▶ JSON value
//! client  ──▶ raw model reply
//! ```
//!
//! 1. [`extract`] — detect the document type and produce the joined text;
//!    runs in `spawn_blocking` because pdfium and the zip readers are sync
//! 2. [`pdf`], [`office`], [`markup`] — per-format element extraction
//! 3. [`schema`] — decode and parse the uploaded schema
//! 4. [`client`] — the one stage with network I/O: a single chat-completions
//!    call

pub mod client;
pub mod extract;
pub mod markup;
pub mod office;
pub mod pdf;
pub mod schema;
