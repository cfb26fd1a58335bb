//! Observer callbacks for long-running session steps.
//!
//! Extraction and generation can each take seconds. A front end that wants a
//! busy indicator implements [`WorkflowObserver`] and attaches it to the
//! [`crate::session::Session`]; every method has a no-op default, so an
//! implementation overrides only the events it renders.
//!
//! Callbacks run on the caller's task, before and after the awaited work, and
//! must not block.

use std::sync::Arc;

/// Receives stage events from a [`crate::session::Session`].
pub trait WorkflowObserver: Send + Sync {
    /// A document is about to be extracted.
    fn on_extraction_start(&self, document_name: &str) {
        let _ = document_name;
    }

    /// Extraction finished.
    ///
    /// # Arguments
    /// * `elements`: number of text elements found
    /// * `chars`: length of the joined text in characters
    fn on_extraction_complete(&self, elements: usize, chars: usize) {
        let _ = (elements, chars);
    }

    /// The model is about to be called. Not fired when the call is refused
    /// for a missing key.
    fn on_generation_start(&self, model: &str) {
        let _ = model;
    }

    /// The model call returned (successfully parsed or not).
    fn on_generation_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op observer. This is the default when none is attached.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias matching the type stored in the session.
pub type SharedObserver = Arc<dyn WorkflowObserver>;
