//! Progress reporting for batch extraction runs.
//!
//! The pipeline reports one unit per document. Rendering is left to the
//! caller: the CLI draws an `indicatif` bar, library use and tests pass
//! [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a document run.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of documents in the run.
    fn set_total(&self, total: u64);

    /// Advances by `delta` documents.
    fn inc(&self, delta: u64);

    /// Shows the document currently being processed.
    fn set_message(&self, msg: String);

    /// Marks the run finished with a closing message.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
