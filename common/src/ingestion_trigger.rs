//! The seam the crawl service uses to fire off ingestion without
//! depending on the ingestion crate directly.

use crate::domain::Document;

pub trait DocumentIngestionTrigger: Send + Sync {
    /// At-most-once per `document.id`; fire-and-forget. Implementations
    /// spawn their own task and must not block the caller.
    fn trigger(&self, document: Document);
}
