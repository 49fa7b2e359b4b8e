use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, ids::new_id};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A single ingested source URL within a notebook. Immutable
/// value type: every transition below returns a new instance rather than
/// mutating `self` in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub notebook_id: String,
    pub url: String,
    pub title: Option<String>,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub content_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    #[must_use]
    pub fn new(notebook_id: String, url: String) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            notebook_id,
            url,
            title: None,
            status: DocumentStatus::Pending,
            error_message: None,
            content_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `PENDING -> PROCESSING`.
    pub fn start_processing(&self) -> Result<Self, AppError> {
        self.transition_to(DocumentStatus::Pending, DocumentStatus::Processing, |doc| {
            doc.error_message = None;
        })
    }

    /// `PROCESSING -> COMPLETED(title, content_hash)`.
    pub fn complete(&self, title: Option<String>, content_hash: String) -> Result<Self, AppError> {
        self.transition_to(
            DocumentStatus::Processing,
            DocumentStatus::Completed,
            |doc| {
                doc.title = title;
                doc.content_hash = Some(content_hash);
                doc.error_message = None;
            },
        )
    }

    /// `PROCESSING -> FAILED(error_message)`.
    pub fn fail(&self, error_message: String) -> Result<Self, AppError> {
        self.transition_to(DocumentStatus::Processing, DocumentStatus::Failed, |doc| {
            doc.error_message = Some(error_message);
        })
    }

    /// `FAILED -> PENDING`, allowing the ingestion pipeline to retry.
    pub fn retry(&self) -> Result<Self, AppError> {
        self.transition_to(DocumentStatus::Failed, DocumentStatus::Pending, |doc| {
            doc.error_message = None;
        })
    }

    fn transition_to(
        &self,
        expected: DocumentStatus,
        next: DocumentStatus,
        apply: impl FnOnce(&mut Self),
    ) -> Result<Self, AppError> {
        if self.status != expected {
            return Err(AppError::invalid_state(format!(
                "document {id} cannot move from {from:?} to {next:?}; expected {expected:?}",
                id = self.id,
                from = self.status,
            )));
        }

        let mut next_doc = self.clone();
        next_doc.status = next;
        next_doc.updated_at = Utc::now();
        apply(&mut next_doc);
        Ok(next_doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let doc = Document::new("nb".into(), "https://example.com".into());
        let processing = doc.start_processing().expect("pending -> processing");
        assert_eq!(processing.status, DocumentStatus::Processing);

        let completed = processing
            .complete(Some("Title".into()), "deadbeef".into())
            .expect("processing -> completed");
        assert_eq!(completed.status, DocumentStatus::Completed);
        assert_eq!(completed.title.as_deref(), Some("Title"));
    }

    #[test]
    fn failed_can_retry_to_pending() {
        let doc = Document::new("nb".into(), "https://example.com".into())
            .start_processing()
            .expect("pending -> processing")
            .fail("boom".into())
            .expect("processing -> failed");

        let retried = doc.retry().expect("failed -> pending");
        assert_eq!(retried.status, DocumentStatus::Pending);
        assert!(retried.error_message.is_none());
    }

    #[test]
    fn illegal_transition_is_rejected_and_leaves_entity_unchanged() {
        let doc = Document::new("nb".into(), "https://example.com".into())
            .start_processing()
            .expect("pending -> processing")
            .complete(None, "hash".into())
            .expect("processing -> completed");

        let err = doc.start_processing().unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
}
