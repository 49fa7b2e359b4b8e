pub mod background;
pub mod context;
pub mod pipeline;
mod stages;
mod state;

pub use background::BackgroundIngestion;
pub use context::PipelineDeps;
pub use pipeline::IngestionPipeline;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::{
        domain::{Document, DocumentStatus},
        storage::memory::InMemoryStore,
        testutil::FakeEmbeddingClient,
    };
    use extraction::{ContentExtractor, ExtractedContent};
    use common::error::AppError;
    use async_trait::async_trait;

    use super::*;

    struct FixedExtractor {
        content: String,
    }

    #[async_trait]
    impl ContentExtractor for FixedExtractor {
        fn supports(&self, _url: &str) -> bool {
            true
        }

        async fn extract(&self, url: &str) -> Result<ExtractedContent, AppError> {
            Ok(ExtractedContent::new(
                url.to_string(),
                Some("Fixed Title".into()),
                self.content.clone(),
            ))
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl ContentExtractor for FailingExtractor {
        fn supports(&self, _url: &str) -> bool {
            true
        }

        async fn extract(&self, _url: &str) -> Result<ExtractedContent, AppError> {
            Err(AppError::external("upstream extractor unavailable"))
        }
    }

    fn deps(extractor: Arc<dyn ContentExtractor>, store: Arc<InMemoryStore>) -> Arc<PipelineDeps> {
        Arc::new(PipelineDeps {
            extractor,
            embedder: Arc::new(FakeEmbeddingClient::new(8)),
            documents: store.clone(),
            chunks: store,
            chunker_config: chunker::ChunkerConfig {
                chunk_size: 50,
                chunk_overlap: 5,
            },
            embedding_batch_size: 10,
        })
    }

    #[tokio::test]
    async fn successful_pipeline_completes_document_and_persists_chunks() {
        let store = Arc::new(InMemoryStore::new());
        let notebook = common::storage::NotebookRepository::create(
            store.as_ref(),
            common::domain::Notebook::new("n".into(), None),
        )
        .await
        .expect("create notebook");

        let document = common::storage::DocumentRepository::create(
            store.as_ref(),
            Document::new(notebook.id, "https://example.com/a".into()),
        )
        .await
        .expect("create document");

        let extractor: Arc<dyn ContentExtractor> = Arc::new(FixedExtractor {
            content: "Paragraph one.\nParagraph two has a little more content in it.\n".repeat(3),
        });
        let pipeline = IngestionPipeline::new(deps(extractor, store.clone()));

        let result = pipeline.process(document.clone()).await.expect("process");
        assert_eq!(result.status, DocumentStatus::Completed);
        assert_eq!(result.title.as_deref(), Some("Fixed Title"));

        let chunks = common::storage::ChunkRepository::list_by_document(store.as_ref(), &document.id)
            .await
            .expect("list chunks");
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.embedding.is_some()));
    }

    #[tokio::test]
    async fn extraction_failure_marks_document_failed_with_message() {
        let store = Arc::new(InMemoryStore::new());
        let notebook = common::storage::NotebookRepository::create(
            store.as_ref(),
            common::domain::Notebook::new("n".into(), None),
        )
        .await
        .expect("create notebook");
        let document = common::storage::DocumentRepository::create(
            store.as_ref(),
            Document::new(notebook.id, "https://example.com/b".into()),
        )
        .await
        .expect("create document");

        let pipeline = IngestionPipeline::new(deps(Arc::new(FailingExtractor), store));
        let result = pipeline.process(document).await.expect("process");

        assert_eq!(result.status, DocumentStatus::Failed);
        assert!(result.error_message.is_some());
    }

    #[tokio::test]
    async fn background_ingestion_trigger_is_idempotent_per_document() {
        let store = Arc::new(InMemoryStore::new());
        let notebook = common::storage::NotebookRepository::create(
            store.as_ref(),
            common::domain::Notebook::new("n".into(), None),
        )
        .await
        .expect("create notebook");
        let document = common::storage::DocumentRepository::create(
            store.as_ref(),
            Document::new(notebook.id, "https://example.com/c".into()),
        )
        .await
        .expect("create document");

        let extractor: Arc<dyn ContentExtractor> = Arc::new(FixedExtractor {
            content: "Short content.\n".into(),
        });
        let pipeline = Arc::new(IngestionPipeline::new(deps(extractor, store.clone())));
        let background = BackgroundIngestion::new(pipeline);

        background.trigger(document.clone());
        background.trigger(document.clone());
        background.wait_for_all().await;

        let persisted = common::storage::DocumentRepository::get(store.as_ref(), &document.id)
            .await
            .expect("get document");
        assert_eq!(persisted.status, DocumentStatus::Completed);
    }
}
