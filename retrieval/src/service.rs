use std::sync::Arc;

use common::{
    domain::{Chunk, Document},
    error::AppError,
    llm::EmbeddingClient,
    storage::{ChunkRepository, DocumentRepository},
};

/// A retrieved chunk joined to its owning document, carrying the
/// similarity score the chunk was ranked by.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub document: Document,
    pub score: f32,
}

pub struct RetrievalService {
    chunks: Arc<dyn ChunkRepository>,
    documents: Arc<dyn DocumentRepository>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl RetrievalService {
    #[must_use]
    pub fn new(
        chunks: Arc<dyn ChunkRepository>,
        documents: Arc<dyn DocumentRepository>,
        embedder: Arc<dyn EmbeddingClient>,
    ) -> Self {
        Self {
            chunks,
            documents,
            embedder,
        }
    }

    /// Embeds `query` once, runs the cosine-distance top-`max_chunks` scan,
    /// and joins each hit to its document. Already ordered by descending
    /// score; an empty notebook or no embedded chunks yields an
    /// empty result.
    #[tracing::instrument(skip(self, query))]
    pub async fn retrieve(
        &self,
        notebook_id: &str,
        query: &str,
        max_chunks: usize,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        let embedding = self.embedder.embed(query).await?;
        let scored = self
            .chunks
            .top_k_by_cosine(notebook_id, &embedding, max_chunks)
            .await?;

        let mut retrieved = Vec::with_capacity(scored.len());
        for hit in scored {
            let document = self.documents.get(&hit.chunk.document_id).await?;
            retrieved.push(RetrievedChunk {
                chunk: hit.chunk,
                document,
                score: hit.score,
            });
        }
        Ok(retrieved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{
        domain::{Document, Notebook},
        storage::{memory::InMemoryStore, ChunkRepository, DocumentRepository, NotebookRepository},
        testutil::FakeEmbeddingClient,
    };

    #[tokio::test]
    async fn empty_notebook_returns_no_chunks() {
        let store = Arc::new(InMemoryStore::new());
        let notebook = NotebookRepository::create(store.as_ref(), Notebook::new("n".into(), None))
            .await
            .unwrap();
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(FakeEmbeddingClient::new(8));
        let service = RetrievalService::new(store.clone(), store.clone(), embedder);

        let hits = service.retrieve(&notebook.id, "anything", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn retrieves_and_joins_embedded_chunks_to_their_document() {
        let store = Arc::new(InMemoryStore::new());
        let notebook = NotebookRepository::create(store.as_ref(), Notebook::new("n".into(), None))
            .await
            .unwrap();
        let document = DocumentRepository::create(
            store.as_ref(),
            Document::new(notebook.id.clone(), "https://example.com/a".into()),
        )
        .await
        .unwrap();

        let embedder: Arc<dyn EmbeddingClient> = Arc::new(FakeEmbeddingClient::new(8));
        let embedding = embedder.embed("hello world").await.unwrap();
        let chunk = Chunk::new(document.id.clone(), "hello world".into(), 0, 11, 0, 2)
            .with_embedding(embedding);
        ChunkRepository::save_batch(store.as_ref(), vec![chunk.clone()])
            .await
            .unwrap();

        let service = RetrievalService::new(store.clone(), store.clone(), embedder);
        let hits = service.retrieve(&notebook.id, "hello world", 5).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, chunk.id);
        assert_eq!(hits[0].document.id, document.id);
        assert!(hits[0].score > 0.99);
    }
}
