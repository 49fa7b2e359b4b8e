//! Persistence ports: the core depends only on these traits.
//! `memory` is the one concrete adapter shipped with this crate; a
//! SurrealDB or Postgres adapter can implement the same traits without
//! touching any calling code.

pub mod memory;

use async_trait::async_trait;

use crate::{
    domain::{Chunk, CrawlJob, Document, DiscoveredUrl, EvaluationDataset, EvaluationRun, Notebook},
    error::AppError,
};

#[async_trait]
pub trait NotebookRepository: Send + Sync {
    async fn create(&self, notebook: Notebook) -> Result<Notebook, AppError>;
    async fn get(&self, id: &str) -> Result<Notebook, AppError>;
    /// Deletes the notebook and cascades to its documents, chunks, crawl
    /// jobs, and evaluation datasets.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(&self, document: Document) -> Result<Document, AppError>;
    async fn get(&self, id: &str) -> Result<Document, AppError>;
    async fn get_by_notebook_and_url(
        &self,
        notebook_id: &str,
        url: &str,
    ) -> Result<Option<Document>, AppError>;
    async fn update(&self, document: Document) -> Result<Document, AppError>;
    async fn list_by_notebook(&self, notebook_id: &str) -> Result<Vec<Document>, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[async_trait]
pub trait ChunkRepository: Send + Sync {
    async fn save_batch(&self, chunks: Vec<Chunk>) -> Result<(), AppError>;
    async fn delete_by_document(&self, document_id: &str) -> Result<(), AppError>;
    async fn list_by_document(&self, document_id: &str) -> Result<Vec<Chunk>, AppError>;
    async fn get(&self, id: &str) -> Result<Chunk, AppError>;

    /// Cosine-distance top-`k` scan restricted to chunks with a non-null
    /// embedding whose document belongs to `notebook_id`.
    /// Ordered by ascending distance (descending `score = 1 - distance`).
    async fn top_k_by_cosine(
        &self,
        notebook_id: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, AppError>;
}

#[async_trait]
pub trait CrawlJobRepository: Send + Sync {
    async fn create(&self, job: CrawlJob) -> Result<CrawlJob, AppError>;
    async fn get(&self, id: &str) -> Result<CrawlJob, AppError>;
    async fn update(&self, job: CrawlJob) -> Result<CrawlJob, AppError>;
}

#[async_trait]
pub trait DiscoveredUrlRepository: Send + Sync {
    async fn record(&self, entry: DiscoveredUrl) -> Result<(), AppError>;
    async fn list_by_job(&self, crawl_job_id: &str) -> Result<Vec<DiscoveredUrl>, AppError>;
}

#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    async fn create_dataset(&self, dataset: EvaluationDataset) -> Result<EvaluationDataset, AppError>;
    async fn get_dataset(&self, id: &str) -> Result<EvaluationDataset, AppError>;
    async fn update_dataset(&self, dataset: EvaluationDataset) -> Result<EvaluationDataset, AppError>;

    async fn create_run(&self, run: EvaluationRun) -> Result<EvaluationRun, AppError>;
    async fn get_run(&self, id: &str) -> Result<EvaluationRun, AppError>;
    async fn update_run(&self, run: EvaluationRun) -> Result<EvaluationRun, AppError>;
    async fn list_runs_by_dataset(&self, dataset_id: &str) -> Result<Vec<EvaluationRun>, AppError>;
}
