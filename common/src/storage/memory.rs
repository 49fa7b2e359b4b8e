use std::collections::HashMap;

use async_trait::async_trait;
use metrics_lib::cosine_similarity;
use tokio::sync::RwLock;

use crate::{
    domain::{Chunk, CrawlJob, Document, DiscoveredUrl, EvaluationDataset, EvaluationRun, Notebook},
    error::AppError,
};

use super::{
    ChunkRepository, CrawlJobRepository, DiscoveredUrlRepository, DocumentRepository,
    EvaluationRepository, NotebookRepository, ScoredChunk,
};

/// The in-memory adapter backing this core's own test suite. Every table
/// is a `RwLock`-guarded map; mutations write a full new record, matching
/// the value-type discipline of the domain types themselves.
#[derive(Default)]
pub struct InMemoryStore {
    notebooks: RwLock<HashMap<String, Notebook>>,
    documents: RwLock<HashMap<String, Document>>,
    chunks: RwLock<HashMap<String, Chunk>>,
    crawl_jobs: RwLock<HashMap<String, CrawlJob>>,
    discovered_urls: RwLock<HashMap<(String, String), DiscoveredUrl>>,
    datasets: RwLock<HashMap<String, EvaluationDataset>>,
    runs: RwLock<HashMap<String, EvaluationRun>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotebookRepository for InMemoryStore {
    async fn create(&self, notebook: Notebook) -> Result<Notebook, AppError> {
        self.notebooks
            .write()
            .await
            .insert(notebook.id.clone(), notebook.clone());
        Ok(notebook)
    }

    async fn get(&self, id: &str) -> Result<Notebook, AppError> {
        self.notebooks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("notebook {id}")))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.notebooks.write().await.remove(id);

        let doc_ids: Vec<String> = {
            let docs = self.documents.read().await;
            docs.values()
                .filter(|d| d.notebook_id == id)
                .map(|d| d.id.clone())
                .collect()
        };
        self.documents
            .write()
            .await
            .retain(|_, d| d.notebook_id != id);
        {
            let mut chunks = self.chunks.write().await;
            chunks.retain(|_, c| !doc_ids.contains(&c.document_id));
        }

        let job_ids: Vec<String> = {
            let jobs = self.crawl_jobs.read().await;
            jobs.values()
                .filter(|j| j.notebook_id == id)
                .map(|j| j.id.clone())
                .collect()
        };
        self.crawl_jobs
            .write()
            .await
            .retain(|_, j| j.notebook_id != id);
        {
            let mut discovered = self.discovered_urls.write().await;
            discovered.retain(|(job_id, _), _| !job_ids.contains(job_id));
        }

        let dataset_ids: Vec<String> = {
            let datasets = self.datasets.read().await;
            datasets
                .values()
                .filter(|d| d.notebook_id == id)
                .map(|d| d.id.clone())
                .collect()
        };
        self.datasets
            .write()
            .await
            .retain(|_, d| d.notebook_id != id);
        {
            let mut runs = self.runs.write().await;
            runs.retain(|_, r| !dataset_ids.contains(&r.dataset_id));
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for InMemoryStore {
    async fn create(&self, document: Document) -> Result<Document, AppError> {
        let mut guard = self.documents.write().await;
        let duplicate = guard
            .values()
            .any(|d| d.notebook_id == document.notebook_id && d.url == document.url);
        if duplicate {
            return Err(AppError::validation(format!(
                "document with url {} already exists in notebook {}",
                document.url, document.notebook_id
            )));
        }
        guard.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    async fn get(&self, id: &str) -> Result<Document, AppError> {
        self.documents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("document {id}")))
    }

    async fn get_by_notebook_and_url(
        &self,
        notebook_id: &str,
        url: &str,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .find(|d| d.notebook_id == notebook_id && d.url == url)
            .cloned())
    }

    async fn update(&self, document: Document) -> Result<Document, AppError> {
        let mut guard = self.documents.write().await;
        if !guard.contains_key(&document.id) {
            return Err(AppError::not_found(format!("document {}", document.id)));
        }
        guard.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    async fn list_by_notebook(&self, notebook_id: &str) -> Result<Vec<Document>, AppError> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .filter(|d| d.notebook_id == notebook_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChunkRepository for InMemoryStore {
    async fn save_batch(&self, chunks: Vec<Chunk>) -> Result<(), AppError> {
        let mut guard = self.chunks.write().await;
        for chunk in chunks {
            guard.insert(chunk.id.clone(), chunk);
        }
        Ok(())
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<(), AppError> {
        self.chunks
            .write()
            .await
            .retain(|_, c| c.document_id != document_id);
        Ok(())
    }

    async fn list_by_document(&self, document_id: &str) -> Result<Vec<Chunk>, AppError> {
        Ok(self
            .chunks
            .read()
            .await
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Chunk, AppError> {
        self.chunks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("chunk {id}")))
    }

    async fn top_k_by_cosine(
        &self,
        notebook_id: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, AppError> {
        let documents = self.documents.read().await;
        let notebook_doc_ids: std::collections::HashSet<&str> = documents
            .values()
            .filter(|d| d.notebook_id == notebook_id)
            .map(|d| d.id.as_str())
            .collect();

        let chunks = self.chunks.read().await;
        let mut scored: Vec<ScoredChunk> = chunks
            .values()
            .filter(|c| notebook_doc_ids.contains(c.document_id.as_str()))
            .filter_map(|c| {
                let embedding = c.embedding.as_ref()?;
                let similarity = cosine_similarity(embedding, query_embedding);
                Some(ScoredChunk {
                    chunk: c.clone(),
                    score: similarity,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

#[async_trait]
impl CrawlJobRepository for InMemoryStore {
    async fn create(&self, job: CrawlJob) -> Result<CrawlJob, AppError> {
        self.crawl_jobs
            .write()
            .await
            .insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn get(&self, id: &str) -> Result<CrawlJob, AppError> {
        self.crawl_jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("crawl job {id}")))
    }

    async fn update(&self, job: CrawlJob) -> Result<CrawlJob, AppError> {
        let mut guard = self.crawl_jobs.write().await;
        if !guard.contains_key(&job.id) {
            return Err(AppError::not_found(format!("crawl job {}", job.id)));
        }
        guard.insert(job.id.clone(), job.clone());
        Ok(job)
    }
}

#[async_trait]
impl DiscoveredUrlRepository for InMemoryStore {
    async fn record(&self, entry: DiscoveredUrl) -> Result<(), AppError> {
        self.discovered_urls
            .write()
            .await
            .insert((entry.crawl_job_id.clone(), entry.url.clone()), entry);
        Ok(())
    }

    async fn list_by_job(&self, crawl_job_id: &str) -> Result<Vec<DiscoveredUrl>, AppError> {
        Ok(self
            .discovered_urls
            .read()
            .await
            .values()
            .filter(|d| d.crawl_job_id == crawl_job_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EvaluationRepository for InMemoryStore {
    async fn create_dataset(&self, dataset: EvaluationDataset) -> Result<EvaluationDataset, AppError> {
        self.datasets
            .write()
            .await
            .insert(dataset.id.clone(), dataset.clone());
        Ok(dataset)
    }

    async fn get_dataset(&self, id: &str) -> Result<EvaluationDataset, AppError> {
        self.datasets
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("evaluation dataset {id}")))
    }

    async fn update_dataset(&self, dataset: EvaluationDataset) -> Result<EvaluationDataset, AppError> {
        let mut guard = self.datasets.write().await;
        if !guard.contains_key(&dataset.id) {
            return Err(AppError::not_found(format!("evaluation dataset {}", dataset.id)));
        }
        guard.insert(dataset.id.clone(), dataset.clone());
        Ok(dataset)
    }

    async fn create_run(&self, run: EvaluationRun) -> Result<EvaluationRun, AppError> {
        self.runs.write().await.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn get_run(&self, id: &str) -> Result<EvaluationRun, AppError> {
        self.runs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("evaluation run {id}")))
    }

    async fn update_run(&self, run: EvaluationRun) -> Result<EvaluationRun, AppError> {
        let mut guard = self.runs.write().await;
        if !guard.contains_key(&run.id) {
            return Err(AppError::not_found(format!("evaluation run {}", run.id)));
        }
        guard.insert(run.id.clone(), run.clone());
        Ok(run)
    }

    async fn list_runs_by_dataset(&self, dataset_id: &str) -> Result<Vec<EvaluationRun>, AppError> {
        Ok(self
            .runs
            .read()
            .await
            .values()
            .filter(|r| r.dataset_id == dataset_id)
            .cloned()
            .collect())
    }
}
