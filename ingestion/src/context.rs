use std::sync::Arc;

use chunker::ChunkSpan;
use common::{
    domain::{Chunk, Document},
    llm::EmbeddingClient,
    storage::{ChunkRepository, DocumentRepository},
};
use extraction::{ContentExtractor, ExtractedContent};

/// The dependencies a pipeline run needs, bundled once per
/// `IngestionPipeline` instance.
pub struct PipelineDeps {
    pub extractor: Arc<dyn ContentExtractor>,
    pub embedder: Arc<dyn EmbeddingClient>,
    pub documents: Arc<dyn DocumentRepository>,
    pub chunks: Arc<dyn ChunkRepository>,
    pub chunker_config: chunker::ChunkerConfig,
    pub embedding_batch_size: usize,
}

/// Per-run mutable state threaded through the pipeline stages.
pub struct PipelineContext {
    pub document: Document,
    pub extracted: Option<ExtractedContent>,
    pub chunk_spans: Vec<ChunkSpan>,
    pub embedded_chunks: Vec<Chunk>,
}

impl PipelineContext {
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            extracted: None,
            chunk_spans: Vec::new(),
            embedded_chunks: Vec::new(),
        }
    }
}
