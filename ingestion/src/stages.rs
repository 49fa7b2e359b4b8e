use common::{domain::Chunk, error::AppError};
use state_machines::core::GuardError;
use tracing::debug;

use crate::context::{PipelineContext, PipelineDeps};
use crate::state::{Chunked, ContentPrepared, Embedded, IngestionMachine, Ready};

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::Internal(format!("invalid ingestion pipeline transition during {event}: {guard:?}"))
}

pub async fn prepare_content(
    machine: IngestionMachine<(), Ready>,
    deps: &PipelineDeps,
    ctx: &mut PipelineContext,
) -> Result<IngestionMachine<(), ContentPrepared>, AppError> {
    let extracted = deps.extractor.extract(&ctx.document.url).await?;
    debug!(
        document_id = %ctx.document.id,
        word_count = extracted.word_count,
        "content extracted"
    );
    ctx.extracted = Some(extracted);

    machine.prepare().map_err(|(_, guard)| map_guard_error("prepare", &guard))
}

pub async fn chunk_content(
    machine: IngestionMachine<(), ContentPrepared>,
    deps: &PipelineDeps,
    ctx: &mut PipelineContext,
) -> Result<IngestionMachine<(), Chunked>, AppError> {
    let extracted = ctx
        .extracted
        .as_ref()
        .ok_or_else(|| AppError::Internal("content extracted before chunking".into()))?;

    let spans = chunker::chunk_text(&extracted.content, &deps.chunker_config)?;
    debug!(document_id = %ctx.document.id, chunk_count = spans.len(), "content chunked");
    ctx.chunk_spans = spans;

    machine.chunk().map_err(|(_, guard)| map_guard_error("chunk", &guard))
}

pub async fn embed_chunks(
    machine: IngestionMachine<(), Chunked>,
    deps: &PipelineDeps,
    ctx: &mut PipelineContext,
) -> Result<IngestionMachine<(), Embedded>, AppError> {
    let mut chunks = Vec::with_capacity(ctx.chunk_spans.len());

    for batch in ctx.chunk_spans.chunks(deps.embedding_batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|span| span.content.clone()).collect();
        let embeddings = deps.embedder.embed_batch(&texts).await?;

        for (span, embedding) in batch.iter().zip(embeddings) {
            chunks.push(
                Chunk::new(
                    ctx.document.id.clone(),
                    span.content.clone(),
                    span.char_start,
                    span.char_end,
                    span.chunk_index,
                    span.token_count,
                )
                .with_embedding(embedding),
            );
        }
    }

    debug!(document_id = %ctx.document.id, chunk_count = chunks.len(), "chunks embedded");
    ctx.embedded_chunks = chunks;

    machine.embed().map_err(|(_, guard)| map_guard_error("embed", &guard))
}

pub async fn persist_chunks(
    machine: IngestionMachine<(), Embedded>,
    deps: &PipelineDeps,
    ctx: &mut PipelineContext,
) -> Result<IngestionMachine<(), crate::state::Persisted>, AppError> {
    deps.chunks.delete_by_document(&ctx.document.id).await?;
    deps.chunks.save_batch(ctx.embedded_chunks.clone()).await?;

    machine.persist().map_err(|(_, guard)| map_guard_error("persist", &guard))
}
