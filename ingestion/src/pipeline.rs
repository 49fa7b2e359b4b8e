use std::sync::Arc;

use common::{domain::Document, error::AppError};
use tracing::{error, info};

use crate::context::{PipelineContext, PipelineDeps};
use crate::stages::{chunk_content, embed_chunks, persist_chunks, prepare_content};
use crate::state::ready;

/// Drives a document through extraction, chunking, embedding, and
/// persistence. `process` always returns a terminal
/// document (`COMPLETED` or `FAILED`); only a failure to persist that
/// terminal state itself propagates as `Err`.
pub struct IngestionPipeline {
    deps: Arc<PipelineDeps>,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(deps: Arc<PipelineDeps>) -> Self {
        Self { deps }
    }

    #[tracing::instrument(skip(self), fields(document_id = %document.id))]
    pub async fn process(&self, document: Document) -> Result<Document, AppError> {
        let processing = document.start_processing()?;
        let processing = self.deps.documents.update(processing).await?;

        let mut ctx = PipelineContext::new(processing);
        let machine = ready();

        let outcome = self.drive(machine, &mut ctx).await;

        match outcome {
            Ok(()) => {
                let title = ctx.extracted.as_ref().and_then(|e| e.title.clone());
                let content_hash = ctx
                    .extracted
                    .as_ref()
                    .map(|e| e.content_hash.clone())
                    .unwrap_or_default();
                let completed = ctx.document.complete(title, content_hash)?;
                let completed = self.deps.documents.update(completed).await?;
                info!(document_id = %completed.id, "document ingestion completed");
                Ok(completed)
            }
            Err(err) => {
                error!(document_id = %ctx.document.id, error = %err, "document ingestion failed");
                let failed = ctx.document.fail(err.to_string())?;
                let failed = self.deps.documents.update(failed).await?;
                Ok(failed)
            }
        }
    }

    async fn drive(
        &self,
        machine: crate::state::IngestionMachine<(), crate::state::Ready>,
        ctx: &mut PipelineContext,
    ) -> Result<(), AppError> {
        let machine = prepare_content(machine, &self.deps, ctx).await?;
        let machine = chunk_content(machine, &self.deps, ctx).await?;
        let machine = embed_chunks(machine, &self.deps, ctx).await?;
        let _machine = persist_chunks(machine, &self.deps, ctx).await?;
        Ok(())
    }
}
