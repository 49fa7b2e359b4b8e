//! `BackgroundIngestion`: at-most-once ingestion per
//! document id, driven fire-and-forget from the crawl service or a
//! direct source-upload call.

use std::sync::Arc;

use common::{domain::Document, ingestion_trigger::DocumentIngestionTrigger, task_registry::TaskRegistry};
use tracing::warn;

use crate::pipeline::IngestionPipeline;

pub struct BackgroundIngestion {
    pipeline: Arc<IngestionPipeline>,
    registry: TaskRegistry,
}

impl BackgroundIngestion {
    #[must_use]
    pub fn new(pipeline: Arc<IngestionPipeline>) -> Self {
        Self {
            pipeline,
            registry: TaskRegistry::new(),
        }
    }

    pub fn trigger(&self, document: Document) {
        let pipeline = Arc::clone(&self.pipeline);
        let document_id = document.id.clone();
        self.registry.trigger(document_id, async move {
            if let Err(err) = pipeline.process(document).await {
                warn!(error = %err, "ingestion pipeline task failed to persist its own terminal state");
            }
        });
    }

    pub async fn wait_for_all(&self) {
        self.registry.wait_for_all().await;
    }
}

impl DocumentIngestionTrigger for BackgroundIngestion {
    fn trigger(&self, document: Document) {
        BackgroundIngestion::trigger(self, document);
    }
}
