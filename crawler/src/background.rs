//! `BackgroundCrawl`: fire-and-forget crawl execution, keyed
//! by crawl job id.

use std::sync::Arc;

use common::task_registry::TaskRegistry;

use crate::service::CrawlService;

pub struct BackgroundCrawl {
    service: Arc<CrawlService>,
    registry: TaskRegistry,
}

impl BackgroundCrawl {
    #[must_use]
    pub fn new(service: Arc<CrawlService>) -> Self {
        Self {
            service,
            registry: TaskRegistry::new(),
        }
    }

    pub fn trigger(&self, crawl_job_id: String) {
        let service = Arc::clone(&self.service);
        self.registry.trigger(crawl_job_id.clone(), async move {
            if let Err(err) = service.execute(&crawl_job_id).await {
                tracing::warn!(crawl_job_id = %crawl_job_id, error = %err, "crawl execution failed");
            }
        });
    }

    pub async fn wait_for_all(&self) {
        self.registry.wait_for_all().await;
    }
}
