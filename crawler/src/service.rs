//! Bounded breadth-first crawl execution.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use common::{
    domain::{CrawlJobStatus, Document, DiscoveredUrl, DiscoveredUrlStatus},
    error::AppError,
    ingestion_trigger::DocumentIngestionTrigger,
    storage::{CrawlJobRepository, DiscoveredUrlRepository, DocumentRepository},
};
use tracing::{info, warn};

use crate::link_discovery::LinkDiscoverer;

enum BfsOutcome {
    Completed,
    Cancelled,
}

pub struct CrawlService {
    crawl_jobs: Arc<dyn CrawlJobRepository>,
    documents: Arc<dyn DocumentRepository>,
    discovered_urls: Arc<dyn DiscoveredUrlRepository>,
    link_discoverer: Arc<LinkDiscoverer>,
    ingestion_trigger: Arc<dyn DocumentIngestionTrigger>,
}

impl CrawlService {
    #[must_use]
    pub fn new(
        crawl_jobs: Arc<dyn CrawlJobRepository>,
        documents: Arc<dyn DocumentRepository>,
        discovered_urls: Arc<dyn DiscoveredUrlRepository>,
        link_discoverer: Arc<LinkDiscoverer>,
        ingestion_trigger: Arc<dyn DocumentIngestionTrigger>,
    ) -> Self {
        Self {
            crawl_jobs,
            documents,
            discovered_urls,
            link_discoverer,
            ingestion_trigger,
        }
    }

    #[tracing::instrument(skip(self), fields(crawl_job_id))]
    pub async fn execute(&self, crawl_job_id: &str) -> Result<(), AppError> {
        let job = self.crawl_jobs.get(crawl_job_id).await?;
        let job = job.start()?;
        let job = self.crawl_jobs.update(job).await?;

        let outcome = self.run_bfs(job.clone()).await;

        let latest = self.crawl_jobs.get(&job.id).await?;
        if latest.is_terminal() {
            return Ok(());
        }

        match outcome {
            Ok(BfsOutcome::Completed) => {
                let completed = latest.complete()?;
                self.crawl_jobs.update(completed).await?;
            }
            Ok(BfsOutcome::Cancelled) => {}
            Err(err) => {
                warn!(crawl_job_id = %job.id, error = %err, "crawl job failed");
                let failed = latest.fail(err.to_string())?;
                self.crawl_jobs.update(failed).await?;
            }
        }
        Ok(())
    }

    async fn run_bfs(&self, mut job: common::domain::CrawlJob) -> Result<BfsOutcome, AppError> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();
        queue.push_back((job.seed_url.clone(), 0));

        let mut pages = 0u32;

        while let Some((url, depth)) = queue.pop_front() {
            if pages >= job.max_pages {
                break;
            }

            if self.crawl_jobs.get(&job.id).await?.status == CrawlJobStatus::Cancelled {
                info!(crawl_job_id = %job.id, "crawl job cancelled, stopping BFS");
                return Ok(BfsOutcome::Cancelled);
            }

            if visited.contains(&url) {
                continue;
            }
            if depth > job.max_depth {
                continue;
            }
            visited.insert(url.clone());

            let existing = self
                .documents
                .get_by_notebook_and_url(&job.notebook_id, &url)
                .await?;
            if existing.is_some() {
                self.discovered_urls
                    .record(DiscoveredUrl::new(
                        job.id.clone(),
                        url.clone(),
                        depth,
                        DiscoveredUrlStatus::Skipped,
                        None,
                    ))
                    .await?;
                continue;
            }

            let document = self
                .documents
                .create(Document::new(job.notebook_id.clone(), url.clone()))
                .await?;
            self.ingestion_trigger.trigger(document.clone());
            self.discovered_urls
                .record(DiscoveredUrl::new(
                    job.id.clone(),
                    url.clone(),
                    depth,
                    DiscoveredUrlStatus::Ingested,
                    Some(document.id.clone()),
                ))
                .await?;

            pages += 1;
            job = job.with_counters(1, 1);
            self.crawl_jobs.update(job.clone()).await?;

            if pages >= job.max_pages {
                break;
            }

            if depth < job.max_depth {
                match self
                    .link_discoverer
                    .discover_links(
                        &url,
                        &job.domain,
                        job.url_include_pattern.as_deref(),
                        job.url_exclude_pattern.as_deref(),
                    )
                    .await
                {
                    Ok(links) => {
                        for link in links {
                            if !visited.contains(&link.url) {
                                queue.push_back((link.url, depth + 1));
                            }
                        }
                    }
                    Err(err) => {
                        warn!(url = %url, error = %err, "link discovery failed, continuing BFS");
                    }
                }
            }
        }

        Ok(BfsOutcome::Completed)
    }
}
