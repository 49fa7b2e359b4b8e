use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, ids::new_id};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrawlJobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

/// Bounded breadth-first crawl of a seed URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlJob {
    pub id: String,
    pub notebook_id: String,
    pub seed_url: String,
    pub domain: String,
    pub max_depth: u32,
    pub max_pages: u32,
    pub url_include_pattern: Option<String>,
    pub url_exclude_pattern: Option<String>,
    pub status: CrawlJobStatus,
    pub total_discovered: u32,
    pub total_ingested: u32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CrawlJob {
    /// Builds a new `PENDING` crawl job. `max_depth` and `max_pages` are
    /// clamped to `>= 1`.
    #[must_use]
    pub fn new(
        notebook_id: String,
        seed_url: String,
        domain: String,
        max_depth: u32,
        max_pages: u32,
        url_include_pattern: Option<String>,
        url_exclude_pattern: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            notebook_id,
            seed_url,
            domain,
            max_depth: max_depth.max(1),
            max_pages: max_pages.max(1),
            url_include_pattern,
            url_exclude_pattern,
            status: CrawlJobStatus::Pending,
            total_discovered: 0,
            total_ingested: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            CrawlJobStatus::Completed | CrawlJobStatus::Failed | CrawlJobStatus::Cancelled
        )
    }

    /// `PENDING -> IN_PROGRESS`.
    pub fn start(&self) -> Result<Self, AppError> {
        self.require(CrawlJobStatus::Pending, CrawlJobStatus::InProgress)
    }

    /// `IN_PROGRESS -> COMPLETED`.
    pub fn complete(&self) -> Result<Self, AppError> {
        self.require(CrawlJobStatus::InProgress, CrawlJobStatus::Completed)
    }

    /// `IN_PROGRESS -> FAILED(message)`.
    pub fn fail(&self, message: String) -> Result<Self, AppError> {
        let mut next = self.require(CrawlJobStatus::InProgress, CrawlJobStatus::Failed)?;
        next.error_message = Some(message);
        Ok(next)
    }

    /// `{PENDING, IN_PROGRESS} -> CANCELLED`. Terminal states reject
    /// further transitions.
    pub fn cancel(&self) -> Result<Self, AppError> {
        if self.is_terminal() {
            return Err(AppError::invalid_state(format!(
                "crawl job {} is already terminal ({:?}); cannot cancel",
                self.id, self.status
            )));
        }
        let mut next = self.clone();
        next.status = CrawlJobStatus::Cancelled;
        next.updated_at = Utc::now();
        Ok(next)
    }

    #[must_use]
    pub fn with_counters(&self, discovered_delta: u32, ingested_delta: u32) -> Self {
        let mut next = self.clone();
        next.total_discovered = next.total_discovered.saturating_add(discovered_delta);
        next.total_ingested = next.total_ingested.saturating_add(ingested_delta);
        next.updated_at = Utc::now();
        next
    }

    fn require(&self, expected: CrawlJobStatus, next: CrawlJobStatus) -> Result<Self, AppError> {
        if self.status != expected {
            return Err(AppError::invalid_state(format!(
                "crawl job {} cannot move from {:?} to {:?}; expected {:?}",
                self.id, self.status, next, expected
            )));
        }
        let mut copy = self.clone();
        copy.status = next;
        copy.updated_at = Utc::now();
        Ok(copy)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscoveredUrlStatus {
    Pending,
    Ingested,
    Skipped,
    Failed,
}

/// Per-(crawl job, url) record of what the BFS saw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveredUrl {
    pub crawl_job_id: String,
    pub url: String,
    pub depth: u32,
    pub status: DiscoveredUrlStatus,
    pub document_id: Option<String>,
}

impl DiscoveredUrl {
    #[must_use]
    pub fn new(
        crawl_job_id: String,
        url: String,
        depth: u32,
        status: DiscoveredUrlStatus,
        document_id: Option<String>,
    ) -> Self {
        Self {
            crawl_job_id,
            url,
            depth,
            status,
            document_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_from_pending_or_in_progress_succeeds() {
        let job = CrawlJob::new("nb".into(), "https://a".into(), "a".into(), 1, 10, None, None);
        assert!(job.cancel().is_ok());
        let started = job.start().expect("start");
        assert!(started.cancel().is_ok());
    }

    #[test]
    fn cancel_from_terminal_state_is_rejected() {
        let job = CrawlJob::new("nb".into(), "https://a".into(), "a".into(), 1, 10, None, None)
            .start()
            .expect("start")
            .complete()
            .expect("complete");
        assert!(job.cancel().is_err());
    }
}
