pub mod chunk;
pub mod crawl_job;
pub mod document;
pub mod evaluation;
pub mod message;
pub mod notebook;

pub use chunk::Chunk;
pub use crawl_job::{CrawlJob, CrawlJobStatus, DiscoveredUrl, DiscoveredUrlStatus};
pub use document::{Document, DocumentStatus};
pub use evaluation::{
    AggregateMetrics, ClaimAssessment, ClaimVerdict, DatasetStatus, Difficulty, EvaluationDataset,
    EvaluationRun, EvaluationType, RunStatus, TestCase, TestCaseResult,
};
pub use message::{Message, MessageRole};
pub use notebook::Notebook;
