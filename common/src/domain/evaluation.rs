use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, ids::new_id};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationDataset {
    pub id: String,
    pub notebook_id: String,
    pub name: String,
    pub status: DatasetStatus,
    pub questions_per_chunk: usize,
    pub max_chunks_sample: usize,
    pub test_cases: Vec<TestCase>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvaluationDataset {
    #[must_use]
    pub fn new(
        notebook_id: String,
        name: String,
        questions_per_chunk: usize,
        max_chunks_sample: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            notebook_id,
            name,
            status: DatasetStatus::Pending,
            questions_per_chunk,
            max_chunks_sample,
            test_cases: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn start_generating(&self) -> Result<Self, AppError> {
        self.require(DatasetStatus::Pending, DatasetStatus::Generating)
    }

    pub fn complete(&self, test_cases: Vec<TestCase>) -> Result<Self, AppError> {
        let mut next = self.require(DatasetStatus::Generating, DatasetStatus::Completed)?;
        next.test_cases = test_cases;
        Ok(next)
    }

    pub fn fail(&self) -> Result<Self, AppError> {
        self.require(DatasetStatus::Generating, DatasetStatus::Failed)
    }

    fn require(&self, expected: DatasetStatus, next: DatasetStatus) -> Result<Self, AppError> {
        if self.status != expected {
            return Err(AppError::invalid_state(format!(
                "dataset {} cannot move from {:?} to {:?}; expected {:?}",
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
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Factual,
    Analytical,
    Inferential,
    Paraphrased,
    MultiHop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub id: String,
    pub question: String,
    pub ground_truth_chunk_ids: Vec<String>,
    pub source_chunk_id: String,
    pub difficulty: Option<Difficulty>,
}

impl TestCase {
    /// `ground_truth_chunk_ids` must be non-empty.
    pub fn new(
        question: String,
        ground_truth_chunk_ids: Vec<String>,
        source_chunk_id: String,
        difficulty: Option<Difficulty>,
    ) -> Result<Self, AppError> {
        if ground_truth_chunk_ids.is_empty() {
            return Err(AppError::validation(
                "a test case needs at least one ground-truth chunk id",
            ));
        }
        Ok(Self {
            id: new_id(),
            question,
            ground_truth_chunk_ids,
            source_chunk_id,
            difficulty,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationType {
    RetrievalOnly,
    FullRag,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct AggregateMetrics {
    pub precision: f64,
    pub recall: f64,
    pub hit_rate: f64,
    pub mrr: f64,
    pub ndcg: f64,
    pub map: f64,
    pub faithfulness: Option<f64>,
    pub answer_relevancy: Option<f64>,
    pub citation_precision: Option<f64>,
    pub citation_recall: Option<f64>,
    pub hallucination_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRun {
    pub id: String,
    pub dataset_id: String,
    pub status: RunStatus,
    pub k: usize,
    pub evaluation_type: EvaluationType,
    pub metrics: AggregateMetrics,
    pub difficulty_breakdown: Vec<(Difficulty, AggregateMetrics)>,
    pub error_message: Option<String>,
    pub results: Vec<TestCaseResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvaluationRun {
    #[must_use]
    pub fn new(dataset_id: String, k: usize, evaluation_type: EvaluationType) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            dataset_id,
            status: RunStatus::Pending,
            k,
            evaluation_type,
            metrics: AggregateMetrics::default(),
            difficulty_breakdown: Vec::new(),
            error_message: None,
            results: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn start(&self) -> Result<Self, AppError> {
        self.require(RunStatus::Pending, RunStatus::Running)
    }

    /// Marks the run completed with its final aggregates. `results` is the
    /// full set of per-case results computed along the way.
    pub fn complete(
        &self,
        results: Vec<TestCaseResult>,
        metrics: AggregateMetrics,
        difficulty_breakdown: Vec<(Difficulty, AggregateMetrics)>,
    ) -> Result<Self, AppError> {
        let mut next = self.require(RunStatus::Running, RunStatus::Completed)?;
        next.results = results;
        next.metrics = metrics;
        next.difficulty_breakdown = difficulty_breakdown;
        Ok(next)
    }

    /// Any exception mid-run transitions to `FAILED` but keeps whatever
    /// partial results were already computed: the results are visible,
    /// `status != COMPLETED`.
    pub fn fail(&self, message: String, partial_results: Vec<TestCaseResult>) -> Result<Self, AppError> {
        let mut next = self.require(RunStatus::Running, RunStatus::Failed)?;
        next.error_message = Some(message);
        next.results = partial_results;
        Ok(next)
    }

    fn require(&self, expected: RunStatus, next: RunStatus) -> Result<Self, AppError> {
        if self.status != expected {
            return Err(AppError::invalid_state(format!(
                "evaluation run {} cannot move from {:?} to {:?}; expected {:?}",
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
#[serde(rename_all = "snake_case")]
pub enum ClaimVerdict {
    Supported,
    PartiallySupported,
    Contradicted,
    Fabricated,
    Unverifiable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimAssessment {
    pub claim: String,
    pub verdict: ClaimVerdict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCaseResult {
    pub test_case_id: String,
    pub retrieved_chunk_ids: Vec<String>,
    pub retrieved_scores: Vec<f32>,
    pub precision: f64,
    pub recall: f64,
    pub hit: bool,
    pub reciprocal_rank: f64,
    pub ndcg: f64,
    pub map_score: f64,
    pub generated_answer: Option<String>,
    pub faithfulness: Option<f64>,
    pub answer_relevancy: Option<f64>,
    pub citation_precision: Option<f64>,
    pub citation_recall: Option<f64>,
    pub claims: Vec<ClaimAssessment>,
}
