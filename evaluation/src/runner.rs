use std::collections::HashMap;
use std::sync::Arc;

use common::{
    domain::{
        AggregateMetrics, ClaimAssessment, ClaimVerdict, Difficulty, EvaluationDataset, EvaluationRun,
        EvaluationType, TestCaseResult,
    },
    error::AppError,
    storage::EvaluationRepository,
};
use metrics_lib::{average_precision_at_k, hit_at_k, ndcg_at_k, precision_at_k, reciprocal_rank_at_k, recall_at_k};
use retrieval::{RagAnswerer, RetrievalService, RetrievedChunk};
use tracing::error;

use crate::judge::LlmJudge;

pub struct EvaluationRunner {
    retrieval: Arc<RetrievalService>,
    answerer: Arc<RagAnswerer>,
    judge: Arc<LlmJudge>,
    evaluations: Arc<dyn EvaluationRepository>,
}

impl EvaluationRunner {
    #[must_use]
    pub fn new(
        retrieval: Arc<RetrievalService>,
        answerer: Arc<RagAnswerer>,
        judge: Arc<LlmJudge>,
        evaluations: Arc<dyn EvaluationRepository>,
    ) -> Self {
        Self {
            retrieval,
            answerer,
            judge,
            evaluations,
        }
    }

    /// Executes every test case in `dataset` through retrieval (and, for
    /// `FullRag`, the answerer and judge), aggregates metrics, and persists
    /// the terminal run. Any mid-run error transitions the run to `Failed`
    /// with whatever partial results were already computed rather than
    /// propagating.
    #[tracing::instrument(skip(self, dataset))]
    pub async fn run(
        &self,
        dataset: &EvaluationDataset,
        k: usize,
        evaluation_type: EvaluationType,
    ) -> Result<EvaluationRun, AppError> {
        let run = EvaluationRun::new(dataset.id.clone(), k, evaluation_type);
        let run = self.evaluations.create_run(run).await?;
        let run = run.start()?;
        let run = self.evaluations.update_run(run).await?;

        let mut results = Vec::with_capacity(dataset.test_cases.len());
        let mut failure = None;

        for test_case in &dataset.test_cases {
            match self.evaluate_one(dataset, test_case, k, evaluation_type).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    error!(test_case_id = %test_case.id, error = %err, "evaluation run failed");
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = failure {
            let failed = run.fail(err.to_string(), results)?;
            return self.evaluations.update_run(failed).await;
        }

        let metrics = aggregate(&results);
        let difficulty_breakdown = difficulty_breakdown(dataset, &results);
        let completed = run.complete(results, metrics, difficulty_breakdown)?;
        self.evaluations.update_run(completed).await
    }

    async fn evaluate_one(
        &self,
        dataset: &EvaluationDataset,
        test_case: &common::domain::TestCase,
        k: usize,
        evaluation_type: EvaluationType,
    ) -> Result<TestCaseResult, AppError> {
        let retrieved = self
            .retrieval
            .retrieve(&dataset.notebook_id, &test_case.question, k)
            .await?;

        let retrieved_ids: Vec<String> = retrieved.iter().map(|hit| hit.chunk.id.clone()).collect();
        let retrieved_scores: Vec<f32> = retrieved.iter().map(|hit| hit.score).collect();
        let relevant: std::collections::HashSet<String> =
            test_case.ground_truth_chunk_ids.iter().cloned().collect();

        let precision = precision_at_k(&retrieved_ids, &relevant, k);
        let recall = recall_at_k(&retrieved_ids, &relevant, k);
        let hit = hit_at_k(&retrieved_ids, &relevant, k);
        let reciprocal_rank = reciprocal_rank_at_k(&retrieved_ids, &relevant, k);
        let ndcg = ndcg_at_k(&retrieved_ids, &relevant, k);
        let map_score = average_precision_at_k(&retrieved_ids, &relevant, k);

        let mut result = TestCaseResult {
            test_case_id: test_case.id.clone(),
            retrieved_chunk_ids: retrieved_ids,
            retrieved_scores,
            precision,
            recall,
            hit,
            reciprocal_rank,
            ndcg,
            map_score,
            generated_answer: None,
            faithfulness: None,
            answer_relevancy: None,
            citation_precision: None,
            citation_recall: None,
            claims: Vec::new(),
        };

        if evaluation_type == EvaluationType::FullRag {
            self.score_with_judge(&test_case.question, &retrieved, &mut result).await?;
        }

        Ok(result)
    }

    async fn score_with_judge(
        &self,
        question: &str,
        retrieved: &[RetrievedChunk],
        result: &mut TestCaseResult,
    ) -> Result<(), AppError> {
        let answer = self.answerer.answer(question, retrieved, None).await?;

        let faithfulness = self.judge.score_faithfulness(question, &answer.answer_text, retrieved).await;
        let answer_relevancy = self.judge.score_answer_relevancy(question, &answer.answer_text).await;
        let claims = self.judge.analyze_claims(question, &answer.answer_text, retrieved).await;

        let citation_precision = if answer.citations.is_empty() {
            None
        } else {
            let by_id: HashMap<&str, &RetrievedChunk> =
                retrieved.iter().map(|hit| (hit.chunk.id.as_str(), hit)).collect();
            let mut scores = Vec::with_capacity(answer.citations.len());
            for citation in &answer.citations {
                if let Some(hit) = by_id.get(citation.chunk_id.as_str()) {
                    scores.push(
                        self.judge
                            .score_citation_support(&answer.answer_text, &hit.chunk.content)
                            .await,
                    );
                }
            }
            mean(&scores)
        };

        let citation_recall = grounded_claim_ratio(&claims);

        result.generated_answer = Some(answer.answer_text);
        result.faithfulness = Some(faithfulness);
        result.answer_relevancy = Some(answer_relevancy);
        result.citation_precision = citation_precision;
        result.citation_recall = citation_recall;
        result.claims = claims;

        Ok(())
    }
}

/// Fraction of decomposed claims classified `Supported` or
/// `PartiallySupported`. Used as a proxy for citation recall: how much of
/// the answer's content is recoverable from the cited sources.
fn grounded_claim_ratio(claims: &[ClaimAssessment]) -> Option<f64> {
    if claims.is_empty() {
        return None;
    }
    let grounded = claims
        .iter()
        .filter(|claim| matches!(claim.verdict, ClaimVerdict::Supported | ClaimVerdict::PartiallySupported))
        .count();
    Some(grounded as f64 / claims.len() as f64)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn mean_of_options(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let collected: Vec<f64> = values.flatten().collect();
    mean(&collected)
}

fn aggregate(results: &[TestCaseResult]) -> AggregateMetrics {
    if results.is_empty() {
        return AggregateMetrics::default();
    }
    let n = results.len() as f64;

    let precision = results.iter().map(|r| r.precision).sum::<f64>() / n;
    let recall = results.iter().map(|r| r.recall).sum::<f64>() / n;
    let hit_rate = results.iter().filter(|r| r.hit).count() as f64 / n;
    let mrr = results.iter().map(|r| r.reciprocal_rank).sum::<f64>() / n;
    let ndcg = results.iter().map(|r| r.ndcg).sum::<f64>() / n;
    let map = results.iter().map(|r| r.map_score).sum::<f64>() / n;

    let faithfulness = mean_of_options(results.iter().map(|r| r.faithfulness));
    let answer_relevancy = mean_of_options(results.iter().map(|r| r.answer_relevancy));
    let citation_precision = mean_of_options(results.iter().map(|r| r.citation_precision));
    let citation_recall = mean_of_options(results.iter().map(|r| r.citation_recall));

    let all_claims: Vec<&ClaimAssessment> = results.iter().flat_map(|r| r.claims.iter()).collect();
    let hallucination_rate = if all_claims.is_empty() {
        None
    } else {
        let bad = all_claims
            .iter()
            .filter(|claim| matches!(claim.verdict, ClaimVerdict::Contradicted | ClaimVerdict::Fabricated))
            .count();
        Some(bad as f64 / all_claims.len() as f64)
    };

    AggregateMetrics {
        precision,
        recall,
        hit_rate,
        mrr,
        ndcg,
        map,
        faithfulness,
        answer_relevancy,
        citation_precision,
        citation_recall,
        hallucination_rate,
    }
}

/// Groups results by their test case's difficulty label, skipping `None`.
fn difficulty_breakdown(dataset: &EvaluationDataset, results: &[TestCaseResult]) -> Vec<(Difficulty, AggregateMetrics)> {
    let difficulty_by_id: HashMap<&str, Difficulty> = dataset
        .test_cases
        .iter()
        .filter_map(|tc| tc.difficulty.map(|difficulty| (tc.id.as_str(), difficulty)))
        .collect();

    let mut groups: Vec<(Difficulty, Vec<TestCaseResult>)> = Vec::new();
    for result in results {
        let Some(&difficulty) = difficulty_by_id.get(result.test_case_id.as_str()) else {
            continue;
        };
        match groups.iter_mut().find(|(existing, _)| *existing == difficulty) {
            Some((_, bucket)) => bucket.push(result.clone()),
            None => groups.push((difficulty, vec![result.clone()])),
        }
    }

    groups
        .into_iter()
        .map(|(difficulty, bucket)| (difficulty, aggregate(&bucket)))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCasePairComparison {
    pub test_case_id: String,
    pub baseline: TestCaseResult,
    pub candidate: TestCaseResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunComparison {
    pub dataset_id: String,
    pub k: usize,
    pub baseline_metrics: AggregateMetrics,
    pub candidate_metrics: AggregateMetrics,
    pub per_test_case: Vec<TestCasePairComparison>,
}

/// Compares two runs over the same dataset and `k`. Pairs results by
/// test case id; pairs missing from either run are dropped.
pub fn compare_runs(baseline: &EvaluationRun, candidate: &EvaluationRun) -> Result<RunComparison, AppError> {
    if baseline.dataset_id != candidate.dataset_id {
        return Err(AppError::validation("cannot compare runs from different datasets"));
    }
    if baseline.k != candidate.k {
        return Err(AppError::validation("cannot compare runs evaluated at different k"));
    }

    let candidate_by_id: HashMap<&str, &TestCaseResult> = candidate
        .results
        .iter()
        .map(|result| (result.test_case_id.as_str(), result))
        .collect();

    let per_test_case = baseline
        .results
        .iter()
        .filter_map(|baseline_result| {
            candidate_by_id
                .get(baseline_result.test_case_id.as_str())
                .map(|candidate_result| TestCasePairComparison {
                    test_case_id: baseline_result.test_case_id.clone(),
                    baseline: baseline_result.clone(),
                    candidate: (*candidate_result).clone(),
                })
        })
        .collect();

    Ok(RunComparison {
        dataset_id: baseline.dataset_id.clone(),
        k: baseline.k,
        baseline_metrics: baseline.metrics,
        candidate_metrics: candidate.metrics,
        per_test_case,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::{Difficulty, RunStatus, TestCase};

    fn test_case_result(id: &str, precision: f64) -> TestCaseResult {
        TestCaseResult {
            test_case_id: id.into(),
            retrieved_chunk_ids: Vec::new(),
            retrieved_scores: Vec::new(),
            precision,
            recall: precision,
            hit: precision > 0.0,
            reciprocal_rank: precision,
            ndcg: precision,
            map_score: precision,
            generated_answer: None,
            faithfulness: None,
            answer_relevancy: None,
            citation_precision: None,
            citation_recall: None,
            claims: Vec::new(),
        }
    }

    #[test]
    fn aggregate_of_empty_results_is_the_default() {
        let metrics = aggregate(&[]);
        assert_eq!(metrics, AggregateMetrics::default());
    }

    #[test]
    fn aggregate_averages_per_case_metrics() {
        let results = vec![test_case_result("a", 1.0), test_case_result("b", 0.0)];
        let metrics = aggregate(&results);
        assert!((metrics.precision - 0.5).abs() < 1e-9);
        assert!((metrics.hit_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn difficulty_breakdown_skips_cases_without_a_label() {
        let mut dataset = EvaluationDataset::new("nb".into(), "d".into(), 1, 10);
        let labeled = TestCase::new("q1".into(), vec!["c1".into()], "c1".into(), Some(Difficulty::Factual)).unwrap();
        let unlabeled = TestCase::new("q2".into(), vec!["c2".into()], "c2".into(), None).unwrap();
        dataset.test_cases = vec![labeled.clone(), unlabeled.clone()];

        let results = vec![test_case_result(&labeled.id, 1.0), test_case_result(&unlabeled.id, 0.0)];
        let breakdown = difficulty_breakdown(&dataset, &results);
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].0, Difficulty::Factual);
    }

    #[test]
    fn compare_runs_rejects_mismatched_dataset_or_k() {
        let mut a = EvaluationRun::new("ds-1".into(), 5, EvaluationType::RetrievalOnly);
        a.status = RunStatus::Completed;
        let mut b = EvaluationRun::new("ds-2".into(), 5, EvaluationType::RetrievalOnly);
        b.status = RunStatus::Completed;
        assert!(compare_runs(&a, &b).is_err());

        b.dataset_id = a.dataset_id.clone();
        b.k = 10;
        assert!(compare_runs(&a, &b).is_err());
    }

    #[test]
    fn compare_runs_pairs_results_by_test_case_id() {
        let mut baseline = EvaluationRun::new("ds".into(), 5, EvaluationType::RetrievalOnly);
        baseline.results = vec![test_case_result("shared", 1.0), test_case_result("only-baseline", 0.5)];
        let mut candidate = EvaluationRun::new("ds".into(), 5, EvaluationType::RetrievalOnly);
        candidate.results = vec![test_case_result("shared", 0.8)];

        let comparison = compare_runs(&baseline, &candidate).unwrap();
        assert_eq!(comparison.per_test_case.len(), 1);
        assert_eq!(comparison.per_test_case[0].test_case_id, "shared");
    }
}
