use std::sync::Arc;

use common::{
    domain::{ClaimAssessment, ClaimVerdict},
    error::AppError,
    llm::LlmClient,
};
use metrics_lib::clamp_unit;
use retrieval::RetrievedChunk;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::json::strip_markdown_code_block;

const FAITHFULNESS_SYSTEM_PROMPT: &str = "You are an evaluation agent that assesses whether a \
generated answer is grounded in the provided context chunks. Score faithfulness on a scale of 0.0 \
to 1.0: 1.0 fully grounded, 0.5 partially grounded, 0.0 contradicts or hallucinates. Return only \
valid JSON: {\"score\": <float>, \"reasoning\": \"<brief explanation>\"}";

const RELEVANCY_SYSTEM_PROMPT: &str = "You are an evaluation agent that assesses whether a \
generated answer is relevant to the question. Score answer relevancy on a scale of 0.0 to 1.0: 1.0 \
directly and completely addresses the question, 0.5 partially relevant, 0.0 does not address it. \
Return only valid JSON: {\"score\": <float>, \"reasoning\": \"<brief explanation>\"}";

const CITATION_SUPPORT_SYSTEM_PROMPT: &str = "You are an evaluation agent that assesses whether a \
cited source genuinely supports the claim it is cited for. Score citation support on a scale of \
0.0 to 1.0. Return only valid JSON: {\"score\": <float>, \"reasoning\": \"<brief explanation>\"}";

const HALLUCINATION_SYSTEM_PROMPT: &str = "You are an evaluation agent that performs claim-level \
hallucination analysis. Decompose the answer into atomic claims and verify each against the \
context. Classify each as \"supported\", \"partially_supported\", \"contradicted\", \"fabricated\", \
or \"unverifiable\". Return only valid JSON: {\"claims\": [{\"claim_text\": \"<text>\", \
\"verdict\": \"<verdict>\"}, ...]}";

#[derive(Deserialize)]
struct ScoreEnvelope {
    score: Value,
}

#[derive(Deserialize)]
struct ClaimsEnvelope {
    #[serde(default)]
    claims: Vec<ClaimEntry>,
}

#[derive(Deserialize)]
struct ClaimEntry {
    claim_text: String,
    verdict: String,
}

pub struct LlmJudge {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl LlmJudge {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, model: String) -> Self {
        Self { llm, model }
    }

    /// Scores how well `answer` is grounded in `context`; 0.0 on any LLM or
    /// parse failure rather than propagating (the LLM is untrusted input).
    pub async fn score_faithfulness(&self, question: &str, answer: &str, context: &[RetrievedChunk]) -> f64 {
        let prompt = format!(
            "Question: {question}\n\nGenerated Answer: {answer}\n\nContext Chunks:\n{}\n\nScore the \
faithfulness of the answer based on the context.",
            context_block(context)
        );
        self.run_score(FAITHFULNESS_SYSTEM_PROMPT, &prompt).await
    }

    pub async fn score_answer_relevancy(&self, question: &str, answer: &str) -> f64 {
        let prompt = format!(
            "Question: {question}\n\nGenerated Answer: {answer}\n\nScore the relevancy of the \
answer to the question."
        );
        self.run_score(RELEVANCY_SYSTEM_PROMPT, &prompt).await
    }

    pub async fn score_citation_support(&self, claim_with_citation: &str, cited_chunk_content: &str) -> f64 {
        let prompt = format!(
            "Claim: {claim_with_citation}\n\nCited Source Content: {cited_chunk_content}\n\nScore \
how well the cited source supports the claim."
        );
        self.run_score(CITATION_SUPPORT_SYSTEM_PROMPT, &prompt).await
    }

    /// Decomposes `answer` into atomic claims verified against `context`.
    /// Returns an empty list on any LLM or parse failure.
    pub async fn analyze_claims(&self, question: &str, answer: &str, context: &[RetrievedChunk]) -> Vec<ClaimAssessment> {
        let prompt = format!(
            "Question: {question}\n\nGenerated Answer: {answer}\n\nContext Chunks:\n{}\n\nDecompose \
the answer into atomic claims and verify each against the context.",
            context_block(context)
        );

        let output = match self.llm.chat(&self.model, HALLUCINATION_SYSTEM_PROMPT, &prompt).await {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "failed to analyze hallucinations");
                return Vec::new();
            }
        };

        parse_claims(&output)
    }

    async fn run_score(&self, system_prompt: &str, user_prompt: &str) -> f64 {
        match self.llm.chat(&self.model, system_prompt, user_prompt).await {
            Ok(output) => parse_score(&output),
            Err(err) => {
                warn!(error = %err, "failed to score judge prompt");
                0.0
            }
        }
    }
}

fn context_block(context: &[RetrievedChunk]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(index, hit)| format!("[{}] {}", index + 1, hit.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn parse_score(output: &str) -> f64 {
    let cleaned = strip_markdown_code_block(output);
    match serde_json::from_str::<ScoreEnvelope>(&cleaned) {
        Ok(envelope) => envelope.score.as_f64().map(clamp_unit).unwrap_or(0.0),
        Err(_) => {
            warn!(output = %truncate(output), "failed to parse judge score from output");
            0.0
        }
    }
}

fn parse_claims(output: &str) -> Vec<ClaimAssessment> {
    let cleaned = strip_markdown_code_block(output);
    match serde_json::from_str::<ClaimsEnvelope>(&cleaned) {
        Ok(envelope) => envelope
            .claims
            .into_iter()
            .filter_map(|entry| {
                parse_verdict(&entry.verdict).map(|verdict| ClaimAssessment {
                    claim: entry.claim_text,
                    verdict,
                })
            })
            .collect(),
        Err(_) => {
            warn!(output = %truncate(output), "failed to parse claims from output");
            Vec::new()
        }
    }
}

fn parse_verdict(label: &str) -> Option<ClaimVerdict> {
    match label.trim().to_lowercase().as_str() {
        "supported" => Some(ClaimVerdict::Supported),
        "partially_supported" => Some(ClaimVerdict::PartiallySupported),
        "contradicted" => Some(ClaimVerdict::Contradicted),
        "fabricated" => Some(ClaimVerdict::Fabricated),
        "unverifiable" => Some(ClaimVerdict::Unverifiable),
        _ => None,
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::domain::{Chunk, Document};

    struct ScriptedLlm {
        response: String,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat(&self, _model: &str, _system: &str, _user: &str) -> Result<String, AppError> {
            Ok(self.response.clone())
        }
    }

    fn retrieved(content: &str) -> RetrievedChunk {
        let document = Document::new("nb".into(), "https://example.com".into());
        let chunk = Chunk::new(document.id.clone(), content.into(), 0, content.len(), 0, 5);
        RetrievedChunk {
            chunk,
            document,
            score: 1.0,
        }
    }

    #[tokio::test]
    async fn clamps_out_of_range_scores_into_the_unit_interval() {
        let judge = LlmJudge::new(Arc::new(ScriptedLlm { response: "{\"score\": 1.8}".into() }), "gpt".into());
        assert_eq!(judge.score_answer_relevancy("q", "a").await, 1.0);
    }

    #[tokio::test]
    async fn unparseable_score_output_defaults_to_zero() {
        let judge = LlmJudge::new(Arc::new(ScriptedLlm { response: "garbage".into() }), "gpt".into());
        assert_eq!(judge.score_faithfulness("q", "a", &[retrieved("x")]).await, 0.0);
    }

    #[tokio::test]
    async fn fenced_claims_output_is_parsed_and_unknown_verdicts_are_dropped() {
        let response = "```json\n{\"claims\": [{\"claim_text\": \"a\", \"verdict\": \"supported\"}, {\"claim_text\": \"b\", \"verdict\": \"nonsense\"}]}\n```";
        let judge = LlmJudge::new(Arc::new(ScriptedLlm { response: response.into() }), "gpt".into());
        let claims = judge.analyze_claims("q", "a", &[retrieved("x")]).await;
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].verdict, ClaimVerdict::Supported);
    }
}
