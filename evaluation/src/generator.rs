use std::sync::Arc;

use common::{
    domain::{Chunk, Difficulty, TestCase},
    error::AppError,
    llm::LlmClient,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::json::strip_markdown_code_block;

const SYSTEM_PROMPT: &str = "You are a test data generator for a retrieval evaluation system. \
Generate diverse, realistic questions that can be answered from the given passage. Questions must \
be self-contained (never reference \"the passage\" or \"the text\"), must not be yes/no questions, \
and should span factual, analytical, comparative, and explanatory types. Return valid JSON only.";

#[derive(Deserialize)]
struct QuestionsEnvelope {
    questions: Vec<Value>,
}

#[derive(Deserialize)]
struct QuestionObject {
    text: String,
    #[serde(default)]
    difficulty: Option<String>,
}

struct GeneratedQuestion {
    text: String,
    difficulty: Option<Difficulty>,
}

pub struct TestGenerator {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl TestGenerator {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, model: String) -> Self {
        Self { llm, model }
    }

    /// Samples up to `max_chunks_sample` chunks uniformly at random (seeded
    /// for reproducibility), prompts the LLM for `questions_per_chunk`
    /// questions per sampled chunk, and builds one `TestCase` per returned
    /// question.
    #[tracing::instrument(skip(self, chunks))]
    pub async fn generate(
        &self,
        chunks: &[Chunk],
        questions_per_chunk: usize,
        max_chunks_sample: usize,
        seed: u64,
    ) -> Result<Vec<TestCase>, AppError> {
        if chunks.is_empty() {
            return Err(AppError::validation("no chunks available to generate test cases from"));
        }

        let sampled = sample_chunks(chunks, max_chunks_sample, seed);
        let mut test_cases = Vec::new();

        for chunk in sampled {
            let questions = self.generate_questions(chunk, questions_per_chunk).await;
            for question in questions {
                match TestCase::new(
                    question.text,
                    vec![chunk.id.clone()],
                    chunk.id.clone(),
                    question.difficulty,
                ) {
                    Ok(test_case) => test_cases.push(test_case),
                    Err(err) => warn!(chunk_id = %chunk.id, error = %err, "skipping malformed test case"),
                }
            }
        }

        if test_cases.is_empty() {
            return Err(AppError::validation("failed to generate any test cases"));
        }
        Ok(test_cases)
    }

    async fn generate_questions(&self, chunk: &Chunk, count: usize) -> Vec<GeneratedQuestion> {
        let user_prompt = format!(
            "Based on the following passage, generate exactly {count} questions that can be \
answered using the information in this passage.\n\nPassage:\n{}\n\nReturn your response as a \
JSON object with this exact format: {{\"questions\": [\"question 1\", \"question 2\", ...]}} -- \
each entry may also be an object {{\"text\": \"...\", \"difficulty\": \"factual|analytical|\
inferential|paraphrased|multi_hop\"}}.",
            chunk.content
        );

        let output = match self.llm.chat(&self.model, SYSTEM_PROMPT, &user_prompt).await {
            Ok(output) => output,
            Err(err) => {
                warn!(chunk_id = %chunk.id, error = %err, "failed to generate questions for chunk");
                return Vec::new();
            }
        };

        parse_questions(&output, chunk)
    }
}

fn sample_chunks(chunks: &[Chunk], max_sample: usize, seed: u64) -> Vec<&Chunk> {
    if chunks.len() <= max_sample {
        return chunks.iter().collect();
    }
    let mut indices: Vec<usize> = (0..chunks.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices.truncate(max_sample);
    indices.into_iter().map(|index| &chunks[index]).collect()
}

fn parse_questions(output: &str, chunk: &Chunk) -> Vec<GeneratedQuestion> {
    let cleaned = strip_markdown_code_block(output);
    let envelope = match serde_json::from_str::<QuestionsEnvelope>(&cleaned) {
        Ok(envelope) => envelope,
        Err(_) => {
            warn!(chunk_id = %chunk.id, output = %truncate(output), "failed to parse LLM output as JSON");
            return Vec::new();
        }
    };

    envelope
        .questions
        .into_iter()
        .filter_map(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(GeneratedQuestion {
                text,
                difficulty: None,
            }),
            Value::Object(_) => {
                let object: QuestionObject = serde_json::from_value(value).ok()?;
                if object.text.trim().is_empty() {
                    return None;
                }
                Some(GeneratedQuestion {
                    text: object.text,
                    difficulty: object.difficulty.as_deref().and_then(parse_difficulty),
                })
            }
            _ => None,
        })
        .collect()
}

fn parse_difficulty(label: &str) -> Option<Difficulty> {
    match label.trim().to_lowercase().as_str() {
        "factual" => Some(Difficulty::Factual),
        "analytical" => Some(Difficulty::Analytical),
        "inferential" => Some(Difficulty::Inferential),
        "paraphrased" => Some(Difficulty::Paraphrased),
        "multi_hop" | "multi-hop" | "multihop" => Some(Difficulty::MultiHop),
        _ => None,
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(200).collect()
}
