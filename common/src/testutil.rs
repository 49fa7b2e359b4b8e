//! Deterministic fakes for the provider seams, available to every crate
//! in this workspace under the `test-utils` feature so downstream test
//! suites don't each reinvent a stub embedder/LLM.

use std::collections::VecDeque;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::{error::AppError, llm::{EmbeddingClient, LlmClient}};

/// Hashes each input text into a fixed-dimension unit vector. Same text
/// always yields the same vector; different texts yield (with
/// overwhelming probability) different, non-parallel vectors, which is
/// enough to exercise cosine-similarity ranking in tests.
pub struct FakeEmbeddingClient {
    dimensions: usize,
}

impl FakeEmbeddingClient {
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for FakeEmbeddingClient {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl EmbeddingClient for FakeEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl FakeEmbeddingClient {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimensions);
        let mut seed = text.as_bytes().to_vec();
        while vector.len() < self.dimensions {
            let digest = Sha256::digest(&seed);
            for byte in &digest {
                if vector.len() == self.dimensions {
                    break;
                }
                vector.push((*byte as f32) / 255.0 - 0.5);
            }
            seed = digest.to_vec();
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

/// Returns pre-scripted responses in FIFO order, falling back to a fixed
/// default once exhausted. Lets a test script a judge's verdicts or a
/// generator's question batches without a network call.
pub struct FakeLlmClient {
    responses: Mutex<VecDeque<String>>,
    default_response: String,
}

impl FakeLlmClient {
    #[must_use]
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            default_response: String::new(),
        }
    }

    #[must_use]
    pub fn with_default(default_response: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_response: default_response.into(),
        }
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, _model: &str, _system_prompt: &str, _user_prompt: &str) -> Result<String, AppError> {
        let mut queue = self.responses.lock().await;
        Ok(queue.pop_front().unwrap_or_else(|| self.default_response.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_embedder_is_deterministic_and_order_preserving() {
        let embedder = FakeEmbeddingClient::new(8);
        let batch = embedder
            .embed_batch(&["alpha".into(), "beta".into()])
            .await
            .expect("embed batch");
        let again = embedder.embed("alpha").await.expect("embed single");
        assert_eq!(batch[0], again);
        assert_ne!(batch[0], batch[1]);
    }

    #[tokio::test]
    async fn fake_llm_returns_scripted_responses_then_default() {
        let client = FakeLlmClient::new(vec!["first".into(), "second".into()]);
        assert_eq!(client.chat("m", "s", "u").await.unwrap(), "first");
        assert_eq!(client.chat("m", "s", "u").await.unwrap(), "second");
        assert_eq!(client.chat("m", "s", "u").await.unwrap(), "");
    }
}
