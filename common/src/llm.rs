//! Provider-agnostic contracts shared by the RAG answerer and the
//! evaluation LLM judge/generator. Concrete
//! implementations (OpenAI-backed or otherwise) live in the crates that
//! need them; this crate only defines the seam.

use async_trait::async_trait;

use crate::error::AppError;

/// A single chat completion call: system prompt + user prompt in, text
/// out. Implementations map authentication and rate-limit failures to
/// `AppError::ExternalService` rather than panicking or retrying
/// internally (callers own their own retry policy).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, model: &str, system_prompt: &str, user_prompt: &str) -> Result<String, AppError>;
}

/// Batch-first embedding contract: implementations must
/// preserve input order in the returned vector.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut batch = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        batch
            .pop()
            .ok_or_else(|| AppError::external("embedding provider returned an empty batch"))
    }

    fn dimensions(&self) -> usize;
}
