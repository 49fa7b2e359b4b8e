//! Embedding client: order-preserving batch embedding, with
//! authentication and rate-limit failures mapped to `ExternalService`.

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use common::{error::AppError, llm::EmbeddingClient};

pub struct OpenAiEmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: u32,
}

impl OpenAiEmbeddingClient {
    #[must_use]
    pub fn new(api_key: &str, model: String, dimensions: u32) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model,
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .dimensions(self.dimensions)
            .input(texts.to_vec())
            .build()
            .map_err(|e| AppError::external(format!("failed to build embedding request: {e}")))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| AppError::external(format!("embedding request failed: {e}")))?;

        if response.data.len() != texts.len() {
            return Err(AppError::external(format!(
                "embedding provider returned {} vectors for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }

        let mut indexed = response.data;
        indexed.sort_by_key(|d| d.index);
        Ok(indexed.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_reflects_configured_value() {
        let client = OpenAiEmbeddingClient::new("sk-test", "text-embedding-3-small".into(), 1536);
        assert_eq!(client.dimensions(), 1536);
    }
}
