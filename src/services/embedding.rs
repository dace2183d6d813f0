use anyhow::Result;
use async_trait::async_trait;

use super::tinfoil::{TinfoilClient, TinfoilConfig};

/// Output width of nomic-embed-text, the embedding model the pipeline pins.
pub const EMBEDDING_DIM: usize = 768;

/// Provider-agnostic embedding interface.
///
/// Ingestion and query logic depend only on this trait, so the hosted
/// provider can be swapped without touching storage or orchestration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts, one vector per input.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;
}

/// Embeddings from the Tinfoil embedding enclave (or its local stand-in).
pub struct TinfoilEmbeddingProvider {
    client: TinfoilClient,
}

impl TinfoilEmbeddingProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = TinfoilClient::new(TinfoilConfig::embeddings(api_key))?;
        Ok(Self { client })
    }

    pub fn with_client(client: TinfoilClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EmbeddingProvider for TinfoilEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.client.create_embeddings(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.client.create_embeddings(texts).await?)
    }

    fn model_name(&self) -> &str {
        &self.client.config().model
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}
