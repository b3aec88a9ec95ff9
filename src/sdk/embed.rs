use crate::Result;
use crate::transport::rest::RestClient;
use async_trait::async_trait;

/// Source of query embeddings for the matching game.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, input: &str) -> Result<Vec<f32>>;
}

/// Embeddings from the `OpenAI` REST endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiEmbedder {
    client: RestClient,
    model: String,
}

impl OpenAiEmbedder {
    #[must_use]
    pub fn new(client: RestClient, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, input: &str) -> Result<Vec<f32>> {
        self.client.create_embedding(&self.model, input).await
    }
}
