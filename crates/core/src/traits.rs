use crate::error::{GenerationError, IndexError, IngestError};
use crate::models::{GenerationOptions, Segment};
use async_trait::async_trait;
use std::path::Path;

pub trait DocumentParser {
    fn parse(&self, path: &Path) -> Result<Vec<Segment>, IngestError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Embeds every text in one request; output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| IndexError::Embedding {
            backend: self.name().to_string(),
            details: "no vector returned for query".to_string(),
        })
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;
}
