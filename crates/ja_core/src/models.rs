use async_trait::async_trait;
use crate::types::cosine_similarity;
use crate::Result;

/// Text-similarity backend.
///
/// A model is built once per process and handed to callers by reference;
/// `shutdown` releases whatever the model holds before exit.
#[async_trait]
pub trait SimilarityModel: Send + Sync {
    fn name(&self) -> &str;

    /// Generate an embedding for a piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Similarity of two texts in `[0, 1]`. Identical texts score `1.0`.
    async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        if a == b {
            return Ok(1.0);
        }
        let left = self.embed(a).await?;
        let right = self.embed(b).await?;
        Ok(cosine_similarity(&left, &right))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
