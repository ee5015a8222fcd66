use std::collections::HashMap;
use ja_core::{cosine_similarity, JobPosting, Result, SimilarityModel};

/// Embeds posting descriptions, computing each distinct text only once.
pub struct EmbeddingGenerator<'m> {
    model: &'m dyn SimilarityModel,
    cache: HashMap<String, Vec<f32>>,
}

impl<'m> EmbeddingGenerator<'m> {
    pub fn new(model: &'m dyn SimilarityModel) -> Self {
        Self {
            model,
            cache: HashMap::new(),
        }
    }

    pub async fn generate_posting_embedding(&mut self, posting: &JobPosting) -> Result<Vec<f32>> {
        self.generate_text_embedding(&posting.description).await
    }

    pub async fn generate_text_embedding(&mut self, text: &str) -> Result<Vec<f32>> {
        if let Some(embedding) = self.cache.get(text) {
            return Ok(embedding.clone());
        }
        let embedding = self.model.embed(text).await?;
        self.cache.insert(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    /// Embeddings for every posting, in input order.
    pub async fn generate_all(&mut self, postings: &[JobPosting]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(postings.len());
        for posting in postings {
            embeddings.push(self.generate_posting_embedding(posting).await?);
        }
        Ok(embeddings)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Score two postings from precomputed embeddings; identical descriptions
/// always score `1.0`.
pub(crate) fn score(a: &JobPosting, ea: &[f32], b: &JobPosting, eb: &[f32]) -> f32 {
    if a.description == b.description {
        1.0
    } else {
        cosine_similarity(ea, eb)
    }
}
