use std::fmt;
use ja_core::Result;
use super::SimilarityModel;
use crate::tokens::content_words;

pub const DEFAULT_DIMENSIONS: usize = 768;

/// Local model: term frequencies of content words, feature-hashed into a
/// fixed-width vector. Deterministic across runs and platforms.
pub struct BagOfWordsModel {
    dimensions: usize,
}

impl fmt::Debug for BagOfWordsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BagOfWordsModel")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl BagOfWordsModel {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bucket(&self, word: &str) -> usize {
        // 64-bit FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for BagOfWordsModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SimilarityModel for BagOfWordsModel {
    fn name(&self) -> &str {
        "bag-of-words"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0; self.dimensions];
        for word in content_words(text) {
            embedding[self.bucket(&word)] += 1.0;
        }
        Ok(embedding)
    }
}
