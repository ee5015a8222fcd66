use std::time::Duration;

pub mod embeddings;
pub mod grouping;
pub mod models;
pub mod resume;
mod tokens;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct Config {
    /// `bow` (local) or `ollama`
    pub model: String,
    /// Backend-specific model identifier, e.g. `nomic-embed-text` for ollama
    pub model_name: Option<String>,
    pub model_url: Option<String>,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "bow".to_string(),
            model_name: None,
            model_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

pub mod prelude {
    pub use super::Config;
    pub use super::grouping::{SimilarityGroup, SimilarityGrouper};
    pub use super::models::create_model;
    pub use ja_core::{JobPosting, Result, Error, SimilarityModel};
}

pub use grouping::{RankedPosting, ScoredPair, SimilarityGroup, SimilarityGrouper};
pub use models::create_model;
pub use resume::{match_resume, ResumeMatch};
