use std::sync::Arc;
use ja_core::{Error, Result};
pub use ja_core::SimilarityModel;
use tracing::info;
use super::Config;

pub mod bag_of_words;
pub mod ollama;

pub use bag_of_words::BagOfWordsModel;
pub use ollama::OllamaModel;

pub const AVAILABLE_MODELS: &[&str] = &["bow", "ollama"];

/// Builds the process-wide similarity model.
///
/// The returned handle is meant to be created once at start-up, shared by
/// reference for the whole run and shut down explicitly before exit.
pub async fn create_model(config: Option<Config>) -> Result<Arc<dyn SimilarityModel>> {
    let config = config.unwrap_or_default();

    match config.model.to_lowercase().as_str() {
        "bow" | "bag-of-words" => {
            info!("🧠 Using local bag-of-words similarity model");
            Ok(Arc::new(BagOfWordsModel::new()))
        }
        "ollama" => {
            let model = OllamaModel::new(
                config.model_url,
                config.model_name,
                config.timeout,
            )
            .await?;
            info!("🧠 Ollama embeddings ready ({})", model.model_name());
            Ok(Arc::new(model))
        }
        other => Err(Error::Configuration(format!(
            "Unknown similarity model '{}'. Available models: {}",
            other,
            AVAILABLE_MODELS.join(", ")
        ))),
    }
}
