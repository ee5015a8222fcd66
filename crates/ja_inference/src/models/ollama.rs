use std::fmt;
use std::time::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use ja_core::{Error, Result};
use super::SimilarityModel;

pub const DEFAULT_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embeddings served by a local Ollama instance.
pub struct OllamaModel {
    client: Client,
    base_url: String,
    model_name: String,
}

impl fmt::Debug for OllamaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaModel")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OllamaModel {
    /// Connects and loads the model with one warm-up request, so a missing
    /// server or model fails here rather than halfway through a run.
    pub async fn new(
        base_url: Option<String>,
        model_name: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Inference(format!("Failed to build HTTP client: {}", e)))?;

        let model = Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model_name: model_name.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        model.embed("warm up").await?;
        Ok(model)
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait::async_trait]
impl SimilarityModel for OllamaModel {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model_name,
            prompt: text,
        };

        let response = self.client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Inference(format!(
                "Embedding request to {} returned {}",
                self.base_url, status
            )));
        }

        let body = response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::Inference(format!("Malformed embedding response: {}", e)))?;

        if body.embedding.is_empty() {
            return Err(Error::Inference(format!(
                "Model '{}' returned an empty embedding",
                self.model_name
            )));
        }

        Ok(body.embedding)
    }
}
