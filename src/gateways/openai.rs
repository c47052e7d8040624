//! OpenAI-backed gateway implementations over reqwest, with retry and
//! exponential backoff on rate-limit and server errors.

use crate::cache::EmbeddingCache;
use crate::error::{PaperkgError, Result};
use crate::gateways::{Embedder, Extractor};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const MAX_RETRIES: usize = 3;

/// Request structure for the embeddings API
#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

/// Response structure from the embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding gateway client with an optional LRU cache for repeated texts.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    cache: Option<Arc<EmbeddingCache>>,
}

impl OpenAiEmbedder {
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// normal operation).
    pub fn new(api_key: String, model: String, cache: Option<Arc<EmbeddingCache>>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model,
            cache,
        }
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: vec![text.to_string()],
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PaperkgError::Embedding(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(PaperkgError::Embedding(format!(
                "Embedding API error {}: {}",
                status, body
            )));
        }

        let mut result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PaperkgError::Embedding(format!("Failed to parse response: {}", e)))?;

        if result.data.is_empty() {
            return Err(PaperkgError::Embedding(
                "Empty response from embedding API".to_string(),
            ));
        }
        Ok(result.data.remove(0).embedding)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(text) {
                log::debug!("Embedding cache hit ({} chars)", text.len());
                return Ok(cached);
            }
        }

        let embedding = with_retry(MAX_RETRIES, || self.embed_once(text)).await?;

        if let Some(cache) = &self.cache {
            cache.put(text.to_string(), embedding.clone());
        }

        Ok(embedding)
    }
}

/// Extraction gateway client: chat completions constrained to a JSON schema
/// via the structured-output response format.
pub struct OpenAiExtractor {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiExtractor {
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// normal operation).
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model,
        }
    }

    async fn generate_once(&self, prompt: &str, schema_name: &str, schema: &Value) -> Result<Value> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "strict": true,
                    "schema": schema,
                }
            }
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PaperkgError::Extraction(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(PaperkgError::Extraction(format!(
                "Extraction API error {}: {}",
                status, body
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| PaperkgError::Extraction(format!("Failed to parse response: {}", e)))?;

        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                PaperkgError::Extraction("Missing message content in response".to_string())
            })?;

        serde_json::from_str(content).map_err(|e| {
            PaperkgError::Extraction(format!("Response content is not valid JSON: {}", e))
        })
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value> {
        with_retry(MAX_RETRIES, || {
            self.generate_once(prompt, schema_name, &schema)
        })
        .await
    }
}

/// Retry a gateway call on rate-limit (429) and server (5xx) errors with
/// exponential backoff. Other errors return immediately.
async fn with_retry<T, F, Fut>(max_retries: usize, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start = std::time::Instant::now();
    let mut attempt = 0;
    let mut delay = Duration::from_secs(1);

    loop {
        match call().await {
            Ok(value) => {
                log::debug!(
                    "Gateway call took {:?} (attempt {})",
                    start.elapsed(),
                    attempt + 1
                );
                return Ok(value);
            }
            Err(e) if attempt < max_retries && is_retryable(&e) => {
                log::warn!("Retry {}/{} after error: {}", attempt + 1, max_retries, e);
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_retryable(e: &PaperkgError) -> bool {
    let msg = e.to_string();
    msg.contains("429")
        || msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("504")
}
