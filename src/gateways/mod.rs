//! External gateway seams: embedding and structured extraction.
//!
//! Both gateways are network collaborators behind async traits so the
//! construction pipeline and retrieval flows can be exercised against
//! deterministic in-memory implementations in tests.

pub mod openai;
pub mod schemas;

pub use openai::{OpenAiEmbedder, OpenAiExtractor};

use crate::error::{PaperkgError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Produces a fixed-length vector for a text string. A single deployment is
/// expected to use one consistent model; distance comparisons assume so.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Text-generation service constrained to produce schema-conformant JSON.
/// `schema` is a JSON-schema document; the returned value is the raw parsed
/// JSON, validated against the schema by the provider.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<Value>;
}

/// Call the extractor and deserialize the result into a typed schema struct.
/// A response that fails to deserialize counts as a gateway failure.
pub async fn generate_typed<T, X>(
    extractor: &X,
    prompt: &str,
    schema_name: &str,
    schema: Value,
) -> Result<T>
where
    T: DeserializeOwned,
    X: Extractor + ?Sized,
{
    let value = extractor
        .generate_structured(prompt, schema_name, schema)
        .await?;
    serde_json::from_value(value).map_err(|e| {
        PaperkgError::Extraction(format!(
            "Response did not conform to schema {}: {}",
            schema_name, e
        ))
    })
}
