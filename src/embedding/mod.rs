//! Embedding client abstraction and adapters.
//!
//! The production adapter calls a feature-extraction endpoint that returns the model's final
//! hidden states for every token; those are mean-pooled here into one document vector. Text is
//! truncated to the configured token budget before it leaves the process.

mod tokenizer;

pub use tokenizer::TokenTruncator;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Tokenizer resources could not be loaded.
    #[error("Failed to initialize tokenizer for model '{model}': {reason}")]
    Tokenizer {
        /// Model we attempted to resolve.
        model: String,
        /// Underlying failure.
        reason: String,
    },
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Embedding endpoint responded with an unexpected status code.
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the endpoint.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Produced vector length differs from the index schema.
    #[error("Embedding has {actual} dimensions, index expects {expected}")]
    DimensionMismatch {
        /// Dimension declared in configuration.
        expected: usize,
        /// Dimension returned by the model.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one fixed-length vector for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;

    /// Length of every vector this client returns.
    fn dimension(&self) -> usize;
}

/// Average per-token hidden states into a single vector.
///
/// Returns `None` for an empty matrix or rows of unequal width.
pub fn mean_pool(hidden_states: &[Vec<f32>]) -> Option<Vec<f32>> {
    let width = hidden_states.first()?.len();
    if width == 0 || hidden_states.iter().any(|row| row.len() != width) {
        return None;
    }

    let mut pooled = vec![0.0_f32; width];
    for row in hidden_states {
        for (sum, value) in pooled.iter_mut().zip(row) {
            *sum += value;
        }
    }
    let count = hidden_states.len() as f32;
    for value in &mut pooled {
        *value /= count;
    }
    Some(pooled)
}

/// Remote model exposing a feature-extraction pipeline.
pub struct FeatureExtractionClient {
    http: Client,
    url: String,
    api_key: Option<String>,
    dimension: usize,
    truncator: TokenTruncator,
}

impl FeatureExtractionClient {
    /// Build a client for `url`, truncating inputs with the tokenizer resolved for `model`.
    pub fn new(
        url: String,
        api_key: Option<String>,
        model: &str,
        dimension: usize,
        max_tokens: usize,
    ) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder().user_agent("docsearch/embedding").build()?;
        let truncator = TokenTruncator::for_model(model, max_tokens)?;
        Ok(Self {
            http,
            url,
            api_key,
            dimension,
            truncator,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Batch(Vec<Vec<Vec<f32>>>),
    Tokens(Vec<Vec<f32>>),
    Pooled(Vec<f32>),
}

#[async_trait]
impl EmbeddingClient for FeatureExtractionClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let input = self.truncator.truncate(text);
        let mut request = self.http.post(&self.url).json(&json!({
            "inputs": input,
            "options": { "wait_for_model": true },
        }));
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, url = %self.url, "Embedding request failed");
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let vector = match response.json::<FeatureExtractionResponse>().await? {
            FeatureExtractionResponse::Batch(mut batch) => {
                if batch.is_empty() {
                    None
                } else {
                    mean_pool(&batch.swap_remove(0))
                }
            }
            FeatureExtractionResponse::Tokens(tokens) => mean_pool(&tokens),
            FeatureExtractionResponse::Pooled(vector) => Some(vector).filter(|v| !v.is_empty()),
        }
        .ok_or_else(|| {
            EmbeddingClientError::GenerationFailed("model returned no hidden states".into())
        })?;

        if vector.len() != self.dimension {
            return Err(EmbeddingClientError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic byte-hashing embedder for runs without a model endpoint.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    /// Construct a client producing vectors of length `dimension`.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            embedding[idx % dimension] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self::encode(text, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Build an embedding client suitable for the current configuration.
pub fn get_embedding_client(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.provider,
        model = %config.model,
        dimension = config.dimension,
        max_tokens = config.max_tokens,
        "Building embedding client"
    );
    match config.provider {
        EmbeddingProvider::Hash => Ok(Box::new(HashEmbeddingClient::new(config.dimension))),
        EmbeddingProvider::FeatureExtraction => {
            let url = config.url.clone().ok_or_else(|| {
                EmbeddingClientError::GenerationFailed("EMBEDDING_URL is not set".into())
            })?;
            Ok(Box::new(FeatureExtractionClient::new(
                url,
                config.api_key.clone(),
                &config.model,
                config.dimension,
                config.max_tokens,
            )?))
        }
    }
}
