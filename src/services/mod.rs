//! External collaborators
//!
//! - `Embedder`: turns a paragraph into a vector (HTTP service in production)
//! - `LanguageDetector`: tags a body with a language code
//!
//! Both are black boxes to the pipeline. Embedding failures never block the
//! textual record; detection never gates acceptance.

use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding service returned HTTP {0}")]
    Status(u16),

    #[error("Embedding service returned an empty vector")]
    EmptyEmbedding,
}

// ===== Embedding =====

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generates an embedding for one paragraph
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by an HTTP endpoint
///
/// Posts `{"input": "<text>"}` and expects `{"embedding": [..]}`.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { input: text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }

        let body: EmbedResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(ServiceError::EmptyEmbedding);
        }
        Ok(body.embedding)
    }
}

// ===== Language detection =====

/// A detected language code with a reliability flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub language: String,
    pub reliable: bool,
}

pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<Detection>;
}

/// Detector that never answers; records fall back to the platform language
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDetector;

impl LanguageDetector for NullDetector {
    fn detect(&self, _text: &str) -> Option<Detection> {
        None
    }
}
