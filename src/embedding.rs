//! HTTP-backed embedding providers.
//!
//! Implements the core [`DenseEmbedder`] and [`SparseEmbedder`] traits
//! against an embedding inference service speaking a small JSON
//! protocol:
//!
//! - dense: `POST <url>` with `{"model": ..., "input": [...]}` →
//!   `{"embeddings": [[f32, ...], ...]}`
//! - sparse: `POST <url>` with the same request shape →
//!   `{"embeddings": [{"indices": [...], "values": [...]}, ...]}`
//!
//! Requests carry a bounded timeout from config. The providers do not
//! retry; a failed or malformed response surfaces as
//! [`PipelineError::Embedding`] and the caller decides what to do.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use corpuscle_core::embedding::{
    validate_dense_batch, validate_sparse_batch, DenseEmbedder, SparseEmbedder, SparseVector,
};
use corpuscle_core::error::{PipelineError, Result};

use crate::config::EmbeddingSettings;

/// Dense provider calling a remote inference endpoint.
pub struct HttpDenseEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
}

impl HttpDenseEmbedder {
    pub fn new(config: &EmbeddingSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.dense.url.clone(),
            model: config.dense.model.clone(),
            dims: config.dense.dims,
        })
    }
}

#[derive(Deserialize)]
struct DenseResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl DenseEmbedder for HttpDenseEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::embedding(format!("dense request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::embedding(format!(
                "dense endpoint returned {status}: {text}"
            )));
        }

        let parsed: DenseResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::embedding(format!("invalid dense response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(PipelineError::embedding(format!(
                "dense endpoint returned {} vectors for {} texts",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        validate_dense_batch(&parsed.embeddings, self.dims)?;
        Ok(parsed.embeddings)
    }
}

/// Sparse provider calling a remote inference endpoint.
pub struct HttpSparseEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl HttpSparseEmbedder {
    pub fn new(config: &EmbeddingSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.sparse.url.clone(),
            model: config.sparse.model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct SparseResponse {
    embeddings: Vec<SparseVector>,
}

#[async_trait]
impl SparseEmbedder for HttpSparseEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::embedding(format!("sparse request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::embedding(format!(
                "sparse endpoint returned {status}: {text}"
            )));
        }

        let parsed: SparseResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::embedding(format!("invalid sparse response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(PipelineError::embedding(format!(
                "sparse endpoint returned {} vectors for {} texts",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        validate_sparse_batch(&parsed.embeddings)?;
        Ok(parsed.embeddings)
    }
}
