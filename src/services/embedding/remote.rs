//! HTTP adapter for the sentence embedding service.
//!
//! Speaks the common embeddings endpoint shape: `POST /embeddings` with
//! `{model, input: [..]}` and a `{data: [{embedding: [..]}]}` response.
//! Requests are chunked by the configured batch size.

use crate::config::EmbedderConfig;
use crate::services::embedding::Embedder;
use crate::{Result, error::AuditError};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Embedding service client.
pub struct RemoteEmbedder {
    client: Client,
    config: EmbedderConfig,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    /// Create a client from configuration.
    pub fn from_config(config: &EmbedderConfig) -> Result<Self> {
        crate::config::validator::validate_base_url("embedder.base_url", &config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AuditError::embedder_api(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request_body = json!({
            "model": self.config.model,
            "input": texts,
        });

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuditError::embedder_api(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuditError::embedder_api(format!(
                "Service error {}: {}",
                status, text
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| AuditError::embedder_api(format!("Invalid response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(AuditError::embedder_api(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|r| r.embedding).collect())
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let batch_size = self.config.batch_size.max(1);
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(batch_size) {
            let embeddings = self.encode_batch(chunk).await?;
            all.extend(embeddings);
        }
        debug!("[RemoteEmbedder] encoded {} texts", all.len());
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn test_config(base_url: &str, batch_size: usize) -> EmbedderConfig {
        EmbedderConfig {
            api_key: None,
            base_url: base_url.to_string(),
            model: "test-model".to_string(),
            batch_size,
            request_timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_encode_batches_by_configured_size() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(|req: &Request| {
                let body: serde_json::Value = req.body_json().unwrap();
                let inputs = body["input"].as_array().unwrap();
                let data: Vec<serde_json::Value> = inputs
                    .iter()
                    .map(|_| serde_json::json!({"embedding": [1.0, 0.0, 0.0]}))
                    .collect();
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data }))
            })
            .expect(3)
            .mount(&server)
            .await;

        let embedder = RemoteEmbedder::from_config(&test_config(&server.uri(), 2)).unwrap();
        let texts: Vec<String> = (0..5).map(|i| format!("text {}", i)).collect();
        let embeddings = embedder.encode(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 5);
        assert_eq!(embeddings[0], vec![1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_encode_empty_input_skips_request() {
        let server = MockServer::start().await;
        let embedder = RemoteEmbedder::from_config(&test_config(&server.uri(), 8)).unwrap();
        let embeddings = embedder.encode(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }

    #[tokio::test]
    async fn test_count_mismatch_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": []
            })))
            .mount(&server)
            .await;

        let embedder = RemoteEmbedder::from_config(&test_config(&server.uri(), 8)).unwrap();
        let result = embedder.encode(&["one".to_string()]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_service_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let embedder = RemoteEmbedder::from_config(&test_config(&server.uri(), 8)).unwrap();
        let result = embedder.encode(&["one".to_string()]).await;
        assert!(matches!(result, Err(AuditError::Api { .. })));
    }
}
