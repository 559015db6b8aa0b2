//! Optional LLM rebuttal classifier (Tier 3).
//!
//! Invoked only for complex cases where the exact and semantic tiers found
//! nothing convincing. Asks a chat-completion endpoint to judge whether
//! the agent used objection handling, expecting a strict JSON reply.

use crate::config::ClassifierConfig;
use crate::{Result, error::AuditError};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Verdict from the LLM classifier.
#[derive(Debug, Clone, Deserialize)]
pub struct RebuttalClassification {
    /// "Yes" or "No".
    pub result: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Free-form reasoning from the model.
    pub reasoning: String,
}

impl RebuttalClassification {
    /// Whether the classifier found a rebuttal.
    pub fn is_positive(&self) -> bool {
        self.result.eq_ignore_ascii_case("yes")
    }
}

/// LLM rebuttal classifier interface.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify whether the transcript contains agent objection handling.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierUnavailable` when the service cannot be reached;
    /// the matcher skips the tier silently in that case.
    async fn classify_rebuttal(&self, transcript: &str) -> Result<RebuttalClassification>;
}

/// Chat-completion-backed classifier client.
pub struct RemoteClassifier {
    client: Client,
    config: ClassifierConfig,
    base_url: String,
}

impl RemoteClassifier {
    /// Create a client from configuration.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        crate::config::validator::validate_base_url("classifier.base_url", &config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AuditError::classifier_api(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    fn build_prompt(transcript: &str) -> String {
        format!(
            "You are auditing a cold call about buying property. Decide whether the AGENT \
             used a rebuttal (objection-handling language) after owner resistance, e.g. asking \
             about other properties, future selling, callbacks, or making an offer.\n\
             Transcript (agent channel only):\n\"{}\"\n\
             Respond with JSON only: {{\"result\": \"Yes\"|\"No\", \"confidence\": 0.0-1.0, \
             \"reasoning\": \"...\"}}",
            transcript
        )
    }

    fn parse_response(content: &str) -> Result<RebuttalClassification> {
        // Models wrap JSON in prose or fences often enough to be worth a
        // bracket scan
        let trimmed = content.trim();
        let json_str = if trimmed.starts_with('{') {
            trimmed.to_string()
        } else {
            let start = trimmed.find('{');
            let end = trimmed.rfind('}');
            match (start, end) {
                (Some(s), Some(e)) if e > s => trimmed[s..=e].to_string(),
                _ => {
                    return Err(AuditError::classifier_api(format!(
                        "No JSON object in response: {}",
                        content
                    )));
                }
            }
        };
        let mut parsed: RebuttalClassification = serde_json::from_str(&json_str)
            .map_err(|e| AuditError::classifier_api(format!("Invalid JSON: {}", e)))?;
        parsed.confidence = parsed.confidence.clamp(0.0, 1.0);
        Ok(parsed)
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify_rebuttal(&self, transcript: &str) -> Result<RebuttalClassification> {
        let request_body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "user", "content": Self::build_prompt(transcript)}
            ],
            "temperature": 0.0,
            "max_tokens": 300,
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await.map_err(|e| {
            warn!("[RemoteClassifier] request failed: {}", e);
            AuditError::ClassifierUnavailable(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuditError::ClassifierUnavailable(format!(
                "{}: {}",
                status, text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AuditError::classifier_api(format!("Invalid response: {}", e)))?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AuditError::classifier_api("Missing response content"))?;
        debug!("[RemoteClassifier] raw verdict: {}", content);
        Self::parse_response(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> ClassifierConfig {
        ClassifierConfig {
            enabled: true,
            api_key: None,
            base_url: base_url.to_string(),
            model: "test-llm".to_string(),
            request_timeout_seconds: 5,
        }
    }

    #[test]
    fn test_parse_bare_json() {
        let parsed = RemoteClassifier::parse_response(
            r#"{"result": "Yes", "confidence": 0.82, "reasoning": "asked about other property"}"#,
        )
        .unwrap();
        assert!(parsed.is_positive());
        assert_eq!(parsed.confidence, 0.82);
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let parsed = RemoteClassifier::parse_response(
            "Here is my analysis:\n{\"result\": \"No\", \"confidence\": 1.4, \"reasoning\": \"none\"}\nDone.",
        )
        .unwrap();
        assert!(!parsed.is_positive());
        // Out-of-range confidence clamps
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(RemoteClassifier::parse_response("I cannot judge this").is_err());
    }

    #[tokio::test]
    async fn test_classify_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content":
                    "{\"result\": \"Yes\", \"confidence\": 0.75, \"reasoning\": \"future selling question\"}"
                }}]
            })))
            .mount(&server)
            .await;

        let classifier = RemoteClassifier::from_config(&test_config(&server.uri())).unwrap();
        let verdict = classifier
            .classify_rebuttal("would you be open to selling in the future")
            .await
            .unwrap();
        assert!(verdict.is_positive());
        assert_eq!(verdict.confidence, 0.75);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let config = test_config("http://127.0.0.1:1");
        let classifier = RemoteClassifier::from_config(&config).unwrap();
        let result = classifier.classify_rebuttal("anything").await;
        assert!(matches!(result, Err(AuditError::ClassifierUnavailable(_))));
    }
}
