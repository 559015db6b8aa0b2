//! HTTP adapter for the hosted transcription service.
//!
//! Three-step flow: upload the WAV bytes, create a transcript job, poll
//! until the job settles. Submission failures retry with a fixed delay;
//! polling is bounded by the configured request timeout.

use crate::config::TranscriberConfig;
use crate::services::transcriber::{Transcriber, TranscribeOptions, Transcript, TranscriptWord};
use crate::{Result, error::AuditError};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};

/// Poll interval while a transcript job is queued or processing.
const POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Hosted transcription service client.
pub struct RemoteTranscriber {
    client: Client,
    api_key: String,
    base_url: String,
    config: TranscriberConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptJob {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    words: Option<Vec<ApiWord>>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiWord {
    text: String,
    start: u64,
    end: u64,
    #[serde(default)]
    speaker: Option<String>,
}

impl RemoteTranscriber {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the API key is missing or the
    /// HTTP client cannot be constructed.
    pub fn from_config(config: &TranscriberConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AuditError::config("Missing transcriber API key"))?;
        crate::config::validator::validate_base_url("transcriber.base_url", &config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AuditError::transcriber_api(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    async fn upload_audio(&self, audio_path: &Path) -> Result<String> {
        let file = File::open(audio_path).await.map_err(|e| {
            AuditError::audio_processing(format!("Failed to open audio file: {}", e))
        })?;
        let stream = FramedRead::new(file, BytesCodec::new());
        let body = reqwest::Body::wrap_stream(stream);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("authorization", &self.api_key)
            .header("content-type", "application/octet-stream")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| AuditError::transcriber_api(format!("Invalid upload response: {}", e)))?;
        Ok(upload.upload_url)
    }

    async fn create_job(&self, audio_url: &str, options: &TranscribeOptions) -> Result<String> {
        let request_body = json!({
            "audio_url": audio_url,
            "speaker_labels": options.speaker_labels,
            "language_code": options.language_code,
            "punctuate": true,
            "format_text": true,
        });

        let response = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let job: TranscriptJob = response.json().await.map_err(|e| {
            AuditError::transcriber_api(format!("Invalid transcript response: {}", e))
        })?;
        Ok(job.id)
    }

    async fn poll_job(&self, job_id: &str) -> Result<TranscriptJob> {
        let deadline = Instant::now() + Duration::from_secs(self.config.request_timeout_seconds);
        loop {
            let response = self
                .client
                .get(format!("{}/transcript/{}", self.base_url, job_id))
                .header("authorization", &self.api_key)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(self.status_error(response).await);
            }

            let job: TranscriptJob = response.json().await.map_err(|e| {
                AuditError::transcriber_api(format!("Invalid poll response: {}", e))
            })?;

            match job.status.as_str() {
                "completed" => return Ok(job),
                "error" => {
                    return Err(AuditError::transcription(
                        job.error.unwrap_or_else(|| "unknown service error".to_string()),
                    ));
                }
                _ => {
                    if Instant::now() >= deadline {
                        warn!("[RemoteTranscriber] job {} timed out while polling", job_id);
                        return Err(AuditError::TranscriptionTimeout);
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }

    async fn status_error(&self, response: reqwest::Response) -> AuditError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            AuditError::transcriber_api(format!("Authentication failed ({}): {}", status, text))
        } else {
            AuditError::transcriber_api(format!("Service error {}: {}", status, text))
        }
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe_file(
        &self,
        path: &Path,
        options: &TranscribeOptions,
    ) -> Result<Transcript> {
        let start = Instant::now();

        // Upload and job creation retry; polling does not, a new job would
        // start the wait over.
        let retry = crate::services::retry::RetryPolicy::new(
            self.config.retry_attempts,
            self.config.retry_delay_ms,
        );
        let audio_url =
            crate::services::retry::run_with_retries(&retry, || self.upload_audio(path)).await?;
        debug!("[RemoteTranscriber] uploaded {:?}", path);
        let job_id =
            crate::services::retry::run_with_retries(&retry, || self.create_job(&audio_url, options))
                .await?;
        debug!("[RemoteTranscriber] created job {}", job_id);

        let job = self.poll_job(&job_id).await?;
        let words = job
            .words
            .unwrap_or_default()
            .into_iter()
            .map(|w| TranscriptWord {
                text: w.text.to_lowercase(),
                start_ms: w.start,
                end_ms: w.end,
                speaker: w.speaker,
            })
            .collect();

        Ok(Transcript {
            text: job.text.unwrap_or_default().to_lowercase(),
            words,
            confidence: job.confidence,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn warm_up(&self) -> Result<()> {
        // A HEAD-style probe against the transcript listing; auth errors
        // surface here instead of mid-batch.
        let response = self
            .client
            .get(format!("{}/transcript?limit=1", self.base_url))
            .header("authorization", &self.api_key)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AuditError::transcriber_api("Authentication failed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> TranscriberConfig {
        TranscriberConfig {
            api_key: Some("test-key".to_string()),
            base_url: base_url.to_string(),
            request_timeout_seconds: 5,
            retry_attempts: 1,
            retry_delay_ms: 0,
            speaker_labels: false,
            language_code: "en".to_string(),
        }
    }

    fn temp_wav() -> (tempfile::TempDir, std::path::PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("call.wav");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let mut config = test_config("https://api.example.com/v2");
        config.api_key = None;
        let result = RemoteTranscriber::from_config(&config);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = test_config("ftp://api.example.com");
        assert!(RemoteTranscriber::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_full_transcription_flow() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("authorization", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "upload_url": "https://cdn.example.com/upload/abc"
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/transcript"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-1",
                "status": "queued"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path_regex(r"^/transcript/job-1$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-1",
                "status": "completed",
                "text": "Hi this is John from Acme",
                "confidence": 0.93,
                "words": [
                    {"text": "Hi", "start": 1200, "end": 1350, "speaker": null},
                    {"text": "this", "start": 1360, "end": 1500, "speaker": null}
                ]
            })))
            .mount(&server)
            .await;

        let transcriber = RemoteTranscriber::from_config(&test_config(&server.uri())).unwrap();
        let (_tmp, wav) = temp_wav();
        let transcript = transcriber
            .transcribe_file(&wav, &TranscribeOptions::default())
            .await
            .unwrap();

        assert_eq!(transcript.text, "hi this is john from acme");
        assert_eq!(transcript.words.len(), 2);
        assert_eq!(transcript.words[0].text, "hi");
        assert_eq!(transcript.confidence, Some(0.93));
    }

    #[tokio::test]
    async fn test_job_error_surfaces_as_transcription_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "upload_url": "https://cdn.example.com/upload/abc"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transcript"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-2",
                "status": "queued"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/transcript/job-2$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-2",
                "status": "error",
                "error": "audio duration too short"
            })))
            .mount(&server)
            .await;

        let transcriber = RemoteTranscriber::from_config(&test_config(&server.uri())).unwrap();
        let (_tmp, wav) = temp_wav();
        let result = transcriber
            .transcribe_file(&wav, &TranscribeOptions::default())
            .await;
        assert!(matches!(result, Err(AuditError::Transcription { .. })));
    }

    #[tokio::test]
    async fn test_auth_failure_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let transcriber = RemoteTranscriber::from_config(&test_config(&server.uri())).unwrap();
        let (_tmp, wav) = temp_wav();
        let result = transcriber
            .transcribe_file(&wav, &TranscribeOptions::default())
            .await;
        assert!(matches!(result, Err(AuditError::Api { .. })));
    }

    #[tokio::test]
    async fn test_warm_up_checks_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transcript"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transcripts": []
            })))
            .mount(&server)
            .await;

        let transcriber = RemoteTranscriber::from_config(&test_config(&server.uri())).unwrap();
        assert!(transcriber.warm_up().await.is_ok());
    }
}
