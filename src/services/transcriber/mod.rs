//! Cloud transcription service abstraction.
//!
//! The audit pipeline depends only on the [`Transcriber`] trait; the
//! concrete HTTP adapter for the hosted service lives in [`remote`] and the
//! accent-correcting transcript post-processor in [`normalizer`].

pub mod normalizer;
pub mod remote;

pub use normalizer::PhoneticNormalizer;
pub use remote::RemoteTranscriber;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for a single transcription request.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// Request per-word speaker labels.
    pub speaker_labels: bool,
    /// Language code, always English in this product.
    pub language_code: String,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            speaker_labels: false,
            language_code: "en".to_string(),
        }
    }
}

/// One word of a transcript with timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptWord {
    /// The word text, lowercased.
    pub text: String,
    /// Word start in milliseconds.
    pub start_ms: u64,
    /// Word end in milliseconds.
    pub end_ms: u64,
    /// Speaker label when diarization ran.
    pub speaker: Option<String>,
}

/// A completed transcription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    /// Full transcript text, lowercased.
    pub text: String,
    /// Word-level timestamps, may be empty.
    pub words: Vec<TranscriptWord>,
    /// Service confidence score, when reported.
    pub confidence: Option<f32>,
    /// Wall-clock transcription time in milliseconds.
    pub processing_time_ms: u64,
}

impl Transcript {
    /// An empty transcript (silent channel or skipped transcription).
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            words: Vec::new(),
            confidence: None,
            processing_time_ms: 0,
        }
    }
}

/// Cloud transcription service interface.
///
/// Implementations must be safe to share across worker tasks.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file from disk.
    ///
    /// # Errors
    ///
    /// - `TranscriptionTimeout` for network deadline expiry
    /// - `Api`/`Transcription` for other service failures
    async fn transcribe_file(
        &self,
        path: &Path,
        options: &TranscribeOptions,
    ) -> crate::Result<Transcript>;

    /// Cheap connectivity/auth probe used by the model preloader.
    async fn warm_up(&self) -> crate::Result<()> {
        Ok(())
    }
}
