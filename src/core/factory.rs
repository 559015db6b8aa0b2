//! Component factory for creating configured instances of core components.
//!
//! Centralizes construction and wiring so no component reaches for global
//! state: the matcher gets its repository, embedder, classifier and
//! learning observer injected here, and the batch engine receives the
//! fully-wired detection stack.

use crate::services::audio::AudioPipeline;
use crate::services::classifier::{Classifier, RemoteClassifier};
use crate::services::embedding::{Embedder, RemoteEmbedder};
use crate::services::learning::PhraseLearningStore;
use crate::services::rebuttal::{PhraseRepository, RebuttalMatcher};
use crate::services::transcriber::{PhoneticNormalizer, RemoteTranscriber, Transcriber};
use crate::services::vad::engine::VadEngine;
use crate::{
    Result,
    config::{Config, ConfigService},
    core::batch::{BatchEngine, ModelPreloader},
};
use std::sync::Arc;

/// Component factory for creating configured instances.
///
/// # Examples
///
/// ```rust
/// use callaudit::core::ComponentFactory;
/// use callaudit::config::TestConfigService;
///
/// # fn main() -> callaudit::Result<()> {
/// let config_service = TestConfigService::with_defaults();
/// let factory = ComponentFactory::new(&config_service)?;
/// let vad = factory.create_vad_engine();
/// # Ok(())
/// # }
/// ```
pub struct ComponentFactory {
    config: Config,
}

impl ComponentFactory {
    /// Create a new component factory with the given configuration service.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading fails.
    pub fn new(config_service: &dyn ConfigService) -> Result<Self> {
        let config = config_service.get_config()?;
        Ok(Self { config })
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create a VAD engine with the configured thresholds.
    pub fn create_vad_engine(&self) -> VadEngine {
        VadEngine::new(self.config.vad.clone())
    }

    /// Create the audio ingestion pipeline.
    pub fn create_audio_pipeline(&self) -> Result<AudioPipeline> {
        AudioPipeline::new()
    }

    /// Create the accent-correcting transcript normalizer.
    pub fn create_phonetic_normalizer(&self) -> PhoneticNormalizer {
        PhoneticNormalizer::new(self.config.accent_correction.enabled)
    }

    /// Create the remote transcriber adapter.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the API key is missing.
    pub fn create_transcriber(&self) -> Result<Arc<dyn Transcriber>> {
        Ok(Arc::new(RemoteTranscriber::from_config(
            &self.config.transcriber,
        )?))
    }

    /// Create the embedding service adapter.
    pub fn create_embedder(&self) -> Result<Arc<dyn Embedder>> {
        Ok(Arc::new(RemoteEmbedder::from_config(&self.config.embedder)?))
    }

    /// Create the optional LLM classifier, `None` when disabled.
    pub fn create_classifier(&self) -> Result<Option<Arc<dyn Classifier>>> {
        if !self.config.classifier.enabled {
            return Ok(None);
        }
        Ok(Some(Arc::new(RemoteClassifier::from_config(
            &self.config.classifier,
        )?)))
    }

    /// Open the phrase learning store at the configured path.
    pub fn create_learning_store(&self) -> Result<Arc<PhraseLearningStore>> {
        Ok(Arc::new(PhraseLearningStore::open_with_config(
            &self.config.store.resolved_path(),
            self.config.learning.clone(),
        )?))
    }

    /// Create the phrase repository backed by the learning store.
    pub fn create_repository(
        &self,
        embedder: Arc<dyn Embedder>,
        store: Arc<PhraseLearningStore>,
    ) -> Arc<PhraseRepository> {
        let learned: Arc<dyn crate::services::rebuttal::LearnedPhraseSource> = store;
        Arc::new(PhraseRepository::new(embedder, Some(learned)))
    }

    /// Create the three-tier rebuttal matcher with learning wired in.
    pub fn create_matcher(
        &self,
        repository: Arc<PhraseRepository>,
        embedder: Arc<dyn Embedder>,
        classifier: Option<Arc<dyn Classifier>>,
        store: Arc<PhraseLearningStore>,
    ) -> Arc<RebuttalMatcher> {
        let observer: Arc<dyn crate::services::rebuttal::MatchObserver> = store;
        Arc::new(RebuttalMatcher::new(
            repository,
            embedder,
            classifier,
            Some(observer),
            self.config.semantic.clamped_threshold(),
        ))
    }

    /// Create a fully-wired batch engine for one user run.
    ///
    /// # Errors
    ///
    /// Fails when any remote adapter or the store cannot be constructed.
    pub fn create_batch_engine(&self) -> Result<BatchEngine> {
        self.build_engine(self.create_transcriber()?)
    }

    /// Create a batch engine for lite mode, which never transcribes and so
    /// needs no transcriber credentials.
    pub fn create_lite_batch_engine(&self) -> Result<BatchEngine> {
        self.build_engine(Arc::new(DisabledTranscriber))
    }

    fn build_engine(&self, transcriber: Arc<dyn Transcriber>) -> Result<BatchEngine> {
        let embedder = self.create_embedder()?;
        let classifier = self.create_classifier()?;
        let store = self.create_learning_store()?;
        let repository = self.create_repository(embedder.clone(), store.clone());
        let matcher = self.create_matcher(repository.clone(), embedder, classifier, store);
        let preloader = Arc::new(ModelPreloader::new(repository, transcriber.clone()));

        Ok(BatchEngine::new(
            self.config.clone(),
            Arc::new(self.create_audio_pipeline()?),
            Arc::new(self.create_vad_engine()),
            Arc::new(self.create_phonetic_normalizer()),
            matcher,
            transcriber,
            preloader,
        ))
    }
}

/// Placeholder transcriber for lite mode; transcription never runs there,
/// so any call is a programming error surfaced as a transcription error.
struct DisabledTranscriber;

#[async_trait::async_trait]
impl Transcriber for DisabledTranscriber {
    async fn transcribe_file(
        &self,
        _path: &std::path::Path,
        _options: &crate::services::transcriber::TranscribeOptions,
    ) -> Result<crate::services::transcriber::Transcript> {
        Err(crate::error::AuditError::transcription(
            "transcription is disabled in lite mode",
        ))
    }
}
