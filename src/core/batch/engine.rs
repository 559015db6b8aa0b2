//! Per-user batch engine.
//!
//! Processes a folder of call recordings: adaptive batches submitted to a
//! bounded worker pool, three detectors running concurrently inside each
//! file, per-file wall-clock deadlines, stop-flag polling between
//! submissions, and strict error isolation (a failing file yields an error
//! row, never a failed batch).

use crate::config::Config;
use crate::core::batch::preloader::ModelPreloader;
use crate::core::batch::sizer::AdaptiveBatchSizer;
use crate::core::naming::{FileMetadata, parse_file_metadata};
use crate::core::report::{Detection, FileResult, RebuttalVerdict};
use crate::services::audio::{AudioPipeline, SUPPORTED_EXTENSIONS, TARGET_SAMPLE_RATE};
use crate::services::rebuttal::{IntroScorer, RebuttalMatcher};
use crate::services::transcriber::{
    PhoneticNormalizer, TranscribeOptions, Transcriber, Transcript,
};
use crate::services::vad::detectors::{detect_late_hello, detect_releasing};
use crate::services::vad::engine::VadEngine;
use crate::{Result, error::AuditError};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use walkdir::WalkDir;

/// Pad short clips with this much silence on both sides before upload.
const SHORT_CLIP_PADDING_MS: u64 = 2_000;
/// Clips below this duration get the silence padding.
const SHORT_CLIP_THRESHOLD_MS: u64 = 15_000;
/// Worker cap for lite mode.
const LITE_WORKER_CAP: usize = 16;

/// Progress callback: `(completed, total)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Options for one folder run.
#[derive(Clone, Default)]
pub struct ProcessFolderOptions {
    /// Lite mode: releasing and late-hello only, no transcription.
    pub lite: bool,
    /// Worker-pool override; wins over configuration.
    pub max_workers: Option<usize>,
    /// Progress callback fired after every completed file.
    pub progress: Option<ProgressCallback>,
    /// Caller-supplied metadata attached to every result row.
    pub metadata: std::collections::BTreeMap<String, String>,
}

/// Per-user batch engine over the shared detection components.
pub struct BatchEngine {
    config: Config,
    pipeline: Arc<AudioPipeline>,
    vad: Arc<VadEngine>,
    normalizer: Arc<PhoneticNormalizer>,
    matcher: Arc<RebuttalMatcher>,
    transcriber: Arc<dyn Transcriber>,
    preloader: Arc<ModelPreloader>,
    stop_requested: Arc<AtomicBool>,
}

impl BatchEngine {
    /// Assemble an engine from its components.
    pub fn new(
        config: Config,
        pipeline: Arc<AudioPipeline>,
        vad: Arc<VadEngine>,
        normalizer: Arc<PhoneticNormalizer>,
        matcher: Arc<RebuttalMatcher>,
        transcriber: Arc<dyn Transcriber>,
        preloader: Arc<ModelPreloader>,
    ) -> Self {
        Self {
            config,
            pipeline,
            vad,
            normalizer,
            matcher,
            transcriber,
            preloader,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting a stop; the engine finishes in-flight work and
    /// halts further submissions.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_requested.clone()
    }

    /// Recursively find supported audio files under a folder, sorted for
    /// stable batch composition.
    pub fn find_audio_files(&self, folder: &Path) -> Result<Vec<PathBuf>> {
        if !folder.exists() {
            return Err(AuditError::PathNotFound(folder.to_path_buf()));
        }
        let mut files: Vec<PathBuf> = WalkDir::new(folder)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Process every audio file under a folder.
    ///
    /// Results arrive in completion order; aggregation downstream is
    /// commutative. Every file yields exactly one [`FileResult`].
    pub async fn process_folder(
        &self,
        folder: &Path,
        options: &ProcessFolderOptions,
    ) -> Result<Vec<FileResult>> {
        let files = self.find_audio_files(folder)?;
        if files.is_empty() {
            info!("[BatchEngine] no audio files under {:?}", folder);
            return Ok(Vec::new());
        }
        let total = files.len();
        info!("[BatchEngine] processing {} files from {:?}", total, folder);

        if !options.lite {
            self.preloader.preload_all().await;
        }

        let max_workers = self.resolve_workers(options);
        let timeout_secs = if options.lite {
            self.config.batch.lite_timeout_seconds
        } else {
            self.config.batch.per_file_timeout_seconds
        };
        debug!(
            "[BatchEngine] {} workers, {}s per-file timeout, lite={}",
            max_workers, timeout_secs, options.lite
        );

        let semaphore = Arc::new(Semaphore::new(max_workers));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut sizer = AdaptiveBatchSizer::new();
        sizer.reset();

        let mut results = Vec::with_capacity(total);
        let mut cursor = 0usize;
        let mut batch_number = 0usize;

        while cursor < total {
            if self.stop_requested.load(Ordering::SeqCst) {
                warn!(
                    "[BatchEngine] stop requested, halting after {}/{} files",
                    cursor, total
                );
                break;
            }

            let batch_size = sizer.calculate(&files[cursor..], cursor, total);
            let batch: Vec<PathBuf> =
                files[cursor..(cursor + batch_size).min(total)].to_vec();
            batch_number += 1;
            debug!(
                "[BatchEngine] batch {} with {} files",
                batch_number,
                batch.len()
            );

            let mut handles = Vec::with_capacity(batch.len());
            for path in &batch {
                if self.stop_requested.load(Ordering::SeqCst) {
                    break;
                }
                handles.push(self.spawn_file_task(
                    path.clone(),
                    options.lite,
                    timeout_secs,
                    semaphore.clone(),
                    completed.clone(),
                    total,
                    options.progress.clone(),
                ));
            }
            let submitted = handles.len();

            // Batch barrier: the sizer needs the batch's throughput before
            // sizing the next one
            let batch_start = Instant::now();
            for handle in futures::future::join_all(handles).await {
                match handle {
                    Ok(result) => {
                        sizer.update_processing_time(result.processing_time_ms as f64 / 1000.0);
                        results.push(result);
                    }
                    Err(e) => {
                        // A panicked task still has to reconcile the counts
                        error!("[BatchEngine] file task panicked: {}", e);
                        results.push(FileResult::error_row(
                            String::new(),
                            String::new(),
                            String::new(),
                            String::new(),
                            None,
                            String::new(),
                            format!("Internal task failure: {}", e),
                            0,
                        ));
                        completed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
            debug!(
                "[BatchEngine] batch {} done in {:.1}s",
                batch_number,
                batch_start.elapsed().as_secs_f64()
            );

            if let Some(progress) = &options.progress {
                progress(completed.load(Ordering::SeqCst), total);
            }
            cursor += submitted;
            if submitted < batch.len() {
                break;
            }
        }

        if !options.metadata.is_empty() {
            for result in &mut results {
                result.extra = options.metadata.clone();
            }
        }

        info!(
            "[BatchEngine] completed {}/{} files ({} results)",
            completed.load(Ordering::SeqCst),
            total,
            results.len()
        );
        Ok(results)
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_file_task(
        &self,
        path: PathBuf,
        lite: bool,
        timeout_secs: u64,
        semaphore: Arc<Semaphore>,
        completed: Arc<AtomicUsize>,
        total: usize,
        progress: Option<ProgressCallback>,
    ) -> tokio::task::JoinHandle<FileResult> {
        let engine = self.clone_shared();
        tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("worker semaphore closed");

            let metadata = parse_file_metadata(&path);
            let start = Instant::now();
            let result = match tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                engine.process_file(&path, &metadata, lite),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!("[BatchEngine] timeout for {:?}", path);
                    FileResult::error_row(
                        metadata.agent_name.clone(),
                        metadata.phone_number.clone(),
                        metadata.timestamp.clone(),
                        metadata.disposition.clone(),
                        metadata.dialer_name.clone(),
                        path.display().to_string(),
                        format!("Processing timeout after {}s", timeout_secs),
                        start.elapsed().as_millis() as u64,
                    )
                }
            };

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(progress) = progress {
                progress(done, total);
            }
            result
        })
    }

    fn clone_shared(&self) -> SharedPipeline {
        SharedPipeline {
            config: self.config.clone(),
            pipeline: self.pipeline.clone(),
            vad: self.vad.clone(),
            normalizer: self.normalizer.clone(),
            matcher: self.matcher.clone(),
            transcriber: self.transcriber.clone(),
        }
    }

    fn resolve_workers(&self, options: &ProcessFolderOptions) -> usize {
        let cpus = num_cpus::get().max(1);
        if let Some(explicit) = options.max_workers.or(self.config.batch.max_workers) {
            return explicit.clamp(1, 256);
        }
        if options.lite {
            return cpus.min(LITE_WORKER_CAP);
        }
        match self.config.batch.account_tier.as_str() {
            "paid" => cpus.min(20),
            _ => cpus.min(5),
        }
    }
}

/// The per-task view of the engine: everything a file task needs, cheaply
/// cloneable.
struct SharedPipeline {
    config: Config,
    pipeline: Arc<AudioPipeline>,
    vad: Arc<VadEngine>,
    normalizer: Arc<PhoneticNormalizer>,
    matcher: Arc<RebuttalMatcher>,
    transcriber: Arc<dyn Transcriber>,
}

impl SharedPipeline {
    /// Process one file into a result row; never errors.
    async fn process_file(&self, path: &Path, metadata: &FileMetadata, lite: bool) -> FileResult {
        let start = Instant::now();
        debug!("[BatchEngine] processing {:?}", path);

        // Decode off the async threads
        let pipeline = self.pipeline.clone();
        let path_owned = path.to_path_buf();
        let call = match tokio::task::spawn_blocking(move || pipeline.load_call(&path_owned)).await
        {
            Ok(Ok(call)) => call,
            Ok(Err(e)) => {
                warn!("[BatchEngine] audio rejected {:?}: {}", path, e);
                return FileResult::error_row(
                    metadata.agent_name.clone(),
                    metadata.phone_number.clone(),
                    metadata.timestamp.clone(),
                    metadata.disposition.clone(),
                    metadata.dialer_name.clone(),
                    path.display().to_string(),
                    e.to_string(),
                    start.elapsed().as_millis() as u64,
                );
            }
            Err(e) => {
                return FileResult::error_row(
                    metadata.agent_name.clone(),
                    metadata.phone_number.clone(),
                    metadata.timestamp.clone(),
                    metadata.disposition.clone(),
                    metadata.dialer_name.clone(),
                    path.display().to_string(),
                    format!("Decode task failed: {}", e),
                    start.elapsed().as_millis() as u64,
                );
            }
        };

        // Transcription goes out first so the API round-trip overlaps the
        // local detectors
        let transcription_task = if lite {
            None
        } else {
            match self.export_agent_wav(&call.agent.samples) {
                Ok(temp_path) => {
                    let transcriber = self.transcriber.clone();
                    let options = TranscribeOptions {
                        speaker_labels: self.config.transcriber.speaker_labels,
                        language_code: self.config.transcriber.language_code.clone(),
                    };
                    let upload_path = temp_path.clone();
                    let handle = tokio::spawn(async move {
                        transcriber.transcribe_file(&upload_path, &options).await
                    });
                    Some((handle, temp_path))
                }
                Err(e) => {
                    warn!("[BatchEngine] temp WAV export failed for {:?}: {}", path, e);
                    None
                }
            }
        };

        // Local detectors in parallel
        let agent_for_releasing = call.agent.clone();
        let agent_for_late = call.agent.clone();
        let vad_releasing = self.vad.clone();
        let vad_late = self.vad.clone();
        let vad_config = self.config.vad.clone();
        let late_config = self.config.late_hello.clone();
        let late_config_b = self.config.late_hello.clone();

        let (releasing, late_hello) = tokio::join!(
            tokio::task::spawn_blocking(move || {
                detect_releasing(&agent_for_releasing, &vad_releasing, &vad_config, &late_config)
            }),
            tokio::task::spawn_blocking(move || {
                detect_late_hello(&agent_for_late, &vad_late, &late_config_b)
            }),
        );
        let releasing = releasing.unwrap_or_else(|e| {
            error!("[BatchEngine] releasing detector panicked: {}", e);
            Detection::Error
        });
        let late_hello = late_hello.unwrap_or_else(|e| {
            error!("[BatchEngine] late-hello detector panicked: {}", e);
            Detection::Error
        });
        debug!(
            "[BatchEngine] {:?}: releasing={}, late_hello={}",
            path, releasing, late_hello
        );

        // Rebuttal tier: discarded entirely for releasing calls
        let (rebuttal, rebuttal_confidence, transcript_text, rebuttal_error) =
            match transcription_task {
                Some((handle, temp_path)) => {
                    let outcome = if releasing == Detection::Yes {
                        debug!("[BatchEngine] releasing call, discarding transcription");
                        // Cancellation is attempted, never awaited
                        handle.abort();
                        (RebuttalVerdict::No, None, String::new(), None)
                    } else {
                        self.resolve_rebuttal(handle).await
                    };
                    if let Err(e) = tokio::fs::remove_file(&temp_path).await {
                        debug!("[BatchEngine] temp cleanup failed: {}", e);
                    }
                    outcome
                }
                None if lite => (RebuttalVerdict::NotApplicable, None, String::new(), None),
                None => (
                    RebuttalVerdict::No,
                    None,
                    String::new(),
                    Some("temp_file_failed".to_string()),
                ),
            };

        let intro_scores = if lite {
            None
        } else {
            let scorer = IntroScorer::new(&metadata.agent_name);
            Some(scorer.score(&transcript_text, rebuttal, late_hello, releasing))
        };

        FileResult {
            agent_name: metadata.agent_name.clone(),
            phone_number: metadata.phone_number.clone(),
            timestamp: metadata.timestamp.clone(),
            disposition: metadata.disposition.clone(),
            dialer_name: metadata.dialer_name.clone(),
            file_path: path.display().to_string(),
            releasing,
            late_hello,
            rebuttal,
            rebuttal_confidence,
            transcript: transcript_text,
            intro_scores,
            classification_success: true,
            processing_time_ms: start.elapsed().as_millis() as u64,
            error: rebuttal_error,
            extra: std::collections::BTreeMap::new(),
        }
    }

    /// Await the transcription and run the matcher over the transcript.
    async fn resolve_rebuttal(
        &self,
        handle: tokio::task::JoinHandle<Result<Transcript>>,
    ) -> (RebuttalVerdict, Option<f32>, String, Option<String>) {
        match handle.await {
            Ok(Ok(transcript)) => {
                let (corrected, corrections) = self.normalizer.apply(&transcript.text);
                if !corrections.is_empty() {
                    debug!(
                        "[BatchEngine] applied {} accent corrections",
                        corrections.len()
                    );
                }
                let candidates = self.matcher.detect(&corrected).await;
                match candidates.first() {
                    Some(best) => (
                        RebuttalVerdict::Yes,
                        Some(best.confidence),
                        corrected,
                        None,
                    ),
                    None => (RebuttalVerdict::No, None, corrected, None),
                }
            }
            Ok(Err(e)) if e.is_timeout() => {
                warn!("[BatchEngine] transcription timed out, treating as no rebuttal");
                (
                    RebuttalVerdict::No,
                    None,
                    String::new(),
                    Some("timeout".to_string()),
                )
            }
            Ok(Err(e)) => {
                error!("[BatchEngine] transcription failed: {}", e);
                (
                    RebuttalVerdict::Error,
                    None,
                    String::new(),
                    Some(e.to_string()),
                )
            }
            Err(e) => (
                RebuttalVerdict::Error,
                None,
                String::new(),
                Some(format!("transcription task failed: {}", e)),
            ),
        }
    }

    /// Export the agent channel to a temp WAV for upload, padding short
    /// clips with leading/trailing silence so the service keeps context.
    fn export_agent_wav(&self, samples: &[i16]) -> Result<PathBuf> {
        let temp_path = std::env::temp_dir().join(format!("callaudit-{}.wav", uuid::Uuid::new_v4()));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: TARGET_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&temp_path, spec)?;

        let duration_ms = samples.len() as u64 * 1000 / TARGET_SAMPLE_RATE as u64;
        let padding_samples = if duration_ms < SHORT_CLIP_THRESHOLD_MS {
            (SHORT_CLIP_PADDING_MS * TARGET_SAMPLE_RATE as u64 / 1000) as usize
        } else {
            0
        };

        for _ in 0..padding_samples {
            writer.write_sample(0i16)?;
        }
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        for _ in 0..padding_samples {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
        Ok(temp_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::embedding::Embedder;
    use crate::services::rebuttal::PhraseRepository;
    use crate::services::rebuttal::repository::tests::HashingEmbedder;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedTranscriber {
        text: String,
        calls: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl Transcriber for ScriptedTranscriber {
        async fn transcribe_file(
            &self,
            path: &Path,
            _options: &TranscribeOptions,
        ) -> Result<Transcript> {
            self.calls.lock().unwrap().push(path.to_path_buf());
            Ok(Transcript {
                text: self.text.clone(),
                words: Vec::new(),
                confidence: Some(0.9),
                processing_time_ms: 5,
            })
        }
    }

    fn test_engine(transcript_text: &str) -> (BatchEngine, Arc<ScriptedTranscriber>) {
        let config = Config::default();
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder);
        let repository = Arc::new(PhraseRepository::new(embedder.clone(), None));
        let matcher = Arc::new(RebuttalMatcher::new(
            repository.clone(),
            embedder,
            None,
            None,
            config.semantic.clamped_threshold(),
        ));
        let transcriber = Arc::new(ScriptedTranscriber {
            text: transcript_text.to_string(),
            calls: Mutex::new(Vec::new()),
        });
        let preloader = Arc::new(ModelPreloader::new(repository, transcriber.clone()));
        let engine = BatchEngine::new(
            config.clone(),
            Arc::new(AudioPipeline::new().unwrap()),
            Arc::new(VadEngine::new(config.vad.clone())),
            Arc::new(PhoneticNormalizer::new(true)),
            matcher,
            transcriber.clone(),
            preloader,
        );
        (engine, transcriber)
    }

    fn write_speech_wav(path: &Path, stereo_silent_left: bool) {
        let sample_rate = 16_000u32;
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total = sample_rate * 10;
        for i in 0..total {
            let t = i as f32 / sample_rate as f32;
            // Speech-band mixture between 1.0s and 9.0s
            let active = t > 1.0 && t < 9.0;
            let value = if active {
                ((2.0 * std::f32::consts::PI * 220.0 * t).sin() * 0.4
                    + (2.0 * std::f32::consts::PI * 880.0 * t).sin() * 0.3
                    + (2.0 * std::f32::consts::PI * 1760.0 * t).sin() * 0.2)
                    * 12_000.0
            } else {
                0.0
            };
            let left = if stereo_silent_left { 0 } else { value as i16 };
            writer.write_sample(left).unwrap();
            writer.write_sample(value as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_worker_resolution() {
        let (engine, _) = test_engine("");
        let cpus = num_cpus::get().max(1);

        let free = engine.resolve_workers(&ProcessFolderOptions::default());
        assert_eq!(free, cpus.min(5));

        let explicit = engine.resolve_workers(&ProcessFolderOptions {
            max_workers: Some(3),
            ..Default::default()
        });
        assert_eq!(explicit, 3);

        let lite = engine.resolve_workers(&ProcessFolderOptions {
            lite: true,
            ..Default::default()
        });
        assert_eq!(lite, cpus.min(LITE_WORKER_CAP));
    }

    #[test]
    fn test_worker_resolution_paid_tier() {
        let (mut engine, _) = test_engine("");
        engine.config.batch.account_tier = "paid".to_string();
        let workers = engine.resolve_workers(&ProcessFolderOptions::default());
        assert_eq!(workers, num_cpus::get().max(1).min(20));
    }

    #[test]
    fn test_find_audio_files_filters_and_sorts() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.mp3"), b"x").unwrap();
        std::fs::write(tmp.path().join("a.wav"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/c.flac"), b"x").unwrap();

        let (engine, _) = test_engine("");
        let files = engine.find_audio_files(tmp.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("a.wav"));
    }

    #[test]
    fn test_find_audio_files_missing_folder() {
        let (engine, _) = test_engine("");
        assert!(engine.find_audio_files(Path::new("/no/such/folder")).is_err());
    }

    #[tokio::test]
    async fn test_empty_folder_yields_no_results() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (engine, _) = test_engine("");
        let results = engine
            .process_folder(tmp.path(), &ProcessFolderOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_silent_agent_is_releasing_and_skips_transcription() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("AgentOne _ 5551234567.wav");
        write_speech_wav(&path, true);

        let (engine, _transcriber) = test_engine("anything");
        let results = engine
            .process_folder(tmp.path(), &ProcessFolderOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.releasing, Detection::Yes);
        assert_eq!(result.late_hello, Detection::No);
        assert_eq!(result.rebuttal, RebuttalVerdict::No);
        assert!(result.transcript.is_empty());
        assert!(result.classification_success);
        assert_eq!(result.agent_name, "Agent One");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_talking_agent_runs_rebuttal_detection() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("AgentOne _ 5551234567.wav");
        write_speech_wav(&path, false);

        let (engine, transcriber) = test_engine(
            "i understand but do you have any other property you might want to sell",
        );
        let results = engine
            .process_folder(tmp.path(), &ProcessFolderOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.releasing, Detection::No);
        assert_eq!(result.rebuttal, RebuttalVerdict::Yes);
        assert_eq!(result.rebuttal_confidence, Some(1.0));
        assert!(!transcriber.calls.lock().unwrap().is_empty());
        // Temp WAVs are cleaned up
        for call_path in transcriber.calls.lock().unwrap().iter() {
            assert!(!call_path.exists());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lite_mode_skips_transcription() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("AgentOne _ 5551234567.wav");
        write_speech_wav(&path, false);

        let (engine, transcriber) = test_engine("should never be used");
        let results = engine
            .process_folder(
                tmp.path(),
                &ProcessFolderOptions {
                    lite: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.rebuttal, RebuttalVerdict::NotApplicable);
        assert!(result.intro_scores.is_none());
        assert!(transcriber.calls.lock().unwrap().is_empty());
        assert_eq!(
            result.status(),
            crate::core::report::CallStatus::LiteCompleted
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bad_file_yields_error_row_not_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        // Garbage bytes with an audio extension, above the size floor
        std::fs::write(tmp.path().join("broken.mp3"), vec![0u8; 4096]).unwrap();
        let good = tmp.path().join("AgentTwo _ 5550000000.wav");
        write_speech_wav(&good, false);

        let (engine, _) = test_engine("no rebuttal here");
        let results = engine
            .process_folder(tmp.path(), &ProcessFolderOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        let errors: Vec<_> = results.iter().filter(|r| !r.classification_success).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].error.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_progress_callback_reconciles() {
        let tmp = tempfile::TempDir::new().unwrap();
        for i in 0..3 {
            write_speech_wav(&tmp.path().join(format!("Agent _ 555000000{}.wav", i)), false);
        }

        let (engine, _) = test_engine("nothing of note");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let options = ProcessFolderOptions {
            lite: true,
            progress: Some(Arc::new(move |done, total| {
                seen_clone.lock().unwrap().push((done, total));
            })),
            ..Default::default()
        };
        let results = engine.process_folder(tmp.path(), &options).await.unwrap();
        assert_eq!(results.len(), 3);
        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|&(done, total)| done == 3 && total == 3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_flag_halts_submissions() {
        let tmp = tempfile::TempDir::new().unwrap();
        for i in 0..4 {
            write_speech_wav(&tmp.path().join(format!("Agent _ 555000000{}.wav", i)), false);
        }

        let (engine, _) = test_engine("x");
        engine.stop_handle().store(true, Ordering::SeqCst);
        let results = engine
            .process_folder(tmp.path(), &ProcessFolderOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
