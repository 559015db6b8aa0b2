//! Spectral+energy voice-activity detection engine.
//!
//! Detection is split into two passes: a classifier labels every frame
//! as speech or non-speech, and segmentation consumes the label stream,
//! collapsing runs into segments and closing a trailing run at the clip
//! end. The classification rules live entirely in the labeling pass, so
//! a different classifier could be swapped in without touching the
//! segmentation.

use crate::config::VadConfig;
use crate::services::audio::AudioClip;
use crate::services::vad::fallback::simple_energy_vad;
use crate::services::vad::features::{rms_energy, spectral_features, zero_crossing_rate};
use crate::services::vad::SpeechSegment;
use crate::{Result, error::AuditError};
use log::{debug, trace, warn};

/// Frame length in milliseconds.
const FRAME_MS: u64 = 50;
/// Hop between frame starts in milliseconds.
const HOP_MS: u64 = 25;

/// Noise-floor percentile over frame RMS values.
const NOISE_FLOOR_PERCENTILE: f32 = 10.0;
/// Margin applied to the configured threshold above the noise floor.
const ADAPTIVE_NOISE_MARGIN: f32 = 0.3;
/// Lower bound for the effective threshold as a fraction of the config one.
const MIN_THRESHOLD_RATIO: f32 = 0.7;

/// Zero-crossing rate bounds for speech.
const ZCR_MIN: f32 = 0.01;
const ZCR_MAX: f32 = 0.3;
/// Speech band for the spectral centroid (Hz).
const SPEECH_FREQ_MIN: f32 = 300.0;
const SPEECH_FREQ_MAX: f32 = 3500.0;
/// Minimum bandwidth so pure tones are excluded (Hz).
const SPEECH_BANDWIDTH_MIN: f32 = 200.0;
/// Maximum 85 %-energy roll-off frequency (Hz).
const SPEECH_ROLLOFF_MAX: f32 = 4000.0;
/// Spectral checks required out of three.
const MIN_SPECTRAL_CHECKS: usize = 2;

/// Per-call VAD tuning.
#[derive(Debug, Clone)]
pub struct VadOptions {
    /// Baseline RMS threshold in the int16 scale.
    pub energy_threshold: f32,
    /// Discard segments shorter than this.
    pub min_speech_duration_ms: u32,
    /// Derive an adaptive threshold from the clip's noise floor.
    pub adaptive: bool,
    /// Run the simple energy fallback when the advanced path finds nothing.
    /// The releasing detector must keep this off: zero segments IS its
    /// signal.
    pub fallback_on_empty: bool,
}

impl VadOptions {
    /// Options for the releasing detector, straight from configuration.
    pub fn from_config(config: &VadConfig) -> Self {
        Self {
            energy_threshold: config.energy_threshold,
            min_speech_duration_ms: config.min_speech_duration_ms,
            adaptive: true,
            fallback_on_empty: false,
        }
    }

    /// Options for onset timing: fixed threshold, short minimum duration so
    /// a clipped "hello" still registers.
    pub fn for_onset_timing() -> Self {
        Self {
            energy_threshold: 400.0,
            min_speech_duration_ms: 50,
            adaptive: false,
            fallback_on_empty: false,
        }
    }
}

/// Voice-activity detection engine.
///
/// Stateless apart from configuration; safe to share across worker tasks.
pub struct VadEngine {
    config: VadConfig,
}

impl VadEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: VadConfig) -> Self {
        Self { config }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    /// Detect speech segments in a mono clip.
    ///
    /// Never fails: when the advanced path errors out (or finds nothing and
    /// the options request it) the simple energy fallback runs instead, and
    /// a fallback failure yields an empty segment list.
    pub fn detect(&self, clip: &AudioClip, options: &VadOptions) -> Vec<SpeechSegment> {
        match self.detect_advanced(clip, options) {
            Ok(segments) => {
                if segments.is_empty() && options.fallback_on_empty {
                    debug!("[VadEngine] advanced path found no speech, running fallback");
                    simple_energy_vad(clip)
                } else {
                    segments
                }
            }
            Err(e) => {
                warn!("[VadEngine] advanced VAD failed ({}), falling back", e);
                simple_energy_vad(clip)
            }
        }
    }

    /// The spectral+energy classification path.
    fn detect_advanced(
        &self,
        clip: &AudioClip,
        options: &VadOptions,
    ) -> Result<Vec<SpeechSegment>> {
        if clip.channel_count != 1 {
            return Err(AuditError::vad_internal(format!(
                "expected mono clip, got {} channels",
                clip.channel_count
            )));
        }
        if clip.samples.is_empty() {
            return Ok(Vec::new());
        }

        let sample_rate = clip.sample_rate;
        let frame_len = (FRAME_MS * sample_rate as u64 / 1000) as usize;
        let hop_len = (HOP_MS * sample_rate as u64 / 1000) as usize;
        if frame_len == 0 || hop_len == 0 || clip.samples.len() < frame_len {
            return Ok(Vec::new());
        }

        // Normalize to [-1, 1] against the clip peak
        let max_val = clip.peak() as f32;
        if max_val <= 0.0 {
            return Ok(Vec::new());
        }
        let normalized: Vec<f32> = clip.samples.iter().map(|&s| s as f32 / max_val).collect();

        let effective_threshold = if options.adaptive {
            let noise_floor = estimate_noise_floor(&normalized, frame_len, hop_len);
            let adaptive = noise_floor + options.energy_threshold * ADAPTIVE_NOISE_MARGIN;
            let floor = options.energy_threshold * MIN_THRESHOLD_RATIO;
            trace!(
                "[VadEngine] noise_floor={:.1}, adaptive={:.1}, floor={:.1}",
                noise_floor, adaptive, floor
            );
            adaptive.max(floor)
        } else {
            options.energy_threshold
        };

        let labels = label_frames(&normalized, sample_rate, frame_len, hop_len, effective_threshold);
        let segments = collapse_labels(
            &labels,
            hop_len,
            sample_rate,
            clip.samples.len(),
            options.min_speech_duration_ms as u64,
        );
        debug!(
            "[VadEngine] {} frames -> {} segments (threshold {:.1})",
            labels.len(),
            segments.len(),
            effective_threshold
        );
        Ok(segments)
    }
}

/// Per-frame verdict of the classifier. Segmentation consumes labels
/// only; the classification rules stay confined to [`label_frames`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameLabel {
    Speech,
    NonSpeech,
}

/// Classify every frame by energy, zero-crossing rate and the spectral
/// vote.
fn label_frames(
    normalized: &[f32],
    sample_rate: u32,
    frame_len: usize,
    hop_len: usize,
    effective_threshold: f32,
) -> Vec<FrameLabel> {
    let mut labels = Vec::new();
    let mut pos = 0;
    while pos + frame_len <= normalized.len() {
        let frame = &normalized[pos..pos + frame_len];
        let rms = rms_energy(frame);
        let zcr = zero_crossing_rate(frame);
        let spectral = spectral_features(frame, sample_rate);

        let energy_check = rms > effective_threshold;
        let zcr_check = zcr > ZCR_MIN && zcr < ZCR_MAX;
        let centroid_check =
            spectral.centroid > SPEECH_FREQ_MIN && spectral.centroid < SPEECH_FREQ_MAX;
        let bandwidth_check = spectral.bandwidth > SPEECH_BANDWIDTH_MIN;
        let rolloff_check = spectral.rolloff < SPEECH_ROLLOFF_MAX;
        let spectral_score = [centroid_check, bandwidth_check, rolloff_check]
            .iter()
            .filter(|&&c| c)
            .count();

        let is_speech = energy_check && zcr_check && spectral_score >= MIN_SPECTRAL_CHECKS;
        labels.push(if is_speech {
            FrameLabel::Speech
        } else {
            FrameLabel::NonSpeech
        });
        pos += hop_len;
    }
    labels
}

/// Noise floor estimate: the 10th percentile of frame RMS values.
fn estimate_noise_floor(normalized: &[f32], frame_len: usize, hop_len: usize) -> f32 {
    let mut energies = Vec::new();
    let mut pos = 0;
    while pos + frame_len <= normalized.len() {
        energies.push(rms_energy(&normalized[pos..pos + frame_len]));
        pos += hop_len;
    }
    if energies.is_empty() {
        return 0.0;
    }
    energies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let index = ((NOISE_FLOOR_PERCENTILE / 100.0) * (energies.len() - 1) as f32).round() as usize;
    energies[index.min(energies.len() - 1)]
}

/// Collapse frame labels into segments, dropping ones shorter than the
/// minimum duration.
fn collapse_labels(
    labels: &[FrameLabel],
    hop_len: usize,
    sample_rate: u32,
    total_samples: usize,
    min_duration_ms: u64,
) -> Vec<SpeechSegment> {
    let mut segments = Vec::new();
    let mut current_speech_start: Option<u64> = None;

    for (index, label) in labels.iter().enumerate() {
        let frame_start_ms = (index * hop_len) as u64 * 1000 / sample_rate as u64;
        match label {
            FrameLabel::Speech => {
                if current_speech_start.is_none() {
                    current_speech_start = Some(frame_start_ms);
                }
            }
            FrameLabel::NonSpeech => {
                if let Some(start_ms) = current_speech_start.take() {
                    if frame_start_ms - start_ms >= min_duration_ms {
                        segments.push(SpeechSegment {
                            start_ms,
                            end_ms: frame_start_ms,
                        });
                    }
                }
            }
        }
    }

    // Close the final speech segment at the clip end
    if let Some(start_ms) = current_speech_start {
        let final_ms = total_samples as u64 * 1000 / sample_rate as u64;
        if final_ms - start_ms >= min_duration_ms {
            segments.push(SpeechSegment {
                start_ms,
                end_ms: final_ms,
            });
        }
    }

    segments
}
